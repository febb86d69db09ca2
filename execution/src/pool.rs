//! Liquidity pool backing every round.
//!
//! Depositors hold shares of the pool value. The pool underwrites each round up to a cap derived
//! from its value (`round_cap = value * max_exposure_bps / 10000`); every bet reserves its
//! potential payout against that cap.
//!
//! While a round is scheduled the pool is locked: deposits and withdrawals are queued (bounded,
//! one per depositor per round) and applied in order at settlement, after the round's profit or
//! loss has been credited. Each queued entry is priced at the share value in effect when it is
//! applied.

use std::collections::BTreeMap;

use crashpool_types::{
    Account, EngineError, Event, LiquidityAction, LiquidityChange, LiquidityPosition,
    BASIS_POINTS_SCALE,
};
use tracing::{debug, info};

use crate::{
    config::{validate_low_liquidity_threshold, validate_max_exposure, validate_minimum},
    vault::{Vault, Wallets},
    EngineConfig,
};

#[derive(Clone, Debug)]
pub struct LiquidityPool {
    value: u64,
    total_shares: u64,
    positions: BTreeMap<Account, LiquidityPosition>,
    queue: Vec<LiquidityChange>,
    pending_deposits: u64,
    /// Starts at 1 so a default position has never queued.
    round_nonce: u64,
    locked: bool,

    minimum: u64,
    max_queue: usize,
    max_exposure_bps: u16,
    low_liquidity_threshold_bps: u16,

    round_cap: u64,
    reserved: u64,
    low_liquidity_signalled: bool,
}

fn bps_of(amount: u64, bps: u16) -> u64 {
    ((amount as u128) * (bps as u128) / BASIS_POINTS_SCALE as u128) as u64
}

impl LiquidityPool {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            value: 0,
            total_shares: 0,
            positions: BTreeMap::new(),
            queue: Vec::new(),
            pending_deposits: 0,
            round_nonce: 1,
            locked: false,
            minimum: config.minimum,
            max_queue: config.max_liquidity_queue,
            max_exposure_bps: config.max_exposure_bps,
            low_liquidity_threshold_bps: config.low_liquidity_threshold_bps,
            round_cap: 0,
            reserved: 0,
            low_liquidity_signalled: false,
        }
    }

    // === Reads ===

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    pub fn position(&self, account: &Account) -> Option<&LiquidityPosition> {
        self.positions.get(account)
    }

    pub fn shares_of(&self, account: &Account) -> u64 {
        self.positions
            .get(account)
            .map(|position| position.shares)
            .unwrap_or_default()
    }

    pub fn queue(&self) -> &[LiquidityChange] {
        &self.queue
    }

    /// Value staged in the vault by queued deposits.
    pub fn pending_deposits(&self) -> u64 {
        self.pending_deposits
    }

    /// Current value of `shares`, rounded down.
    pub fn share_value(&self, shares: u64) -> u64 {
        if self.total_shares == 0 {
            return 0;
        }
        ((shares as u128) * (self.value as u128) / (self.total_shares as u128)) as u64
    }

    pub fn round_cap(&self) -> u64 {
        self.round_cap
    }

    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    pub fn available(&self) -> u64 {
        self.round_cap.saturating_sub(self.reserved)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn minimum(&self) -> u64 {
        self.minimum
    }

    pub fn max_exposure_bps(&self) -> u16 {
        self.max_exposure_bps
    }

    pub fn low_liquidity_threshold_bps(&self) -> u16 {
        self.low_liquidity_threshold_bps
    }

    // === Deposits / Withdrawals ===

    pub fn deposit<W: Wallets>(
        &mut self,
        vault: &mut Vault<W>,
        depositor: &Account,
        amount: u64,
    ) -> Result<Vec<Event>, EngineError> {
        self.check_minimum(amount)?;

        if self.locked {
            self.check_queue(depositor)?;
            let pending = self
                .pending_deposits
                .checked_add(amount)
                .ok_or(EngineError::Overflow("pending deposits"))?;
            vault.receive(depositor, amount)?;
            self.pending_deposits = pending;
            self.enqueue(depositor, amount, LiquidityAction::Deposit);
            debug!(amount, queued = self.queue.len(), "deposit queued");
            return Ok(vec![Event::LiquidityQueued {
                depositor: depositor.clone(),
                action: LiquidityAction::Deposit,
                amount,
            }]);
        }

        let (value, total_shares, shares) = self.mint(amount)?;
        if shares == 0 {
            return Err(EngineError::BelowMinimum {
                got: amount,
                min: self.value.div_ceil(self.total_shares),
            });
        }
        vault.receive(depositor, amount)?;
        self.value = value;
        self.total_shares = total_shares;
        self.positions.entry(depositor.clone()).or_default().shares += shares;
        self.recompute_cap();
        info!(amount, shares, value = self.value, "liquidity added");

        Ok(vec![Event::LiquidityAdded {
            depositor: depositor.clone(),
            amount,
            shares,
        }])
    }

    /// Redeem `shares` for their current value.
    pub fn withdraw<W: Wallets>(
        &mut self,
        vault: &mut Vault<W>,
        depositor: &Account,
        shares: u64,
    ) -> Result<Vec<Event>, EngineError> {
        self.check_minimum(shares)?;
        let held = self.shares_of(depositor);
        if shares > held {
            return Err(EngineError::InsufficientShares {
                requested: shares,
                held,
            });
        }

        if self.locked {
            self.check_queue(depositor)?;
            self.enqueue(depositor, shares, LiquidityAction::Withdraw);
            debug!(shares, queued = self.queue.len(), "withdrawal queued");
            return Ok(vec![Event::LiquidityQueued {
                depositor: depositor.clone(),
                action: LiquidityAction::Withdraw,
                amount: shares,
            }]);
        }

        let mut events = Vec::new();
        self.redeem(vault, depositor, shares, &mut events);
        self.recompute_cap();
        Ok(events)
    }

    // === Round Liquidity ===

    pub fn ensure_available(&self, amount: u64) -> Result<(), EngineError> {
        let available = self.available();
        if amount > available {
            return Err(EngineError::InsufficientLiquidity {
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    /// Reserve `amount` of the round cap.
    ///
    /// Returns true the first time in a round that the unreserved amount drops below the
    /// low-liquidity threshold.
    pub fn use_round_liquidity(&mut self, amount: u64) -> Result<bool, EngineError> {
        self.ensure_available(amount)?;
        self.reserved += amount;

        let floor = bps_of(self.round_cap, self.low_liquidity_threshold_bps);
        if !self.low_liquidity_signalled && self.available() < floor {
            self.low_liquidity_signalled = true;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn release_round_liquidity(&mut self, amount: u64) {
        debug_assert!(amount <= self.reserved);
        self.reserved = self.reserved.saturating_sub(amount);
    }

    /// Queue changes until the round settles.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Credit the round's retained stakes and debit its payouts.
    pub fn settle_round(&mut self, credit: u64, debit: u64) -> Result<(), EngineError> {
        let value = self
            .value
            .checked_add(credit)
            .and_then(|value| value.checked_sub(debit))
            .ok_or(EngineError::Overflow("settle round"))?;
        debug!(credit, debit, before = self.value, after = value, "round settled");
        self.value = value;
        Ok(())
    }

    /// Apply every queued change in order and unlock the pool.
    ///
    /// Must run after [LiquidityPool::settle_round] so queued entries are priced with the
    /// round's result.
    pub fn clear_queue<W: Wallets>(&mut self, vault: &mut Vault<W>) -> Vec<Event> {
        let mut events = Vec::new();
        self.locked = false;
        for change in std::mem::take(&mut self.queue) {
            match change.action {
                LiquidityAction::Deposit => {
                    self.pending_deposits -= change.amount;
                    self.apply_queued_deposit(vault, &change, &mut events);
                }
                LiquidityAction::Withdraw => {
                    let shares = change.amount.min(self.shares_of(&change.depositor));
                    self.redeem(vault, &change.depositor, shares, &mut events);
                }
            }
            self.prune(&change.depositor);
        }

        self.round_nonce += 1;
        self.reserved = 0;
        self.low_liquidity_signalled = false;
        self.recompute_cap();
        events
    }

    // === Configuration ===

    pub fn set_minimum(&mut self, minimum: u64) -> Result<(), EngineError> {
        validate_minimum(minimum)?;
        self.minimum = minimum;
        Ok(())
    }

    /// The new cap applies immediately if nothing is reserved, otherwise at settlement.
    pub fn set_max_exposure(&mut self, bps: u16) -> Result<(), EngineError> {
        validate_max_exposure(bps)?;
        self.max_exposure_bps = bps;
        self.recompute_cap();
        Ok(())
    }

    pub fn set_low_liquidity_threshold(&mut self, bps: u16) -> Result<(), EngineError> {
        validate_low_liquidity_threshold(bps)?;
        self.low_liquidity_threshold_bps = bps;
        Ok(())
    }

    // === Internals ===

    fn check_minimum(&self, amount: u64) -> Result<(), EngineError> {
        if amount < self.minimum {
            return Err(EngineError::BelowMinimum {
                got: amount,
                min: self.minimum,
            });
        }
        Ok(())
    }

    fn check_queue(&self, depositor: &Account) -> Result<(), EngineError> {
        if self.queue.len() >= self.max_queue {
            return Err(EngineError::LiquidityQueueFull {
                max: self.max_queue,
            });
        }
        if self
            .positions
            .get(depositor)
            .is_some_and(|position| position.last_queue_nonce == self.round_nonce)
        {
            return Err(EngineError::OneChangePerRound);
        }
        Ok(())
    }

    fn enqueue(&mut self, depositor: &Account, amount: u64, action: LiquidityAction) {
        self.positions
            .entry(depositor.clone())
            .or_default()
            .last_queue_nonce = self.round_nonce;
        self.queue.push(LiquidityChange {
            depositor: depositor.clone(),
            amount,
            action,
        });
    }

    /// Pool value and share supply after minting for `amount`, and the shares minted.
    fn mint(&self, amount: u64) -> Result<(u64, u64, u64), EngineError> {
        let shares = if self.total_shares == 0 || self.value == 0 {
            amount
        } else {
            let shares =
                (amount as u128) * (self.total_shares as u128) / (self.value as u128);
            u64::try_from(shares).map_err(|_| EngineError::Overflow("mint shares"))?
        };
        let value = self
            .value
            .checked_add(amount)
            .ok_or(EngineError::Overflow("pool value"))?;
        let total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(EngineError::Overflow("total shares"))?;
        Ok((value, total_shares, shares))
    }

    fn apply_queued_deposit<W: Wallets>(
        &mut self,
        vault: &mut Vault<W>,
        change: &LiquidityChange,
        events: &mut Vec<Event>,
    ) {
        match self.mint(change.amount) {
            Ok((value, total_shares, shares)) if shares > 0 => {
                self.value = value;
                self.total_shares = total_shares;
                self.positions
                    .entry(change.depositor.clone())
                    .or_default()
                    .shares += shares;
                debug!(amount = change.amount, shares, "queued deposit applied");
                events.push(Event::LiquidityAdded {
                    depositor: change.depositor.clone(),
                    amount: change.amount,
                    shares,
                });
            }
            _ => {
                debug!(amount = change.amount, "queued deposit mints no shares, refunding");
                events.push(Event::LiquidityRemoved {
                    depositor: change.depositor.clone(),
                    shares: 0,
                    amount: change.amount,
                });
                vault.pay(&change.depositor, change.amount, events);
            }
        }
    }

    fn redeem<W: Wallets>(
        &mut self,
        vault: &mut Vault<W>,
        depositor: &Account,
        shares: u64,
        events: &mut Vec<Event>,
    ) {
        let amount = self.share_value(shares);
        self.value -= amount;
        self.total_shares -= shares;
        if let Some(position) = self.positions.get_mut(depositor) {
            position.shares -= shares;
        }
        self.prune(depositor);
        info!(shares, amount, value = self.value, "liquidity removed");

        events.push(Event::LiquidityRemoved {
            depositor: depositor.clone(),
            shares,
            amount,
        });
        vault.pay(depositor, amount, events);
    }

    fn prune(&mut self, depositor: &Account) {
        let queued = |position: &LiquidityPosition| {
            self.locked && position.last_queue_nonce == self.round_nonce
        };
        if self
            .positions
            .get(depositor)
            .is_some_and(|position| position.shares == 0 && !queued(position))
        {
            self.positions.remove(depositor);
        }
    }

    fn recompute_cap(&mut self) {
        if self.reserved == 0 {
            self.round_cap = bps_of(self.value, self.max_exposure_bps);
        }
    }
}
