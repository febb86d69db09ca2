//! Value holder for stakes, pool liquidity and staged payments.
//!
//! Outgoing transfers are attempted immediately. A recipient that refuses is credited on an
//! internal ledger instead and pulls the value later with [Vault::claim], so a refusing payee
//! can never block settlement.

use std::collections::BTreeMap;

use crashpool_types::{Account, EngineError, Event};
use tracing::{debug, warn};

/// Balances held outside the engine.
pub trait Wallets {
    fn balance(&self, account: &Account) -> u64;

    /// Pull `amount` from `from`; fails without side effects if the balance is short.
    fn collect(&mut self, from: &Account, amount: u64) -> Result<(), EngineError>;

    /// Push `amount` to `to`; the recipient may refuse.
    fn transfer(&mut self, to: &Account, amount: u64) -> Result<(), EngineError>;
}

/// Outcome of [Vault::send].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Refused by the recipient and credited as claimable.
    Staged,
}

#[derive(Debug)]
pub struct Vault<W> {
    wallets: W,
    balance: u64,
    claimable: BTreeMap<Account, u64>,
    total_claimable: u64,
}

impl<W: Wallets> Vault<W> {
    pub fn new(wallets: W) -> Self {
        Self {
            wallets,
            balance: 0,
            claimable: BTreeMap::new(),
            total_claimable: 0,
        }
    }

    pub fn wallets(&self) -> &W {
        &self.wallets
    }

    pub fn wallets_mut(&mut self) -> &mut W {
        &mut self.wallets
    }

    /// Value held, including staged credit.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn claimable(&self, account: &Account) -> u64 {
        self.claimable.get(account).copied().unwrap_or_default()
    }

    pub fn total_claimable(&self) -> u64 {
        self.total_claimable
    }

    pub fn receive(&mut self, from: &Account, amount: u64) -> Result<(), EngineError> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(EngineError::Overflow("vault balance"))?;
        self.wallets.collect(from, amount)?;
        self.balance = balance;
        debug!(amount, balance, "vault received");
        Ok(())
    }

    /// Pay `amount` out of the vault. Never fails; a refused transfer is staged.
    ///
    /// Callers only send value the vault holds.
    pub fn send(&mut self, to: &Account, amount: u64) -> SendOutcome {
        if amount == 0 {
            return SendOutcome::Delivered;
        }
        debug_assert!(amount <= self.balance - self.total_claimable);
        match self.wallets.transfer(to, amount) {
            Ok(()) => {
                self.balance = self.balance.saturating_sub(amount);
                SendOutcome::Delivered
            }
            Err(err) => {
                warn!(?err, amount, "transfer refused, staging payment");
                let credit = self.claimable.entry(to.clone()).or_default();
                *credit = credit.saturating_add(amount);
                self.total_claimable = self.total_claimable.saturating_add(amount);
                SendOutcome::Staged
            }
        }
    }

    /// [Vault::send], recording a [Event::PaymentStaged] if the transfer was refused.
    pub fn pay(&mut self, to: &Account, amount: u64, events: &mut Vec<Event>) -> SendOutcome {
        let outcome = self.send(to, amount);
        if outcome == SendOutcome::Staged {
            events.push(Event::PaymentStaged {
                recipient: to.clone(),
                amount,
            });
        }
        outcome
    }

    /// Deliver the staged credit of `account`. The credit is kept if the recipient still refuses.
    pub fn claim(&mut self, account: &Account) -> Result<u64, EngineError> {
        let amount = self.claimable(account);
        if amount == 0 {
            return Err(EngineError::NothingToClaim);
        }
        self.wallets.transfer(account, amount)?;
        self.claimable.remove(account);
        self.total_claimable -= amount;
        self.balance -= amount;
        debug!(amount, "claimed staged payment");
        Ok(amount)
    }
}
