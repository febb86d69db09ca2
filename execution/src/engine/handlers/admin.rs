use std::sync::Arc;

use crashpool_types::{Account, ConfigField, EngineError, Event};
use tracing::info;

use crate::{
    config::{validate_cancel_return, validate_intro_blocks, validate_minimum},
    engine::{check_loot_table, Engine},
    loot_table::LootTable,
    randomness::RandomnessSource,
    vault::Wallets,
};

fn config_updated(field: ConfigField, value: u64) -> Vec<Event> {
    info!(?field, value, "config updated");
    vec![Event::ConfigUpdated { field, value }]
}

impl<R: RandomnessSource, W: Wallets> Engine<R, W> {
    // === Admin Handlers ===

    pub fn set_active(&mut self, caller: &Account, active: bool) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        self.round.active = active;
        info!(active, "active changed");
        Ok(vec![Event::ActiveChanged { active }])
    }

    pub fn set_hash_producer(
        &mut self,
        caller: &Account,
        producer: Account,
    ) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        self.hash_producer = producer.clone();
        info!(?producer, "hash producer changed");
        Ok(vec![Event::HashProducerChanged { producer }])
    }

    /// Basis points of the stake returned when a bet is cancelled.
    pub fn set_cancel_return_numerator(
        &mut self,
        caller: &Account,
        bps: u16,
    ) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        validate_cancel_return(bps)?;
        self.round.cancel_return_bps = bps;
        Ok(config_updated(ConfigField::CancelReturn, bps as u64))
    }

    pub fn set_intro_blocks(
        &mut self,
        caller: &Account,
        blocks: u64,
    ) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        validate_intro_blocks(blocks, self.round.reduced_intro_blocks)?;
        self.round.intro_blocks = blocks;
        Ok(config_updated(ConfigField::IntroBlocks, blocks))
    }

    pub fn set_reduced_intro_blocks(
        &mut self,
        caller: &Account,
        blocks: u64,
    ) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        validate_intro_blocks(self.round.intro_blocks, blocks)?;
        self.round.reduced_intro_blocks = blocks;
        Ok(config_updated(ConfigField::ReducedIntroBlocks, blocks))
    }

    /// Replace the loot table. While a round is scheduled the table is staged for the next one.
    pub fn set_loot_table(
        &mut self,
        caller: &Account,
        table: Arc<dyn LootTable>,
    ) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        check_loot_table(table.as_ref(), &self.source)?;
        let name = table.name().to_string();
        let length = table.length();

        if self.round.is_idle() {
            self.round.loot_table = table;
            self.round.staged_loot_table = None;
            info!(loot_table = %name, length, "loot table updated");
            Ok(vec![Event::LootTableUpdated { name, length }])
        } else {
            self.round.staged_loot_table = Some(table);
            info!(loot_table = %name, length, "loot table staged");
            Ok(vec![Event::LootTableStaged { name, length }])
        }
    }

    pub fn set_max_exposure(&mut self, caller: &Account, bps: u16) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        self.pool.set_max_exposure(bps)?;
        Ok(config_updated(ConfigField::MaxExposure, bps as u64))
    }

    pub fn set_low_liquidity_threshold(
        &mut self,
        caller: &Account,
        bps: u16,
    ) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        self.pool.set_low_liquidity_threshold(bps)?;
        Ok(config_updated(ConfigField::LowLiquidityThreshold, bps as u64))
    }

    /// Minimum stake and minimum liquidity change.
    pub fn set_minimum(&mut self, caller: &Account, minimum: u64) -> Result<Vec<Event>, EngineError> {
        self.check_owner(caller)?;
        validate_minimum(minimum)?;
        self.pool.set_minimum(minimum)?;
        self.round.minimum = minimum;
        Ok(config_updated(ConfigField::Minimum, minimum))
    }
}
