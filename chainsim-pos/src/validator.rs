//! Validator accounts: balance, locked deposit and production history

use crate::constants::{BLOCK_REWARD, MIN_WEIGHT, PRODUCTION_PENALTY, SLASH_REFUND_RATIO};
use crate::{PosError, Result};
use chainsim_core::unix_timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A staking participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    name: String,
    balance: f64,
    deposit: f64,
    blocks_created: u64,
    slashed: bool,
}

/// Entry appended to the chain for every produced block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub validator_name: String,
    /// Producer's block count including this block
    pub blocks_created: u64,
    /// Producer's balance after the reward
    pub balance: f64,
    pub timestamp: f64,
}

/// Point-in-time view of a validator for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorStats {
    pub name: String,
    pub weight: f64,
    pub blocks: u64,
    pub balance: f64,
    pub deposit: f64,
    pub slashed: bool,
}

impl Validator {
    /// Create an unslashed validator with nothing staked
    pub fn new(name: impl Into<String>, balance: f64) -> Self {
        Self {
            name: name.into(),
            balance,
            deposit: 0.0,
            blocks_created: 0,
            slashed: false,
        }
    }

    /// Selection weight.
    ///
    /// Zero once slashed; otherwise deposit plus balance less a penalty per
    /// produced block, never below 1.
    pub fn weight(&self) -> f64 {
        if self.slashed {
            return 0.0;
        }
        let raw = self.deposit + self.balance - PRODUCTION_PENALTY * self.blocks_created as f64;
        raw.max(MIN_WEIGHT)
    }

    /// Move `amount` from balance to deposit.
    ///
    /// The balance is not checked for cover and may go negative.
    pub fn stake(&mut self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(PosError::InvalidStakeAmount(amount));
        }
        if self.slashed {
            return Err(PosError::ValidatorSlashed(self.name.clone()));
        }

        self.deposit += amount;
        self.balance -= amount;
        debug!(
            "{} staked {}, deposit now {}",
            self.name, amount, self.deposit
        );
        Ok(())
    }

    /// Credit the block reward and record the block
    pub fn produce_block(&mut self) -> Result<BlockRecord> {
        if self.slashed {
            return Err(PosError::SlashedValidatorCannotProduce(self.name.clone()));
        }

        self.blocks_created += 1;
        self.balance += BLOCK_REWARD;

        Ok(BlockRecord {
            validator_name: self.name.clone(),
            blocks_created: self.blocks_created,
            balance: self.balance,
            timestamp: unix_timestamp(),
        })
    }

    /// Take up to `amount` from the deposit and refund half of what was
    /// taken to the balance. Marks the validator slashed permanently.
    ///
    /// Returns the amount removed from the deposit.
    pub fn slash(&mut self, amount: f64) -> f64 {
        let removed = amount.max(0.0).min(self.deposit);
        self.deposit -= removed;
        self.balance += removed * SLASH_REFUND_RATIO;
        self.slashed = true;

        info!(
            "Slashed {}: removed {} from deposit, refunded {}",
            self.name,
            removed,
            removed * SLASH_REFUND_RATIO
        );
        removed
    }

    pub fn stats(&self) -> ValidatorStats {
        ValidatorStats {
            name: self.name.clone(),
            weight: self.weight(),
            blocks: self.blocks_created,
            balance: self.balance,
            deposit: self.deposit,
            slashed: self.slashed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn deposit(&self) -> f64 {
        self.deposit
    }

    pub fn blocks_created(&self) -> u64 {
        self.blocks_created
    }

    pub fn is_slashed(&self) -> bool {
        self.slashed
    }
}
