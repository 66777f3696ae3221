//! Stake-weighted block production with long-range attack detection

use crate::constants::{LONG_RANGE_SLASH_RATIO, LONG_RANGE_WINDOW};
use crate::{BlockRecord, PosError, Result, Validator, ValidatorStats};
use chainsim_core::PosConfig;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A slash applied after a long-range attack was detected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlashEvent {
    pub validator_name: String,
    /// Amount removed from the deposit
    pub penalty: f64,
    /// Chain length when the attack was detected
    pub height: usize,
}

/// Tally of a selection-only attack simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackReport {
    pub attacker: String,
    pub rounds: u64,
    pub attacker_blocks: u64,
    pub honest_blocks: u64,
}

impl AttackReport {
    /// Fraction of rounds the attacker was selected, 0 when no rounds ran
    pub fn attacker_share(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        self.attacker_blocks as f64 / self.rounds as f64
    }

    /// True when the attacker won strictly more rounds than everyone else
    pub fn attacker_controls_network(&self) -> bool {
        self.attacker_blocks > self.honest_blocks
    }
}

/// Validators plus the chain of block records they produced
#[derive(Debug)]
pub struct ProofOfStakeChain<R = StdRng> {
    validators: Vec<Validator>,
    chain: Vec<BlockRecord>,
    slash_events: Vec<SlashEvent>,
    rng: R,
}

impl ProofOfStakeChain<StdRng> {
    /// Chain drawing from an entropy-seeded generator
    pub fn new(validators: Vec<Validator>) -> Self {
        Self::with_rng(validators, StdRng::from_entropy())
    }

    /// Chain whose selection sequence is reproducible
    pub fn with_seed(validators: Vec<Validator>, seed: u64) -> Self {
        Self::with_rng(validators, StdRng::seed_from_u64(seed))
    }

    /// Build the validator set described by `config`.
    ///
    /// Entries with a zero stake join with nothing locked.
    pub fn from_config(config: &PosConfig) -> Result<Self> {
        let mut validators = Vec::with_capacity(config.validators.len());
        for spec in &config.validators {
            let mut validator = Validator::new(spec.name.clone(), spec.balance);
            if spec.stake != 0.0 {
                validator.stake(spec.stake)?;
            }
            validators.push(validator);
        }

        Ok(match config.seed {
            Some(seed) => Self::with_seed(validators, seed),
            None => Self::new(validators),
        })
    }
}

impl<R: RngCore> ProofOfStakeChain<R> {
    /// Chain drawing from `rng`
    pub fn with_rng(validators: Vec<Validator>, rng: R) -> Self {
        info!("Created PoS chain with {} validators", validators.len());
        Self {
            validators,
            chain: Vec::new(),
            slash_events: Vec::new(),
            rng,
        }
    }

    /// Draw a validator with probability proportional to its weight.
    ///
    /// A uniform threshold in `[0, total)` is compared against the running
    /// sum of weights in insertion order; the first unslashed validator whose
    /// running sum reaches the threshold wins.
    pub fn select_validator(&mut self) -> Result<&Validator> {
        let index = self.select_index()?;
        Ok(&self.validators[index])
    }

    fn select_index(&mut self) -> Result<usize> {
        let total: f64 = self.validators.iter().map(Validator::weight).sum();
        if !total.is_finite() {
            return Err(PosError::WeightOverflow(total));
        }
        if total <= 0.0 {
            return Err(PosError::NoActiveValidators);
        }

        let threshold = self.rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        for (index, validator) in self.validators.iter().enumerate() {
            cumulative += validator.weight();
            if cumulative >= threshold && !validator.is_slashed() {
                return Ok(index);
            }
        }

        Err(PosError::NoValidatorSelected)
    }

    /// Select a producer, append its block and check for a long-range attack
    pub fn produce_block(&mut self) -> Result<BlockRecord> {
        let index = self.select_index()?;
        self.produce_with(index)
    }

    /// Have the named validator produce the next block, bypassing selection
    pub fn produce_block_as(&mut self, name: &str) -> Result<BlockRecord> {
        let index = self
            .validators
            .iter()
            .position(|v| v.name() == name)
            .ok_or_else(|| PosError::UnknownValidator(name.to_string()))?;
        self.produce_with(index)
    }

    fn produce_with(&mut self, index: usize) -> Result<BlockRecord> {
        let record = self.validators[index].produce_block()?;
        self.chain.push(record.clone());
        debug!(
            "Block {} produced by {}",
            self.chain.len(),
            record.validator_name
        );

        self.detect_long_range_attack(index);
        Ok(record)
    }

    /// Slash validator `index` if it produced each of the last three blocks
    fn detect_long_range_attack(&mut self, index: usize) {
        if self.chain.len() < LONG_RANGE_WINDOW {
            return;
        }

        let validator = &self.validators[index];
        let tail = &self.chain[self.chain.len() - LONG_RANGE_WINDOW..];
        if !tail.iter().all(|block| block.validator_name == validator.name()) {
            return;
        }

        let amount = validator.deposit() * LONG_RANGE_SLASH_RATIO;
        let penalty = self.validators[index].slash(amount);
        let event = SlashEvent {
            validator_name: self.validators[index].name().to_string(),
            penalty,
            height: self.chain.len(),
        };

        warn!(
            "Long-range attack detected from {} at height {}, slashed {}",
            event.validator_name, event.height, event.penalty
        );
        self.slash_events.push(event);
    }

    /// Count how often `attacker` wins selection over `rounds` draws.
    ///
    /// Nothing is produced, so weights and the chain stay as they are.
    pub fn simulate(&mut self, attacker: &str, rounds: u64) -> Result<AttackReport> {
        let mut report = AttackReport {
            attacker: attacker.to_string(),
            rounds,
            attacker_blocks: 0,
            honest_blocks: 0,
        };

        for _ in 0..rounds {
            let index = self.select_index()?;
            if self.validators[index].name() == attacker {
                report.attacker_blocks += 1;
            } else {
                report.honest_blocks += 1;
            }
        }

        info!(
            "Attack simulation over {} rounds: {} attacker, {} honest",
            rounds, report.attacker_blocks, report.honest_blocks
        );
        if report.attacker_controls_network() {
            warn!("{} controls the network", attacker);
        }
        Ok(report)
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn validator(&self, name: &str) -> Option<&Validator> {
        self.validators.iter().find(|v| v.name() == name)
    }

    pub fn chain(&self) -> &[BlockRecord] {
        &self.chain
    }

    pub fn slash_events(&self) -> &[SlashEvent] {
        &self.slash_events
    }

    pub fn validator_stats(&self) -> Vec<ValidatorStats> {
        self.validators.iter().map(Validator::stats).collect()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}
