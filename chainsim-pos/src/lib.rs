//! chainsim PoS - stake-weighted block production
//!
//! Validators lock part of their balance as a deposit. Each round one of them
//! is drawn with probability proportional to a weight that decays as it
//! produces blocks, and a validator seen producing three blocks in a row is
//! treated as mounting a long-range attack and slashed.

pub mod chain;
pub mod error;
pub mod validator;

pub use chain::{AttackReport, ProofOfStakeChain, SlashEvent};
pub use error::PosError;
pub use validator::{BlockRecord, Validator, ValidatorStats};

/// Result type for proof-of-stake operations
pub type Result<T> = std::result::Result<T, PosError>;

/// Economic constants of the simulation
pub mod constants {
    /// Balance credited to the producer of every block
    pub const BLOCK_REWARD: f64 = 1.0;

    /// Weight removed per block a validator has produced
    pub const PRODUCTION_PENALTY: f64 = 5.0;

    /// Floor of an unslashed validator's weight
    pub const MIN_WEIGHT: f64 = 1.0;

    /// Share of a slashed amount returned to the validator's balance
    pub const SLASH_REFUND_RATIO: f64 = 0.5;

    /// Consecutive blocks by one validator that count as a long-range attack
    pub const LONG_RANGE_WINDOW: usize = 3;

    /// Share of the deposit taken when a long-range attack is detected
    pub const LONG_RANGE_SLASH_RATIO: f64 = 0.75;
}
