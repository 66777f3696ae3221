//! Error types for the proof-of-work chain

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PowError {
    #[error("Transaction amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("Difficulty {0} is above the 64 hex digits of a block hash")]
    InvalidDifficulty(u32),

    #[error("Transaction signature did not verify")]
    InvalidSignature,

    #[error("No nonce met difficulty {difficulty} within {attempts} attempts")]
    MiningExhausted { difficulty: u32, attempts: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
