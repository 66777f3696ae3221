//! Error types for the proof-of-stake chain

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PosError {
    #[error("Stake amount must be positive, got {0}")]
    InvalidStakeAmount(f64),

    #[error("Validator {0} is slashed")]
    ValidatorSlashed(String),

    #[error("Slashed validator {0} cannot produce blocks")]
    SlashedValidatorCannotProduce(String),

    #[error("No active validators")]
    NoActiveValidators,

    #[error("Total validator weight {0} is not a finite number")]
    WeightOverflow(f64),

    #[error("No validator selected")]
    NoValidatorSelected,

    #[error("Unknown validator {0}")]
    UnknownValidator(String),
}
