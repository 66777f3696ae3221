//! chainsim core - shared plumbing for the consensus simulators
//!
//! This crate holds what the proof-of-work, replicated-log and proof-of-stake
//! engines have in common: the TOML configuration, the error type for it,
//! timestamp helpers and the timestamped action history used by drivers.

pub mod config;
pub mod error;
pub mod history;

pub use config::{HistoryConfig, PosConfig, PowConfig, SimConfig, SmrConfig, ValidatorSpec};
pub use error::CoreError;
pub use history::ActionHistory;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Simulator version
pub const CHAINSIM_VERSION: &str = "0.1.0";

/// Current wall-clock time as fractional unix seconds.
///
/// Block timestamps in every engine use this representation.
pub fn unix_timestamp() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp_micros() as f64 / 1_000_000.0
}
