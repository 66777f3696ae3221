//! chainsim PoW - proof-of-work ledger
//!
//! Signed transfers are queued in a pending pool, sealed into blocks by
//! searching for a nonce whose hash meets the difficulty target, and chains
//! compete under the longest-valid-chain rule.

pub mod block;
pub mod chain;
pub mod error;
pub mod transaction;

pub use block::ProofOfWorkBlock;
pub use chain::ProofOfWorkChain;
pub use error::PowError;
pub use transaction::{SignedTransaction, TransactionSigner};

/// Result type for proof-of-work operations
pub type Result<T> = std::result::Result<T, PowError>;

/// `previous_hash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Timestamp of the genesis block, shared by every chain instance
pub const GENESIS_TIMESTAMP: f64 = 0.0;
