//! chainsim SMR - state machine replication over an in-process network
//!
//! A leader broadcasts key/value commands to its followers, a log position
//! commits once every active follower holds the same command there, and
//! every active replica applies committed commands to its state. Replicas
//! can be partitioned away, recovered from the leader's state snapshot and
//! added at runtime.

pub mod command;
pub mod error;
pub mod network;
pub mod node;
pub mod record;

pub use command::{Command, CommandValue};
pub use error::SmrError;
pub use network::{CommitOutcome, ReplicatedLogNetwork, RoundOutcome};
pub use node::{ApplyOutcome, ReplicaNode};
pub use record::{NetworkRecord, NodeRecord, SnapshotStore};

/// Result type for replication operations
pub type Result<T> = std::result::Result<T, SmrError>;

/// Network size used when none is configured
pub const DEFAULT_NODE_COUNT: usize = 5;
