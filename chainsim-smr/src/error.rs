//! Error types for the replicated-log network

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmrError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("No active nodes in the network")]
    NoActiveNodes,

    #[error("Unknown node {0}")]
    UnknownNode(usize),

    #[error("Invalid network record: {0}")]
    InvalidRecord(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
