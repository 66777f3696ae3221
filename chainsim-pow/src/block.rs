//! Blocks and nonce search

use crate::{PowError, Result, SignedTransaction, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::debug;

/// A block of transactions linked to its predecessor by hash
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProofOfWorkBlock {
    /// Position in the chain (0 for genesis)
    pub index: u64,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Creation time, fractional unix seconds
    pub timestamp: f64,

    /// Transactions sealed in this block, in submission order
    pub transactions: Vec<SignedTransaction>,

    /// Proof-of-work counter
    pub nonce: u64,

    /// Lowercase hex SHA3-256 digest of every other field
    pub hash: String,
}

impl ProofOfWorkBlock {
    /// Create an unmined block with nonce 0 and its hash computed once
    pub fn new(
        index: u64,
        previous_hash: impl Into<String>,
        timestamp: f64,
        transactions: Vec<SignedTransaction>,
    ) -> Self {
        let mut block = Self {
            index,
            previous_hash: previous_hash.into(),
            timestamp,
            transactions,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// The fixed first block of every chain
    pub fn genesis() -> Self {
        Self::new(0, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP, Vec::new())
    }

    /// Digest of index, previous hash, timestamp, transactions and nonce.
    ///
    /// Strings are length-prefixed and numbers little-endian so distinct
    /// field values never collide into the same byte stream.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(self.index.to_le_bytes());
        update_str(&mut hasher, &self.previous_hash);
        hasher.update(self.timestamp.to_bits().to_le_bytes());
        hasher.update((self.transactions.len() as u64).to_le_bytes());
        for tx in &self.transactions {
            update_str(&mut hasher, &tx.sender);
            update_str(&mut hasher, &tx.recipient);
            hasher.update(tx.amount.to_bits().to_le_bytes());
        }
        hasher.update(self.nonce.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the stored hash has at least `difficulty` leading zero digits
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        let difficulty = difficulty as usize;
        self.hash.len() >= difficulty
            && self.hash.as_bytes()[..difficulty].iter().all(|b| *b == b'0')
    }

    /// Whether the stored hash still matches the block contents
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Increment the nonce until the hash meets `difficulty`.
    ///
    /// There is no attempt limit; the same inputs always stop at the same nonce.
    pub fn mine(&mut self, difficulty: u32) {
        while !self.meets_difficulty(difficulty) {
            self.nonce += 1;
            self.hash = self.compute_hash();
        }
        debug!("Block {} mined with nonce {}: {}", self.index, self.nonce, self.hash);
    }

    /// Like [`mine`](Self::mine), but give up after `max_attempts` new nonces
    pub fn mine_bounded(&mut self, difficulty: u32, max_attempts: u64) -> Result<()> {
        let mut attempts = 0u64;
        while !self.meets_difficulty(difficulty) {
            if attempts == max_attempts {
                return Err(PowError::MiningExhausted {
                    difficulty,
                    attempts,
                });
            }
            attempts += 1;
            self.nonce += 1;
            self.hash = self.compute_hash();
        }
        debug!(
            "Block {} mined with nonce {} after {} attempts",
            self.index, self.nonce, attempts
        );
        Ok(())
    }
}

fn update_str(hasher: &mut Sha3_256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
