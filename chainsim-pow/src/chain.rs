//! Chain state, pending pool and fork-choice

use crate::{ProofOfWorkBlock, PowError, Result, SignedTransaction};
use chainsim_core::config::{PowConfig, MAX_DIFFICULTY};
use ed25519_dalek::VerifyingKey;
use tracing::{debug, info};

/// An ordered chain of mined blocks plus the transactions waiting for the next one
#[derive(Debug, Clone)]
pub struct ProofOfWorkChain {
    /// Blocks in order, starting with genesis; never empty
    blocks: Vec<ProofOfWorkBlock>,

    /// Required leading zero digits for non-genesis blocks
    difficulty: u32,

    /// Submitted transactions not yet sealed
    pending: Vec<SignedTransaction>,

    /// Optional per-block mining budget
    max_attempts: Option<u64>,
}

impl ProofOfWorkChain {
    /// Create a chain holding only the genesis block
    pub fn new(difficulty: u32) -> Result<Self> {
        if difficulty > MAX_DIFFICULTY {
            return Err(PowError::InvalidDifficulty(difficulty));
        }

        Ok(Self {
            blocks: vec![ProofOfWorkBlock::genesis()],
            difficulty,
            pending: Vec::new(),
            max_attempts: None,
        })
    }

    /// Create a chain from the `[pow]` configuration section
    pub fn from_config(config: &PowConfig) -> Result<Self> {
        let mut chain = Self::new(config.difficulty)?;
        chain.max_attempts = config.max_attempts;
        Ok(chain)
    }

    /// Queue a transaction for the next block
    pub fn submit(&mut self, transaction: SignedTransaction) -> Result<()> {
        if !(transaction.amount.is_finite() && transaction.amount > 0.0) {
            return Err(PowError::InvalidAmount(transaction.amount));
        }

        debug!(
            "Queued transaction {} -> {} ({})",
            transaction.sender, transaction.recipient, transaction.amount
        );
        self.pending.push(transaction);
        Ok(())
    }

    /// Verify `signature` before queueing the transaction
    pub fn submit_signed(
        &mut self,
        transaction: SignedTransaction,
        signature: &[u8],
        public_key: &VerifyingKey,
    ) -> Result<()> {
        if !SignedTransaction::verify(&transaction, signature, public_key) {
            return Err(PowError::InvalidSignature);
        }
        self.submit(transaction)
    }

    /// Mine every pending transaction into a new block and append it.
    ///
    /// An empty pool still produces a block; refusing that is up to the caller.
    /// When a mining budget is configured and runs out, nothing changes.
    pub fn seal_block(&mut self) -> Result<ProofOfWorkBlock> {
        let last = self.last_block();
        let mut block = ProofOfWorkBlock::new(
            last.index + 1,
            last.hash.clone(),
            chainsim_core::unix_timestamp(),
            self.pending.clone(),
        );

        match self.max_attempts {
            Some(max_attempts) => block.mine_bounded(self.difficulty, max_attempts)?,
            None => block.mine(self.difficulty),
        }

        info!(
            "Sealed block {} with {} transactions: {}",
            block.index,
            block.transactions.len(),
            block.hash
        );
        self.blocks.push(block.clone());
        self.pending.clear();
        Ok(block)
    }

    /// Check linkage, hash integrity and difficulty of `chain`.
    ///
    /// Stops at the first violation. An empty chain is not valid.
    pub fn is_valid(chain: &[ProofOfWorkBlock], difficulty: u32) -> bool {
        let Some(first) = chain.first() else {
            return false;
        };
        if !first.has_valid_hash() {
            return false;
        }

        for pair in chain.windows(2) {
            let (prev, block) = (&pair[0], &pair[1]);
            if block.previous_hash != prev.hash {
                debug!("Block {} does not link to block {}", block.index, prev.index);
                return false;
            }
            if !block.has_valid_hash() {
                debug!("Block {} hash does not match its contents", block.index);
                return false;
            }
            if !block.meets_difficulty(difficulty) {
                debug!("Block {} misses difficulty {}", block.index, difficulty);
                return false;
            }
        }

        true
    }

    /// Validate this chain at its own difficulty
    pub fn is_valid_chain(&self) -> bool {
        Self::is_valid(&self.blocks, self.difficulty)
    }

    /// Adopt `candidate` if it is strictly longer and valid. Ties keep the current chain.
    pub fn replace_if_better(&mut self, candidate: &[ProofOfWorkBlock]) -> bool {
        if candidate.len() <= self.blocks.len() {
            debug!(
                "Candidate chain of {} blocks is not longer than ours ({})",
                candidate.len(),
                self.blocks.len()
            );
            return false;
        }
        if !Self::is_valid(candidate, self.difficulty) {
            debug!("Rejected invalid candidate chain of {} blocks", candidate.len());
            return false;
        }

        info!(
            "Replaced chain of {} blocks with {} blocks",
            self.blocks.len(),
            candidate.len()
        );
        self.blocks = candidate.to_vec();
        true
    }

    /// Synchronize with a peer through a read-only view of its chain
    pub fn sync_from(&mut self, peer: &ProofOfWorkChain) -> bool {
        self.replace_if_better(peer.blocks())
    }

    pub fn blocks(&self) -> &[ProofOfWorkBlock] {
        &self.blocks
    }

    /// Latest block; genesis for a fresh chain
    pub fn last_block(&self) -> &ProofOfWorkBlock {
        // `blocks` always holds at least the genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn pending(&self) -> &[SignedTransaction] {
        &self.pending
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
