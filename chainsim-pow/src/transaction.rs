//! Value transfers and their detached signatures

use crate::{PowError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A transfer of `amount` from `sender` to `recipient`.
///
/// The signature is kept outside the transaction: it is produced over the
/// canonical encoding of the three fields and checked with [`SignedTransaction::verify`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignedTransaction {
    /// Paying party
    pub sender: String,

    /// Receiving party
    pub recipient: String,

    /// Transferred amount, always positive
    pub amount: f64,
}

/// Canonical signing payload: keys in lexicographic order
#[derive(Serialize)]
struct SignableTx<'a> {
    amount: f64,
    recipient: &'a str,
    sender: &'a str,
}

impl SignedTransaction {
    /// Create a transaction, rejecting non-positive amounts
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Result<Self> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(PowError::InvalidAmount(amount));
        }

        Ok(Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        })
    }

    /// Bytes covered by the signature
    pub fn signing_data(&self) -> Result<Vec<u8>> {
        let signable = SignableTx {
            amount: self.amount,
            recipient: &self.recipient,
            sender: &self.sender,
        };
        Ok(serde_json::to_vec(&signable)?)
    }

    /// Sign the canonical encoding, returning the raw signature bytes
    pub fn sign(&self, signer: &TransactionSigner) -> Result<Vec<u8>> {
        let data = self.signing_data()?;
        Ok(signer.signing_key.sign(&data).to_bytes().to_vec())
    }

    /// Check `signature` against the canonical encoding of `tx`.
    ///
    /// Malformed signature bytes and mismatched data both yield `false`.
    pub fn verify(tx: &SignedTransaction, signature: &[u8], public_key: &VerifyingKey) -> bool {
        let data = match tx.signing_data() {
            Ok(data) => data,
            Err(e) => {
                debug!("Cannot encode transaction for verification: {}", e);
                return false;
            }
        };

        let signature = match Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(e) => {
                debug!("Malformed signature: {}", e);
                return false;
            }
        };

        match public_key.verify(&data, &signature) {
            Ok(()) => true,
            Err(e) => {
                debug!("Signature verification failed: {}", e);
                false
            }
        }
    }
}

/// Ed25519 key held by a node that originates transactions
#[derive(Clone)]
pub struct TransactionSigner {
    signing_key: SigningKey,
}

impl TransactionSigner {
    /// Generate a fresh key from the OS random source
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuild a signer from its 32-byte secret
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Key used by others to verify this signer's transactions
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("public_key", &hex::encode(self.public_key().as_bytes()))
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}
