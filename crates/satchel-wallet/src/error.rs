//! Wallet error types.

use satchel_core::error::{CryptoError, TransactionError};
use thiserror::Error;

/// Errors produced by the wallet pipeline and its collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Stored or supplied key text is malformed or for another network.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The available UTXOs cannot cover the spend.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Total value of the UTXOs considered.
        have: u64,
        /// Value required (amount plus fee where applicable).
        need: u64,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Recipient address is malformed or on another network.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// An input is locked to an address the signing key does not control.
    #[error("key mismatch on input {index}: locked to {locked_to}")]
    KeyMismatch {
        /// Position of the offending input.
        index: usize,
        /// Address the input is locked to.
        locked_to: String,
    },

    /// A wallet key already exists and overwrite was not requested.
    #[error("wallet already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("data payload too large: {size} > {max} bytes")]
    DataTooLarge { size: usize, max: usize },

    /// Missing record in the key-value store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Block explorer request failed.
    #[error("network error: {0}")]
    Network(String),

    /// The explorer answered but refused the request (4xx).
    #[error("rejected by explorer: {0}")]
    Rejected(String),

    /// Key-value store failure.
    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization: {0}")]
    Serialization(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl WalletError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, WalletError::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_funds() {
        let e = WalletError::InsufficientFunds {
            have: 100,
            need: 200,
        };
        assert_eq!(e.to_string(), "insufficient funds: have 100, need 200");
    }

    #[test]
    fn display_key_mismatch() {
        let e = WalletError::KeyMismatch {
            index: 2,
            locked_to: "tsch1xyz".into(),
        };
        assert_eq!(e.to_string(), "key mismatch on input 2: locked to tsch1xyz");
    }

    #[test]
    fn only_network_errors_are_transient() {
        assert!(WalletError::Network("timeout".into()).is_transient());
        assert!(!WalletError::Io("disk".into()).is_transient());
        assert!(!WalletError::Rejected("bad tx".into()).is_transient());
        assert!(!WalletError::InvalidAmount("zero".into()).is_transient());
    }

    #[test]
    fn from_crypto_error() {
        let wallet: WalletError = CryptoError::InvalidSignature.into();
        assert_eq!(wallet, WalletError::Crypto(CryptoError::InvalidSignature));
    }

    #[test]
    fn from_transaction_error() {
        let wallet: WalletError = TransactionError::ValueOverflow.into();
        assert_eq!(wallet, WalletError::Transaction(TransactionError::ValueOverflow));
    }
}
