//! # satchel-wallet — single-key UTXO wallet.
//!
//! Holds exactly one private key, funds payments from the UTXOs an explorer
//! lists for its address, and signs and broadcasts the result.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`keys`] — private key generation and WIF-style encoding
//! - [`coin_selection`] — first-fit UTXO selection and the fee schedule
//! - [`builder`] — unsigned transaction assembly
//! - [`signer`] — signing and canonical serialization
//! - [`store`] — key-value persistence of the encoded key
//! - [`explorer`] — block explorer client
//! - [`retry`] — broadcast backoff
//! - [`config`] — explicit wallet configuration
//! - [`service`] — `init`/`send` orchestration

pub mod builder;
pub mod coin_selection;
pub mod config;
pub mod error;
pub mod explorer;
pub mod keys;
pub mod retry;
pub mod service;
pub mod signer;
pub mod store;

// Re-exports for convenient access
pub use builder::{TransactionBuilder, UnsignedTransaction, parse_recipient};
pub use coin_selection::{CoinSelection, CoinSelector, FeePolicy};
pub use config::WalletConfig;
pub use error::WalletError;
pub use explorer::{BlockExplorer, BroadcastResult, HttpExplorer};
pub use keys::{KeyStore, PrivateKey};
pub use retry::RetryPolicy;
pub use service::{InitReport, SendReceipt, WalletInfo, WalletService};
pub use signer::{SignedTransaction, Signer};
pub use store::{KeyValueStore, MemoryStore, PRIVATE_KEY_RECORD, RocksStore};
