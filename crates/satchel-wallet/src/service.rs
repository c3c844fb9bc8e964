//! Command-level wallet operations.
//!
//! [`WalletService`] composes the key store, coin selection, building and
//! signing with the two external collaborators: the key-value store holding
//! the encoded key and the block explorer.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use satchel_core::address::{Address, Network};
use satchel_core::types::{Hash256, Utxo};

use crate::builder::{TransactionBuilder, parse_recipient};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::explorer::{BlockExplorer, BroadcastResult};
use crate::keys::{KeyStore, PrivateKey};
use crate::retry::retry_transient;
use crate::signer::{SignedTransaction, Signer};
use crate::store::{KeyValueStore, PRIVATE_KEY_RECORD};

/// Result of `init`: the one-time export of the new key.
pub struct InitReport {
    /// Encoded private key. Wiped on drop.
    pub wif: Zeroizing<String>,
    pub address: Address,
    pub network: Network,
}

impl fmt::Debug for InitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitReport")
            .field("wif", &"[REDACTED]")
            .field("address", &self.address)
            .field("network", &self.network)
            .finish()
    }
}

/// Result of `info`.
#[derive(Debug, Clone, Serialize)]
pub struct WalletInfo {
    pub address: Address,
    pub network: Network,
    /// Explorer view of the wallet address.
    pub explorer: Value,
}

/// Result of a successful `send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub txid: String,
    pub amount: u64,
    pub fee: u64,
    pub change: u64,
    /// Number of inputs spent.
    pub inputs: usize,
    /// Encoded size in bytes.
    pub size: usize,
}

/// Orchestrates wallet commands against a store and an explorer.
pub struct WalletService<S, E> {
    config: WalletConfig,
    store: S,
    explorer: E,
}

impl<S: KeyValueStore, E: BlockExplorer> WalletService<S, E> {
    pub fn new(config: WalletConfig, store: S, explorer: E) -> Self {
        Self {
            config,
            store,
            explorer,
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn explorer(&self) -> &E {
        &self.explorer
    }

    /// Generate and persist a new key.
    ///
    /// An existing key is only replaced when `force` is set.
    pub fn init_wallet(&self, force: bool) -> Result<InitReport, WalletError> {
        if self.store.contains(PRIVATE_KEY_RECORD)? {
            if !force {
                return Err(WalletError::AlreadyInitialized(self.store.location()));
            }
            warn!(location = %self.store.location(), "overwriting existing wallet key");
        }

        let network = self.config.network;
        let key = KeyStore::generate(network);
        let wif = KeyStore::encode(&key);
        self.store.put(PRIVATE_KEY_RECORD, &wif)?;

        let address = KeyStore::address_of(&key);
        info!(%address, %network, "wallet initialized");
        Ok(InitReport {
            wif,
            address,
            network,
        })
    }

    /// Load and decode the stored key.
    pub fn load_key(&self) -> Result<PrivateKey, WalletError> {
        let text = Zeroizing::new(self.store.get(PRIVATE_KEY_RECORD)?);
        KeyStore::decode(&text, self.config.network)
    }

    /// The wallet's own address.
    pub fn address(&self) -> Result<Address, WalletError> {
        Ok(KeyStore::address_of(&self.load_key()?))
    }

    /// The wallet address with its explorer summary.
    pub async fn info(&self) -> Result<WalletInfo, WalletError> {
        let address = self.address()?;
        let explorer = self.explorer.address_info(&address).await?;
        Ok(WalletInfo {
            address,
            network: self.config.network,
            explorer,
        })
    }

    pub async fn address_info(&self, address: &str) -> Result<Value, WalletError> {
        let address = parse_recipient(address, self.config.network)?;
        self.explorer.address_info(&address).await
    }

    pub async fn transaction(&self, txid: &str) -> Result<Value, WalletError> {
        let txid = Hash256::from_hex(txid.trim())?;
        self.explorer.transaction(&txid).await
    }

    pub async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, WalletError> {
        let address = parse_recipient(address, self.config.network)?;
        self.explorer.utxos(&address).await
    }

    /// Pay `amount` to `to`, embedding the configured data payload if any.
    pub async fn send_payment(&self, to: &str, amount: u64) -> Result<SendReceipt, WalletError> {
        let data = self.config.data.clone();
        self.send_payment_with_data(to, amount, data.as_deref()).await
    }

    /// Pay `amount` to `to` with an explicit data payload.
    ///
    /// Only the broadcast is retried; selection and signing run once.
    pub async fn send_payment_with_data(
        &self,
        to: &str,
        amount: u64,
        data: Option<&[u8]>,
    ) -> Result<SendReceipt, WalletError> {
        let key = self.load_key()?;
        let recipient = parse_recipient(to, self.config.network)?;
        if amount == 0 {
            return Err(WalletError::InvalidAmount("amount must be non-zero".into()));
        }

        let from = key.address();
        let utxos = self.explorer.utxos(&from).await?;
        debug!(%from, count = utxos.len(), "fetched utxos");

        let signed = self.prepare_payment(&key, &utxos, &recipient, amount, data)?;
        let accepted = self.broadcast(&signed).await?;

        let txid = signed.txid().to_string();
        if accepted.txid != txid {
            warn!(ours = %txid, reported = %accepted.txid, "explorer reported a different txid");
        }

        Ok(SendReceipt {
            txid,
            amount: signed.amount(),
            fee: signed.fee(),
            change: signed.change(),
            inputs: signed.inputs().len(),
            size: signed.size(),
        })
    }

    /// Select, build and sign a payment without any I/O.
    pub fn prepare_payment(
        &self,
        key: &PrivateKey,
        utxos: &[Utxo],
        recipient: &Address,
        amount: u64,
        data: Option<&[u8]>,
    ) -> Result<SignedTransaction, WalletError> {
        let mut builder = TransactionBuilder::new();
        builder.set_fee_policy(self.config.fee_policy);
        let unsigned = builder.build_payment(utxos, recipient, amount, &key.address(), data)?;
        Signer::sign(unsigned, key)
    }

    /// Submit `signed`, retrying the same bytes on network failure.
    pub async fn broadcast(&self, signed: &SignedTransaction) -> Result<BroadcastResult, WalletError> {
        let raw = signed.to_hex();
        let raw = raw.as_str();
        let explorer = &self.explorer;
        let result = retry_transient(&self.config.retry_policy(), "broadcast", move || {
            explorer.broadcast(raw)
        })
        .await;
        let result = match result {
            Ok(result) => result,
            // A retry after a lost response finds our own bytes already relayed.
            Err(WalletError::Rejected(reason)) if is_already_known(&reason) => {
                warn!(txid = %signed.txid(), %reason, "explorer already has transaction");
                BroadcastResult {
                    txid: signed.txid().to_string(),
                }
            }
            Err(e) => return Err(e),
        };
        info!(txid = %signed.txid(), size = signed.size(), "transaction broadcast");
        Ok(result)
    }
}

/// Whether an explorer rejection means the node already holds the transaction.
fn is_already_known(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    reason.contains("already known")
        || reason.contains("already-known")
        || reason.contains("already in block chain")
        || reason.contains("already-in-mempool")
}
