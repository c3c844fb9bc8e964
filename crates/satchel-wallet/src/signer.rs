//! Signing and canonical serialization.
//!
//! A transaction moves strictly from [`UnsignedTransaction`] to
//! [`SignedTransaction`] to bytes. The only way to obtain a
//! `SignedTransaction` is [`Signer::sign`], so nothing unsigned can reach
//! broadcast.

use tracing::debug;

use satchel_core::crypto::{sign_transaction_input, verify_transaction_input};
use satchel_core::types::{Hash256, Transaction, Utxo};

use crate::builder::UnsignedTransaction;
use crate::error::WalletError;
use crate::keys::PrivateKey;

/// A fully signed transaction together with its canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: Transaction,
    inputs: Vec<Utxo>,
    txid: Hash256,
    bytes: Vec<u8>,
    amount: u64,
    fee: u64,
    change: u64,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn txid(&self) -> Hash256 {
        self.txid
    }

    /// Canonical wire encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Hex of the canonical encoding, as submitted to the explorer.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn inputs(&self) -> &[Utxo] {
        &self.inputs
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn change(&self) -> u64 {
        self.change
    }

    /// Check every input signature against the address it spends from.
    pub fn verify(&self) -> Result<(), WalletError> {
        for (i, utxo) in self.inputs.iter().enumerate() {
            verify_transaction_input(&self.tx, i, &utxo.address.pubkey_hash())?;
        }
        Ok(())
    }
}

/// Signs unsigned transactions with the wallet key.
pub struct Signer;

impl Signer {
    /// Sign every input of `unsigned` with `key`.
    ///
    /// All inputs are checked against the key's address before any signature
    /// is written; a foreign input fails with [`WalletError::KeyMismatch`] and
    /// the unsigned transaction is consumed without being altered.
    pub fn sign(unsigned: UnsignedTransaction, key: &PrivateKey) -> Result<SignedTransaction, WalletError> {
        let own = key.address();
        if let Some((index, utxo)) = unsigned
            .inputs
            .iter()
            .enumerate()
            .find(|(_, u)| u.address != own)
        {
            return Err(WalletError::KeyMismatch {
                index,
                locked_to: utxo.address.to_string(),
            });
        }

        let UnsignedTransaction {
            mut tx,
            inputs,
            amount,
            fee,
            change,
        } = unsigned;

        for i in 0..tx.inputs.len() {
            sign_transaction_input(&mut tx, i, key.keypair())?;
        }

        let bytes = tx.encode()?;
        let txid = tx.txid()?;
        debug!(%txid, inputs = inputs.len(), size = bytes.len(), "transaction signed");

        Ok(SignedTransaction {
            tx,
            inputs,
            txid,
            bytes,
            amount,
            fee,
            change,
        })
    }

    /// Canonical bytes of a signed transaction.
    pub fn serialize(signed: &SignedTransaction) -> Vec<u8> {
        signed.to_bytes()
    }
}
