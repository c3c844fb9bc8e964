//! Transaction and UTXO types.
//!
//! All monetary values are integers in the smallest currency unit.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::error::TransactionError;

/// A 32-byte hash value (transaction ids, pubkey hashes, signing hashes).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s).map_err(|e| TransactionError::InvalidHash(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| TransactionError::InvalidHash(format!("{} bytes", v.len())))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u64,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// A transaction input spending a previous output.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxInput {
    pub previous_output: OutPoint,
    /// Ed25519 signature (64 bytes). Empty until signed.
    pub signature: Vec<u8>,
    /// Ed25519 public key (32 bytes). Empty until signed.
    pub public_key: Vec<u8>,
}

impl TxInput {
    /// An input with empty unlocking data.
    pub fn unsigned(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            signature: Vec::new(),
            public_key: Vec::new(),
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Locking condition of an output.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum OutputScript {
    /// Spendable by the key whose BLAKE3 pubkey hash matches.
    PayToPubkeyHash(Hash256),
    /// Provably unspendable output carrying opaque application data.
    Data(Vec<u8>),
}

impl OutputScript {
    /// Tag byte committed to by the signing hash.
    pub fn tag(&self) -> u8 {
        match self {
            OutputScript::PayToPubkeyHash(_) => 0,
            OutputScript::Data(_) => 1,
        }
    }
}

/// A transaction output.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxOutput {
    pub value: u64,
    pub script: OutputScript,
}

impl TxOutput {
    /// Pay `value` to `address`.
    pub fn to_address(address: &Address, value: u64) -> Self {
        Self {
            value,
            script: OutputScript::PayToPubkeyHash(address.pubkey_hash()),
        }
    }

    /// Zero-value output embedding `payload`.
    pub fn data(payload: Vec<u8>) -> Self {
        Self {
            value: 0,
            script: OutputScript::Data(payload),
        }
    }

    /// The pubkey hash this output pays, if it is spendable.
    pub fn pubkey_hash(&self) -> Option<Hash256> {
        match &self.script {
            OutputScript::PayToPubkeyHash(h) => Some(*h),
            OutputScript::Data(_) => None,
        }
    }
}

/// A transaction transferring value between addresses.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    pub version: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u64,
}

impl Transaction {
    /// Canonical wire encoding (bincode, standard config).
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TransactionError::Serialization(e.to_string()))
    }

    /// Decode a transaction from its canonical encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (tx, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        if read != bytes.len() {
            return Err(TransactionError::Serialization(format!(
                "{} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(tx)
    }

    /// Transaction id: BLAKE3 of the canonical encoding.
    pub fn txid(&self) -> Result<Hash256, TransactionError> {
        Ok(Hash256(blake3::hash(&self.encode()?).into()))
    }

    /// Sum of all output values. `None` on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }
}

/// An unspent output as listed by the block explorer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    /// Value in the smallest currency unit.
    pub value: u64,
    /// Address the output is locked to.
    pub address: Address,
}

/// Sum of UTXO values. `None` on overflow.
pub fn total_value(utxos: &[Utxo]) -> Option<u64> {
    utxos
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.value))
}
