//! Ed25519 keys, signing hashes and per-input signatures.
//!
//! Uses ed25519-dalek for the signature scheme and BLAKE3 for pubkey hashes
//! and signing hashes. Ed25519 signing is deterministic (RFC 8032): the same
//! key and message always produce the same signature.
//!
//! # Signing scheme
//!
//! Each input is signed over a **sighash** that commits to:
//! - Transaction version and lock_time
//! - All input outpoints (txid + index)
//! - All outputs (value + tagged script)
//! - The index of the input being signed
//!
//! Signatures and public keys are excluded, so inputs can be signed in any
//! order without invalidating each other.

use ed25519_dalek::{Signer, Verifier};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::types::{Hash256, OutputScript, Transaction};

/// Ed25519 signing key.
///
/// Deliberately not `Clone`. The wrapped [`ed25519_dalek::SigningKey`]
/// zeroizes its secret on drop.
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a random keypair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Rebuild a keypair from its 32-byte secret.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(bytes),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Copy of the secret bytes, wiped when the returned guard drops.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// Sign a message, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key.
#[derive(Clone)]
pub struct PublicKey {
    verifying_key: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { verifying_key: vk })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// BLAKE3 hash of the raw key, as locked to by outputs and addresses.
    pub fn pubkey_hash(&self) -> Hash256 {
        pubkey_hash(&self.to_bytes())
    }

    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<(), CryptoError> {
        let sig = ed25519_dalek::Signature::from_bytes(signature);
        self.verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

/// BLAKE3 hash of raw public key bytes.
pub fn pubkey_hash(pubkey_bytes: &[u8; 32]) -> Hash256 {
    Hash256(blake3::hash(pubkey_bytes).into())
}

/// Compute the signing hash for one input of `tx`.
pub fn signing_hash(tx: &Transaction, input_index: usize) -> Result<Hash256, CryptoError> {
    if input_index >= tx.inputs.len() {
        return Err(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        });
    }

    let mut hasher = blake3::Hasher::new();
    hasher.update(&tx.version.to_le_bytes());

    hasher.update(&(tx.inputs.len() as u64).to_le_bytes());
    for input in &tx.inputs {
        hasher.update(input.previous_output.txid.as_bytes());
        hasher.update(&input.previous_output.index.to_le_bytes());
    }

    hasher.update(&(tx.outputs.len() as u64).to_le_bytes());
    for output in &tx.outputs {
        hasher.update(&output.value.to_le_bytes());
        hasher.update(&[output.script.tag()]);
        match &output.script {
            OutputScript::PayToPubkeyHash(pkh) => {
                hasher.update(pkh.as_bytes());
            }
            OutputScript::Data(payload) => {
                hasher.update(&(payload.len() as u64).to_le_bytes());
                hasher.update(payload);
            }
        }
    }

    hasher.update(&tx.lock_time.to_le_bytes());
    hasher.update(&(input_index as u64).to_le_bytes());

    Ok(Hash256(hasher.finalize().into()))
}

/// Sign one input in place, writing its signature and public key.
pub fn sign_transaction_input(
    tx: &mut Transaction,
    input_index: usize,
    keypair: &KeyPair,
) -> Result<(), CryptoError> {
    let sighash = signing_hash(tx, input_index)?;
    let signature = keypair.sign(sighash.as_bytes());

    let input = &mut tx.inputs[input_index];
    input.signature = signature.to_vec();
    input.public_key = keypair.public_key().to_bytes().to_vec();
    Ok(())
}

/// Verify one input's signature against the pubkey hash it spends from.
pub fn verify_transaction_input(
    tx: &Transaction,
    input_index: usize,
    expected_pubkey_hash: &Hash256,
) -> Result<(), CryptoError> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        })?;

    let pk_bytes: [u8; 32] = input
        .public_key
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidPublicKey)?;
    let pk = PublicKey::from_bytes(&pk_bytes)?;

    if pk.pubkey_hash() != *expected_pubkey_hash {
        return Err(CryptoError::PubkeyHashMismatch);
    }

    let sig_bytes: [u8; 64] = input
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;

    let sighash = signing_hash(tx, input_index)?;
    pk.verify(sighash.as_bytes(), &sig_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutPoint, TxInput, TxOutput};

    fn two_input_tx(owner: &Hash256) -> Transaction {
        Transaction {
            version: 1,
            inputs: (0..2)
                .map(|i| {
                    TxInput::unsigned(OutPoint {
                        txid: Hash256([i + 1; 32]),
                        index: u64::from(i),
                    })
                })
                .collect(),
            outputs: vec![
                TxOutput {
                    value: 4000,
                    script: OutputScript::PayToPubkeyHash(Hash256([0xAA; 32])),
                },
                TxOutput::data(b"memo".to_vec()),
                TxOutput {
                    value: 500,
                    script: OutputScript::PayToPubkeyHash(*owner),
                },
            ],
            lock_time: 0,
        }
    }

    #[test]
    fn keypair_from_secret_deterministic() {
        let kp1 = KeyPair::from_secret_bytes(&[42u8; 32]);
        let kp2 = KeyPair::from_secret_bytes(&[42u8; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(*kp1.secret_bytes(), *kp2.secret_bytes());
    }

    #[test]
    fn keypair_generate_unique() {
        assert_ne!(KeyPair::generate().public_key(), KeyPair::generate().public_key());
    }

    #[test]
    fn keypair_debug_hides_secret() {
        let kp = KeyPair::generate();
        let debug = format!("{kp:?}");
        assert!(debug.contains("public_key"));
        assert!(!debug.contains(&hex::encode(*kp.secret_bytes())));
    }

    #[test]
    fn pubkey_roundtrip_and_hash() {
        let pk = KeyPair::from_secret_bytes(&[7u8; 32]).public_key();
        let back = PublicKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(pk, back);
        assert_eq!(pk.pubkey_hash(), pubkey_hash(&pk.to_bytes()));
    }

    #[test]
    fn signature_is_deterministic() {
        let kp = KeyPair::from_secret_bytes(&[9u8; 32]);
        assert_eq!(kp.sign(b"msg"), kp.sign(b"msg"));
    }

    #[test]
    fn sighash_differs_per_input_and_output() {
        let owner = Hash256([0x11; 32]);
        let tx = two_input_tx(&owner);
        assert_ne!(signing_hash(&tx, 0).unwrap(), signing_hash(&tx, 1).unwrap());

        let mut altered = tx.clone();
        altered.outputs[1] = TxOutput::data(b"other".to_vec());
        assert_ne!(signing_hash(&tx, 0).unwrap(), signing_hash(&altered, 0).unwrap());
    }

    #[test]
    fn sighash_ignores_unlocking_data() {
        let owner = Hash256([0x11; 32]);
        let tx = two_input_tx(&owner);
        let mut filled = tx.clone();
        filled.inputs[0].signature = vec![1; 64];
        filled.inputs[0].public_key = vec![2; 32];
        assert_eq!(signing_hash(&tx, 1).unwrap(), signing_hash(&filled, 1).unwrap());
    }

    #[test]
    fn sighash_out_of_bounds() {
        let tx = two_input_tx(&Hash256::ZERO);
        assert_eq!(
            signing_hash(&tx, 2).unwrap_err(),
            CryptoError::InputIndexOutOfBounds { index: 2, len: 2 }
        );
    }

    #[test]
    fn sign_and_verify_every_input() {
        let kp = KeyPair::from_secret_bytes(&[3u8; 32]);
        let owner = kp.public_key().pubkey_hash();
        let mut tx = two_input_tx(&owner);
        for i in 0..tx.inputs.len() {
            sign_transaction_input(&mut tx, i, &kp).unwrap();
        }
        for i in 0..tx.inputs.len() {
            assert_eq!(tx.inputs[i].signature.len(), 64);
            assert_eq!(tx.inputs[i].public_key.len(), 32);
            verify_transaction_input(&tx, i, &owner).unwrap();
        }
    }

    #[test]
    fn verify_rejects_wrong_owner() {
        let kp = KeyPair::from_secret_bytes(&[3u8; 32]);
        let mut tx = two_input_tx(&Hash256::ZERO);
        sign_transaction_input(&mut tx, 0, &kp).unwrap();
        assert_eq!(
            verify_transaction_input(&tx, 0, &Hash256([0xEE; 32])).unwrap_err(),
            CryptoError::PubkeyHashMismatch
        );
    }

    #[test]
    fn verify_rejects_tampered_output() {
        let kp = KeyPair::from_secret_bytes(&[4u8; 32]);
        let owner = kp.public_key().pubkey_hash();
        let mut tx = two_input_tx(&owner);
        sign_transaction_input(&mut tx, 0, &kp).unwrap();
        tx.outputs[0].value += 1;
        assert_eq!(
            verify_transaction_input(&tx, 0, &owner).unwrap_err(),
            CryptoError::VerificationFailed
        );
    }

    #[test]
    fn verify_rejects_unsigned_input() {
        let tx = two_input_tx(&Hash256::ZERO);
        assert_eq!(
            verify_transaction_input(&tx, 0, &Hash256::ZERO).unwrap_err(),
            CryptoError::InvalidPublicKey
        );
    }
}
