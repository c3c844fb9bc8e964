//! The wallet's single private key: generation, WIF encoding, decoding.
//!
//! Keys are persisted as a base58 string in the Wallet Import Format layout:
//!
//! ```text
//! base58( version || secret[32] || 0x01 || checksum[4] )
//! ```
//!
//! where `version` is the network's [`wif_prefix`](Network::wif_prefix) and
//! `checksum` is the first four bytes of a double SHA-256 over everything
//! before it. The legacy form without the `0x01` flag is accepted on decode.

use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use satchel_core::address::{Address, Network};
use satchel_core::constants::SECRET_KEY_LEN;
use satchel_core::crypto::{KeyPair, PublicKey};

use crate::error::WalletError;

/// Trailing flag byte of the current encoding.
const COMPRESSED_FLAG: u8 = 0x01;

const CHECKSUM_LEN: usize = 4;

/// Decoded length with the flag byte.
const ENCODED_LEN: usize = 1 + SECRET_KEY_LEN + 1 + CHECKSUM_LEN;

/// Decoded length of the legacy form.
const LEGACY_ENCODED_LEN: usize = 1 + SECRET_KEY_LEN + CHECKSUM_LEN;

/// The wallet's private key, scoped to one network.
///
/// Not `Clone`: exactly one instance exists per loaded wallet. The secret is
/// zeroized when the key is dropped.
pub struct PrivateKey {
    keypair: KeyPair,
    network: Network,
}

impl PrivateKey {
    /// Reconstruct a key from its raw 32-byte secret.
    pub fn from_secret_bytes(secret: &[u8; SECRET_KEY_LEN], network: Network) -> Self {
        Self {
            keypair: KeyPair::from_secret_bytes(secret),
            network,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// The pay-to-pubkey-hash address controlled by this key.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.keypair.public_key(), self.network)
    }

    pub(crate) fn keypair(&self) -> &KeyPair {
        &self.keypair
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("network", &self.network)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Lifecycle operations for the wallet key.
pub struct KeyStore;

impl KeyStore {
    /// Generate a fresh key from the OS cryptographic RNG.
    pub fn generate(network: Network) -> PrivateKey {
        PrivateKey {
            keypair: KeyPair::generate(),
            network,
        }
    }

    /// Encode a key for storage. The returned string is wiped on drop.
    pub fn encode(key: &PrivateKey) -> Zeroizing<String> {
        let mut payload = Zeroizing::new(Vec::with_capacity(ENCODED_LEN));
        payload.push(key.network.wif_prefix());
        payload.extend_from_slice(key.keypair.secret_bytes().as_ref());
        payload.push(COMPRESSED_FLAG);
        let checksum = checksum(&payload);
        payload.extend_from_slice(&checksum);
        Zeroizing::new(bs58::encode(payload.as_slice()).into_string())
    }

    /// Decode a stored key, requiring it to belong to `network`.
    pub fn decode(text: &str, network: Network) -> Result<PrivateKey, WalletError> {
        let raw = Zeroizing::new(
            bs58::decode(text.trim())
                .into_vec()
                .map_err(|e| WalletError::InvalidKeyEncoding(format!("base58: {e}")))?,
        );

        if raw.len() != ENCODED_LEN && raw.len() != LEGACY_ENCODED_LEN {
            return Err(WalletError::InvalidKeyEncoding(format!(
                "unexpected length {}",
                raw.len()
            )));
        }

        let (body, check) = raw.split_at(raw.len() - CHECKSUM_LEN);
        if checksum(body) != check {
            return Err(WalletError::InvalidKeyEncoding("checksum mismatch".into()));
        }

        let encoded_network = Network::from_wif_prefix(body[0]).ok_or_else(|| {
            WalletError::InvalidKeyEncoding(format!("unknown version byte 0x{:02x}", body[0]))
        })?;
        if encoded_network != network {
            return Err(WalletError::InvalidKeyEncoding(format!(
                "key is for {encoded_network}, expected {network}"
            )));
        }

        if raw.len() == ENCODED_LEN && body[1 + SECRET_KEY_LEN] != COMPRESSED_FLAG {
            return Err(WalletError::InvalidKeyEncoding("invalid flag byte".into()));
        }

        let mut secret = Zeroizing::new([0u8; SECRET_KEY_LEN]);
        secret.copy_from_slice(&body[1..1 + SECRET_KEY_LEN]);

        Ok(PrivateKey::from_secret_bytes(&secret, network))
    }

    /// Derive the key's address.
    pub fn address_of(key: &PrivateKey) -> Address {
        key.address()
    }
}

/// First four bytes of SHA-256(SHA-256(data)).
fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}
