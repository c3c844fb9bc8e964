//! Network modes and address encoding.
//!
//! An address is the Bech32m ([BIP-350]) encoding of a version byte and the
//! 32-byte BLAKE3 hash of an Ed25519 public key. The human-readable prefix
//! pins the address to one network:
//! - Mainnet: `sch1...`
//! - Testnet: `tsch1...`
//!
//! [BIP-350]: https://github.com/bitcoin/bips/blob/master/bip-0350.mediawiki

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::PublicKey;
use crate::error::AddressError;
use crate::types::Hash256;

/// Bech32m checksum constant (BIP-350).
const BECH32M_CONST: u32 = 0x2bc830a3;

/// Bech32 character set for 5-bit values.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Number of checksum characters at the end of every address.
const CHECKSUM_LEN: usize = 6;

/// Current address version.
pub const ADDRESS_VERSION: u8 = 0;

/// Network mode a key and its addresses belong to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network (HRP `sch`).
    Mainnet,
    /// Test network (HRP `tsch`). The wallet's default.
    #[default]
    Testnet,
}

impl Network {
    /// Human-readable address prefix for this network.
    pub fn hrp(&self) -> &'static str {
        match self {
            Network::Mainnet => "sch",
            Network::Testnet => "tsch",
        }
    }

    /// Look up a network from an address prefix.
    pub fn from_hrp(hrp: &str) -> Result<Self, AddressError> {
        match hrp {
            "sch" => Ok(Network::Mainnet),
            "tsch" => Ok(Network::Testnet),
            _ => Err(AddressError::UnknownNetwork(hrp.to_string())),
        }
    }

    /// Version byte that prefixes an encoded private key (WIF convention).
    pub fn wif_prefix(&self) -> u8 {
        match self {
            Network::Mainnet => 0x80,
            Network::Testnet => 0xef,
        }
    }

    /// Look up a network from a private key version byte.
    pub fn from_wif_prefix(prefix: u8) -> Option<Self> {
        match prefix {
            0x80 => Some(Network::Mainnet),
            0xef => Some(Network::Testnet),
            _ => None,
        }
    }

    /// Lowercase name used on the command line and in JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = AddressError;

    /// Accepts `mainnet`, `livenet` and `testnet` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "livenet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(AddressError::UnknownNetwork(other.to_string())),
        }
    }
}

/// A pay-to-pubkey-hash address on a specific network.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    version: u8,
    pubkey_hash: Hash256,
}

impl Address {
    /// Create an address from a pubkey hash and network.
    pub fn from_pubkey_hash(pubkey_hash: Hash256, network: Network) -> Self {
        Self {
            network,
            version: ADDRESS_VERSION,
            pubkey_hash,
        }
    }

    /// Derive the address of a public key on the given network.
    pub fn from_public_key(public_key: &PublicKey, network: Network) -> Self {
        Self::from_pubkey_hash(public_key.pubkey_hash(), network)
    }

    /// The BLAKE3 pubkey hash this address locks to.
    pub fn pubkey_hash(&self) -> Hash256 {
        self.pubkey_hash
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Encode as a lowercase Bech32m string.
    pub fn encode(&self) -> String {
        let hrp = self.network.hrp();

        let mut payload = Vec::with_capacity(53);
        payload.push(self.version);
        payload.extend(bytes_to_five_bit(self.pubkey_hash.as_bytes()));

        let checksum = bech32m_create_checksum(hrp, &payload);

        let mut out = String::with_capacity(hrp.len() + 1 + payload.len() + CHECKSUM_LEN);
        out.push_str(hrp);
        out.push('1');
        out.extend(
            payload
                .iter()
                .chain(checksum.iter())
                .map(|&d| CHARSET[d as usize] as char),
        );
        out
    }

    /// Decode and validate a Bech32m address string.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(AddressError::MixedCase);
        }
        let lower = s.to_ascii_lowercase();

        let sep = lower.rfind('1').ok_or(AddressError::MissingSeparator)?;
        if sep == 0 {
            return Err(AddressError::InvalidHrp);
        }
        // version char + checksum must follow the separator
        if sep + 1 + 1 + CHECKSUM_LEN > lower.len() {
            return Err(AddressError::InvalidLength);
        }

        let hrp = &lower[..sep];
        let data = lower[sep + 1..]
            .chars()
            .map(|c| {
                CHARSET
                    .iter()
                    .position(|&ch| ch as char == c)
                    .map(|p| p as u8)
                    .ok_or(AddressError::InvalidCharacter(c))
            })
            .collect::<Result<Vec<u8>, _>>()?;

        if !bech32m_verify_checksum(hrp, &data) {
            return Err(AddressError::InvalidChecksum);
        }

        let payload = &data[..data.len() - CHECKSUM_LEN];
        let version = payload[0];
        if version != ADDRESS_VERSION {
            return Err(AddressError::InvalidVersion(version));
        }

        let hash_bytes = five_bit_to_bytes(&payload[1..]).ok_or(AddressError::InvalidPadding)?;
        let hash: [u8; 32] = hash_bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength)?;

        let network = Network::from_hrp(hrp)?;

        Ok(Self {
            network,
            version,
            pubkey_hash: Hash256(hash),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

// --- Bech32m internals ---

fn bech32m_polymod(values: &[u8]) -> u32 {
    const GEN: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];
    values.iter().fold(1u32, |chk, &v| {
        let top = chk >> 25;
        let mut next = ((chk & 0x1ffffff) << 5) ^ u32::from(v);
        for (i, g) in GEN.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                next ^= g;
            }
        }
        next
    })
}

fn bech32m_hrp_expand(hrp: &str) -> Vec<u8> {
    let mut ret: Vec<u8> = hrp.bytes().map(|c| c >> 5).collect();
    ret.push(0);
    ret.extend(hrp.bytes().map(|c| c & 31));
    ret
}

fn bech32m_create_checksum(hrp: &str, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = bech32m_hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0; CHECKSUM_LEN]);
    let polymod = bech32m_polymod(&values) ^ BECH32M_CONST;
    let mut out = [0u8; CHECKSUM_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((polymod >> (5 * (5 - i))) & 31) as u8;
    }
    out
}

fn bech32m_verify_checksum(hrp: &str, data: &[u8]) -> bool {
    let mut values = bech32m_hrp_expand(hrp);
    values.extend_from_slice(data);
    bech32m_polymod(&values) == BECH32M_CONST
}

/// Regroup 8-bit bytes into 5-bit groups, zero-padding the tail.
fn bytes_to_five_bit(data: &[u8]) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity((data.len() * 8).div_ceil(5));
    for &b in data {
        acc = (acc << 8) | u32::from(b);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(((acc >> bits) & 31) as u8);
        }
    }
    if bits > 0 {
        out.push(((acc << (5 - bits)) & 31) as u8);
    }
    out
}

/// Regroup 5-bit groups into bytes. Fails on non-zero or oversized padding.
fn five_bit_to_bytes(data: &[u8]) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(data.len() * 5 / 8);
    for &v in data {
        if v >> 5 != 0 {
            return None;
        }
        acc = (acc << 5) | u32::from(v);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xff) as u8);
        }
    }
    if bits >= 5 || ((acc << (8 - bits)) & 0xff) != 0 {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn sample_hash() -> Hash256 {
        Hash256([0xAA; 32])
    }

    #[test]
    fn network_prefixes() {
        assert_eq!(Network::Mainnet.hrp(), "sch");
        assert_eq!(Network::Testnet.hrp(), "tsch");
        assert_eq!(Network::from_hrp("tsch").unwrap(), Network::Testnet);
        assert!(matches!(
            Network::from_hrp("bc").unwrap_err(),
            AddressError::UnknownNetwork(_)
        ));
    }

    #[test]
    fn network_wif_prefix_roundtrip() {
        for net in [Network::Mainnet, Network::Testnet] {
            assert_eq!(Network::from_wif_prefix(net.wif_prefix()), Some(net));
        }
        assert_eq!(Network::from_wif_prefix(0x00), None);
    }

    #[test]
    fn network_from_str_accepts_livenet() {
        assert_eq!("livenet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("MAINNET".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert!("regtest".parse::<Network>().is_err());
    }

    #[test]
    fn network_default_is_testnet() {
        assert_eq!(Network::default(), Network::Testnet);
    }

    #[test]
    fn network_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Network::Mainnet).unwrap(), "\"mainnet\"");
    }

    #[test]
    fn encode_prefix_and_length() {
        let main = Address::from_pubkey_hash(sample_hash(), Network::Mainnet).encode();
        let test = Address::from_pubkey_hash(sample_hash(), Network::Testnet).encode();
        assert!(main.starts_with("sch1"));
        assert!(test.starts_with("tsch1"));
        // hrp + '1' + version + 52 data chars + 6 checksum
        assert_eq!(main.len(), 3 + 1 + 1 + 52 + 6);
        assert_eq!(test.len(), 4 + 1 + 1 + 52 + 6);
    }

    #[test]
    fn decode_roundtrip_both_networks() {
        for net in [Network::Mainnet, Network::Testnet] {
            let addr = Address::from_pubkey_hash(Hash256([0x3C; 32]), net);
            assert_eq!(Address::decode(&addr.encode()).unwrap(), addr);
        }
    }

    #[test]
    fn decode_uppercase_valid() {
        let addr = Address::from_pubkey_hash(sample_hash(), Network::Mainnet);
        let upper = addr.encode().to_ascii_uppercase();
        assert_eq!(Address::decode(&upper).unwrap(), addr);
    }

    #[test]
    fn decode_mixed_case_fails() {
        let encoded = Address::from_pubkey_hash(sample_hash(), Network::Mainnet).encode();
        let mixed = format!("SCH{}", &encoded[3..]);
        assert_eq!(Address::decode(&mixed).unwrap_err(), AddressError::MixedCase);
    }

    #[test]
    fn decode_invalid_checksum() {
        let mut encoded = Address::from_pubkey_hash(sample_hash(), Network::Mainnet).encode();
        let last = encoded.pop().unwrap();
        encoded.push(if last == 'q' { 'p' } else { 'q' });
        assert_eq!(
            Address::decode(&encoded).unwrap_err(),
            AddressError::InvalidChecksum
        );
    }

    #[test]
    fn decode_invalid_character() {
        let encoded = Address::from_pubkey_hash(sample_hash(), Network::Mainnet).encode();
        let bad = format!("{}b{}", &encoded[..5], &encoded[6..]);
        assert_eq!(
            Address::decode(&bad).unwrap_err(),
            AddressError::InvalidCharacter('b')
        );
    }

    #[test]
    fn decode_structural_errors() {
        assert_eq!(
            Address::decode("schnoseparator").unwrap_err(),
            AddressError::MissingSeparator
        );
        assert_eq!(Address::decode("1qqqqqqqqqq").unwrap_err(), AddressError::InvalidHrp);
        assert_eq!(Address::decode("sch1qqqq").unwrap_err(), AddressError::InvalidLength);
    }

    #[test]
    fn from_public_key_matches_hash() {
        let kp = KeyPair::generate();
        let addr = Address::from_public_key(&kp.public_key(), Network::Testnet);
        let decoded: Address = addr.to_string().parse().unwrap();
        assert_eq!(decoded.pubkey_hash(), kp.public_key().pubkey_hash());
        assert_eq!(decoded.network(), Network::Testnet);
        assert_eq!(decoded.version(), ADDRESS_VERSION);
    }

    #[test]
    fn serde_as_string() {
        let addr = Address::from_pubkey_hash(sample_hash(), Network::Testnet);
        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.starts_with("\"tsch1"));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn five_bit_regrouping_roundtrip() {
        let original = [0xDE, 0xAD, 0xBE, 0xEF];
        let five = bytes_to_five_bit(&original);
        assert_eq!(five_bit_to_bytes(&five).unwrap(), original);
        assert_eq!(bytes_to_five_bit(&[0u8; 32]).len(), 52);
    }

    #[test]
    fn checksum_binds_hrp() {
        let data = vec![0u8; 53];
        let mut full = data.clone();
        full.extend_from_slice(&bech32m_create_checksum("sch", &data));
        assert!(bech32m_verify_checksum("sch", &full));
        assert!(!bech32m_verify_checksum("tsch", &full));
    }
}
