//! Protocol constants. Monetary values are in the smallest currency unit.

/// Version stamped on every transaction the wallet builds.
pub const TX_VERSION: u64 = 1;

/// Largest payload a data-carrying output may hold, in bytes.
pub const MAX_DATA_PAYLOAD: usize = 80;

/// Secret key length in bytes.
pub const SECRET_KEY_LEN: usize = 32;
