//! # satchel-core
//! Primitive types shared by the wallet: addresses, keys, transactions.

pub mod address;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod types;
