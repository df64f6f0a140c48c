//! Transaction verification core for Bitcoin
//!
//! secp256k1 arithmetic, ECDSA with DER signatures, a Bitcoin Script
//! interpreter and legacy transaction parsing, signature hashing and
//! verification.

pub mod curves;
pub mod ecdsa;
pub mod encoding;
pub mod error;
pub mod fetcher;
pub mod field;
pub mod hash;
pub mod keys;
pub mod op;
pub mod script;
pub mod secp256k1;
pub mod transaction;

pub use error::{BitcoinError, Result};

pub use curves::Point;
pub use ecdsa::{Signature, hash_message, sign, verify};
pub use fetcher::{CachingFetcher, HttpFetcher, TxCache, TxFetcher};
pub use field::FieldElement;
pub use keys::{Network, PrivateKey, address_to_hash160, gen_secret_key};
pub use script::{Command, Script, p2pkh_script};
pub use secp256k1::{S256Point, SECP256K1};
pub use transaction::{Tx, TxIn, TxOut};
