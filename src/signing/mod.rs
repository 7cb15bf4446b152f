//! Key material handling and commit signing.

pub mod keystore;
pub mod signer;

pub use keystore::{FileKeyStore, KEY_HEX_PREFIX, KeyStore, MemoryKeyStore};
pub use signer::{CommitSignature, require_key, sign_commit};
