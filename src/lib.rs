#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod client;
pub mod config;
pub mod error;
pub mod records;
pub mod repo;
pub mod session;
pub mod signing;

pub use client::{PdsClient, RepoWriter, WriteResult};
pub use config::Config;
pub use error::{
    AgoraError, AuthError, ConfigError, ConsistencyError, EncodingError, TransportError,
    ValidationError,
};
pub use records::{Record, TidGenerator};
pub use repo::{SignedCommit, UnsignedCommit, WriteKind};
pub use session::Session;
pub use signing::{FileKeyStore, KeyStore, MemoryKeyStore};
