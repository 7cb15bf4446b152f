//! Repository commit pipeline: canonical encoding, commit construction,
//! and local/server consistency verification.

pub mod builder;
pub mod cbor;
pub mod commit;
pub mod verify;

pub use builder::{PreparedWrite, WriteKind, prepare_write};
pub use commit::{COMMIT_VERSION, SignedCommit, UnsignedCommit};
pub use verify::verify;
