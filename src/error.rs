use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `agora-pds`.
///
/// Each failure class of the write pipeline gets its own variant. Library
/// callers can match on these to decide recovery strategy; the binary edge
/// continues to use `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum AgoraError {
    // ── Signing key / authentication ─────────────────────────────────────
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    // ── Local/server encoding agreement ──────────────────────────────────
    #[error("consistency: {0}")]
    Consistency(#[from] ConsistencyError),

    // ── Network / HTTP ───────────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Server contract / preconditions ──────────────────────────────────
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    // ── Canonical encoder ────────────────────────────────────────────────
    #[error("encoding: {0}")]
    Encoding(#[from] EncodingError),

    // ── Config / session files ───────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generic fallthrough (wraps anyhow for interop) ───────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Signing key errors ──────────────────────────────────────────────────────

/// Recoverable: the caller is not logged in or the cached key is unusable.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no cached signing key; please log in")]
    MissingKey,

    #[error("signing key import failed: {0}")]
    KeyImport(String),

    #[error("keystore: {0}")]
    Store(String),
}

// ─── Consistency errors ──────────────────────────────────────────────────────

/// Fatal for the attempt: the locally derived commit encoding disagrees with
/// the server's. Must never be retried with the same inputs.
#[derive(Debug, Error)]
pub enum ConsistencyError {
    #[error("local commit encoding does not match server bytes ({local} local vs {server} server)")]
    Mismatch { local: usize, server: usize },
}

// ─── Transport errors ────────────────────────────────────────────────────────

/// Recoverable: the caller may retry the whole write from the build stage.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{endpoint} request failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("{endpoint} response could not be decoded: {message}")]
    Decode { endpoint: String, message: String },
}

// ─── Validation errors ───────────────────────────────────────────────────────

/// Fatal: a precondition was violated or the server broke its contract.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed content reference {value:?}: {message}")]
    ContentRef { value: String, message: String },

    #[error("malformed hex in {field}: {message}")]
    Hex { field: &'static str, message: String },

    #[error("update requires the record's original key")]
    MissingRecordKey,

    #[error("finalize response contained no results")]
    EmptyResults,
}

// ─── Canonical encoder errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("canonical decode failed at byte {offset}: {message}")]
    Decode { offset: usize, message: String },

    #[error("non-canonical encoding: {0}")]
    NonCanonical(String),

    #[error("trailing bytes after value")]
    Trailing,

    #[error("content reference cannot round-trip: {0}")]
    BadRef(String),

    #[error("commit field {0} missing or of wrong type")]
    CommitShape(&'static str),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("failed to save config: {0}")]
    Save(String),

    #[error("invalid service url: {0}")]
    ServiceUrl(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ──────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, AgoraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_missing_key_displays_login_hint() {
        let err = AgoraError::Auth(AuthError::MissingKey);
        assert!(err.to_string().contains("please log in"));
    }

    #[test]
    fn consistency_mismatch_displays_lengths() {
        let err = AgoraError::Consistency(ConsistencyError::Mismatch {
            local: 71,
            server: 70,
        });
        assert!(err.to_string().contains("71"));
        assert!(err.to_string().contains("70"));
    }

    #[test]
    fn transport_status_displays_endpoint() {
        let err = AgoraError::Transport(TransportError::Status {
            endpoint: "/record/create".into(),
            status: 502,
            message: "bad gateway".into(),
        });
        assert!(err.to_string().contains("/record/create"));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn validation_missing_rkey_is_a_precondition_message() {
        let err = AgoraError::Validation(ValidationError::MissingRecordKey);
        assert!(err.to_string().contains("original key"));
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let err: AgoraError = anyhow_err.into();
        assert!(err.to_string().contains("something went wrong"));
    }
}
