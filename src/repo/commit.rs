//! Unsigned and signed commit structures.
//!
//! A commit is the repository's statement of its new state: the owning
//! identity, a strictly increasing revision, the data root after this write,
//! and a link to the previous accepted commit (absent only for the very
//! first commit of a repository).

use crate::error::{EncodingError, ValidationError};
use crate::repo::cbor::{self, Value};
use cid::Cid;

/// Commit structure version carried on the wire.
pub const COMMIT_VERSION: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedCommit {
    pub did: String,
    pub rev: String,
    pub prev: Option<Cid>,
    pub data: Cid,
}

impl UnsignedCommit {
    pub fn new(did: String, rev: String, prev: Option<Cid>, data: Cid) -> Self {
        Self {
            did,
            rev,
            prev,
            data,
        }
    }

    /// The commit as a canonical CBOR value.
    pub fn to_value(&self) -> Value {
        Value::map([
            ("did".to_string(), Value::Text(self.did.clone())),
            ("rev".to_string(), Value::Text(self.rev.clone())),
            ("data".to_string(), Value::Ref(self.data)),
            (
                "prev".to_string(),
                self.prev.map_or(Value::Null, Value::Ref),
            ),
            ("version".to_string(), Value::Int(COMMIT_VERSION)),
        ])
    }

    /// The canonical byte encoding this client will sign.
    pub fn encoded(&self) -> Vec<u8> {
        cbor::encode(&self.to_value())
    }

    pub fn from_value(value: &Value) -> Result<Self, EncodingError> {
        let Value::Map(entries) = value else {
            return Err(EncodingError::CommitShape("commit"));
        };
        let text = |field: &'static str| match entries.get(field) {
            Some(Value::Text(s)) => Ok(s.clone()),
            _ => Err(EncodingError::CommitShape(field)),
        };
        let did = text("did")?;
        let rev = text("rev")?;
        let data = match entries.get("data") {
            Some(Value::Ref(cid)) => *cid,
            _ => return Err(EncodingError::CommitShape("data")),
        };
        let prev = match entries.get("prev") {
            Some(Value::Ref(cid)) => Some(*cid),
            Some(Value::Null) => None,
            _ => return Err(EncodingError::CommitShape("prev")),
        };
        match entries.get("version") {
            Some(Value::Int(COMMIT_VERSION)) => {}
            _ => return Err(EncodingError::CommitShape("version")),
        }
        Ok(Self {
            did,
            rev,
            prev,
            data,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        Self::from_value(&cbor::decode(bytes)?)
    }
}

/// A commit plus the signature over its canonical encoding. Exists only for
/// the duration of one write.
#[derive(Debug, Clone)]
pub struct SignedCommit {
    pub commit: UnsignedCommit,
    pub sig: Vec<u8>,
}

/// Parse a content reference reported by the server, mapping failures to the
/// contract-violation error the caller surfaces.
pub fn parse_server_ref(field: &'static str, value: &str) -> Result<Cid, ValidationError> {
    cbor::parse_ref(value).map_err(|e| ValidationError::ContentRef {
        value: format!("{field}={value}"),
        message: e.to_string(),
    })
}
