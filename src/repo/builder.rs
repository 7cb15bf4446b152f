//! Commit Builder: asks the service to stage a single-record mutation and
//! assembles the client's own view of the resulting unsigned commit.
//!
//! The server's answer is provisional. Nothing is persisted until a matching
//! finalize request is submitted, and every field we sign is re-derived and
//! checked locally before signing (see [`crate::repo::verify`]).

use crate::client::PdsClient;
use crate::error::{AgoraError, ValidationError};
use crate::records::Record;
use crate::repo::commit::{UnsignedCommit, parse_server_ref};
use serde::{Deserialize, Serialize};

pub const PREPARE_PATH: &str = "/record/prepare";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

impl WriteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteKind::Create => "create",
            WriteKind::Update => "update",
        }
    }
}

#[derive(Debug, Serialize)]
struct PrepareRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    rkey: &'a str,
    write: &'static str,
    value: &'a Record,
    validate: bool,
}

/// Provisional commit state reported by the preparation endpoint.
#[derive(Debug, Deserialize)]
struct PrepareResponse {
    did: String,
    rev: String,
    #[serde(default)]
    prev: Option<String>,
    data: String,
    #[serde(rename = "unSignBytes")]
    un_sign_bytes: String,
}

/// An unsigned commit paired with the server's own canonical encoding of it.
#[derive(Debug)]
pub struct PreparedWrite {
    pub commit: UnsignedCommit,
    pub server_bytes: Vec<u8>,
}

/// Stage a create/update of exactly one record and build the unsigned commit
/// from the server's reported state. One network round trip, no retries.
///
/// Schema validation is deliberately deferred to the finalize step, hence
/// `validate: false` on the wire.
pub async fn prepare_write(
    client: &PdsClient,
    repo: &str,
    collection: &str,
    rkey: &str,
    record: &Record,
    kind: WriteKind,
) -> Result<PreparedWrite, AgoraError> {
    let request = PrepareRequest {
        repo,
        collection,
        rkey,
        write: kind.as_str(),
        value: record,
        validate: false,
    };
    let response: PrepareResponse = client.post_json(PREPARE_PATH, &request).await?;

    let prev = match &response.prev {
        Some(value) => Some(parse_server_ref("prev", value)?),
        None => None,
    };
    let data = parse_server_ref("data", &response.data)?;
    let server_bytes =
        hex::decode(&response.un_sign_bytes).map_err(|e| ValidationError::Hex {
            field: "unSignBytes",
            message: e.to_string(),
        })?;

    Ok(PreparedWrite {
        commit: UnsignedCommit::new(response.did, response.rev, prev, data),
        server_bytes,
    })
}
