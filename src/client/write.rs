//! Write Finalizer: the staged pipeline that turns a record payload into a
//! signed, finalized repository write.
//!
//! Stages run `BUILDING → VERIFYING → SIGNING → SUBMITTING → DONE`; any
//! failure aborts the whole write with no partial effects and nothing is
//! retried automatically. Dropping the future before SUBMITTING is safe;
//! once the finalize request is on the wire the outcome is unknown and the
//! caller must re-query rather than assume.
//!
//! Provisional state is fetched fresh for every write. Two concurrent
//! writes to one repository will race and the server accepts at most one;
//! callers that care should serialize writes per identity.

use crate::client::PdsClient;
use crate::error::{AgoraError, ValidationError};
use crate::records::{Record, TidGenerator};
use crate::repo::{SignedCommit, WriteKind, prepare_write, verify};
use crate::signing::{KeyStore, require_key, sign_commit};
use cid::Cid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

pub const CREATE_PATH: &str = "/record/create";
pub const UPDATE_PATH: &str = "/record/update";

/// Identifies the finalized record.
#[derive(Debug, Clone)]
pub struct WriteResult {
    pub uri: String,
    pub cid: Cid,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Building,
    Verifying,
    Signing,
    Submitting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Building => "building",
            Stage::Verifying => "verifying",
            Stage::Signing => "signing",
            Stage::Submitting => "submitting",
            Stage::Done => "done",
        })
    }
}

#[derive(Debug, Serialize)]
struct FinalizeRequest<'a> {
    repo: &'a str,
    rkey: &'a str,
    value: &'a Record,
    signing_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ckb_addr: Option<&'a str>,
    root: FinalizeRoot<'a>,
}

#[derive(Debug, Serialize)]
struct FinalizeRoot<'a> {
    did: &'a str,
    version: i64,
    rev: &'a str,
    prev: Option<String>,
    data: String,
    #[serde(rename = "signedBytes")]
    signed_bytes: String,
}

#[derive(Debug, Deserialize)]
struct FinalizeResponse {
    commit: FinalizeCommit,
    results: Vec<FinalizeEntry>,
}

#[derive(Debug, Deserialize)]
struct FinalizeCommit {
    cid: String,
    rev: String,
}

#[derive(Debug, Deserialize)]
struct FinalizeEntry {
    cid: String,
    uri: String,
}

/// Issues signed writes against the logged-in identity's repository.
pub struct RepoWriter {
    client: PdsClient,
    keystore: Arc<dyn KeyStore>,
    tids: TidGenerator,
}

impl RepoWriter {
    pub fn new(client: PdsClient, keystore: Arc<dyn KeyStore>) -> Self {
        Self {
            client,
            keystore,
            tids: TidGenerator::new(),
        }
    }

    /// Create a record under a freshly generated record key.
    pub async fn create_record(&self, record: &Record) -> Result<WriteResult, AgoraError> {
        self.put_record(WriteKind::Create, None, record).await
    }

    /// Update the record at its original key. The key is immutable once the
    /// record exists; omitting it is a precondition failure, not a network
    /// call.
    pub async fn update_record(
        &self,
        rkey: &str,
        record: &Record,
    ) -> Result<WriteResult, AgoraError> {
        self.put_record(WriteKind::Update, Some(rkey), record).await
    }

    /// The full pipeline. Create and update differ only in the record-key
    /// source and the write-intent discriminator; verification and signing
    /// are identical.
    pub async fn put_record(
        &self,
        kind: WriteKind,
        rkey: Option<&str>,
        record: &Record,
    ) -> Result<WriteResult, AgoraError> {
        // Preconditions before any network side effect.
        require_key(self.keystore.as_ref())?;
        let rkey = match (kind, rkey) {
            (WriteKind::Update, None) => {
                return Err(ValidationError::MissingRecordKey.into());
            }
            (_, Some(rkey)) => rkey.to_string(),
            (WriteKind::Create, None) => self.tids.next_tid(),
        };

        let session = self.client.session();
        let did = session.did.clone();
        let collection = record.collection();

        debug!(stage = %Stage::Building, repo = %did, collection, rkey = %rkey, write = kind.as_str());
        let prepared = prepare_write(&self.client, &did, collection, &rkey, record, kind).await?;

        debug!(stage = %Stage::Verifying, rkey = %rkey);
        let verified = verify(&prepared.commit, &prepared.server_bytes).map_err(|e| {
            // Encoder drift or tampering: not retryable as-is, so say so loudly.
            error!(
                repo = %did,
                collection,
                rkey = %rkey,
                "commit encoding mismatch, aborting write: {e}"
            );
            e
        })?;

        debug!(stage = %Stage::Signing, rkey = %rkey);
        let signature = sign_commit(&verified, self.keystore.as_ref())?;
        let signed = SignedCommit {
            commit: prepared.commit,
            sig: signature.sig,
        };

        debug!(stage = %Stage::Submitting, rkey = %rkey);
        let commit = &signed.commit;
        let request = FinalizeRequest {
            repo: &did,
            rkey: &rkey,
            value: record,
            signing_key: &signature.signing_key_id,
            ckb_addr: session.ckb_addr.as_deref(),
            root: FinalizeRoot {
                did: &commit.did,
                version: crate::repo::COMMIT_VERSION,
                rev: &commit.rev,
                prev: commit.prev.map(|cid| cid.to_string()),
                data: commit.data.to_string(),
                signed_bytes: hex::encode(&signed.sig),
            },
        };
        let path = match kind {
            WriteKind::Create => CREATE_PATH,
            WriteKind::Update => UPDATE_PATH,
        };
        let response: FinalizeResponse = self.client.post_json(path, &request).await?;

        let FinalizeResponse {
            commit: accepted,
            results,
        } = response;
        let entry = results
            .into_iter()
            .next()
            .ok_or(ValidationError::EmptyResults)?;
        let cid = crate::repo::commit::parse_server_ref("results[0].cid", &entry.cid)?;

        debug!(
            stage = %Stage::Done,
            commit_cid = %accepted.cid,
            commit_rev = %accepted.rev,
            uri = %entry.uri,
        );
        Ok(WriteResult {
            uri: entry.uri,
            cid,
        })
    }
}
