//! Integrity Verifier: the trust boundary of the write pipeline.
//!
//! The server proposes a commit shape, but the client never signs
//! server-supplied bytes. It re-encodes the commit it built from the
//! response fields and signs those bytes only after confirming they match
//! the server's encoding exactly. A single differing byte means either
//! encoder drift or tampering, and the write must abort.

use crate::error::ConsistencyError;
use crate::repo::commit::UnsignedCommit;
use subtle::ConstantTimeEq;

/// Re-encode `commit` locally and compare byte-for-byte against the bytes
/// the server claims to be its canonical encoding. Returns the verified
/// local encoding, which is what gets signed.
pub fn verify(commit: &UnsignedCommit, server_bytes: &[u8]) -> Result<Vec<u8>, ConsistencyError> {
    let local = commit.encoded();
    if local.ct_eq(server_bytes).into() {
        Ok(local)
    } else {
        Err(ConsistencyError::Mismatch {
            local: local.len(),
            server: server_bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid::Cid;
    use multihash::Multihash;
    use sha2::{Digest, Sha256};

    fn test_ref(seed: &[u8]) -> Cid {
        let digest = Sha256::digest(seed);
        let mh = Multihash::<64>::wrap(0x12, &digest).expect("digest fits");
        Cid::new_v1(0x71, mh)
    }

    fn sample() -> UnsignedCommit {
        UnsignedCommit::new(
            "did:plc:alice".into(),
            "3jzfcijpj2z2a".into(),
            Some(test_ref(b"prior")),
            test_ref(b"data-root"),
        )
    }

    #[test]
    fn matching_bytes_verify() {
        let commit = sample();
        let server = commit.encoded();
        assert_eq!(verify(&commit, &server).unwrap(), server);
    }

    #[test]
    fn single_flipped_byte_fails() {
        let commit = sample();
        let mut server = commit.encoded();
        let last = server.len() - 1;
        server[last] ^= 0x01;
        assert!(verify(&commit, &server).is_err());
    }

    #[test]
    fn truncated_server_bytes_fail() {
        let commit = sample();
        let mut server = commit.encoded();
        server.pop();
        assert!(verify(&commit, &server).is_err());
    }

    #[test]
    fn different_data_root_fails() {
        // Server bytes decode cleanly but carry a different data ref than
        // the commit the client assembled.
        let commit = sample();
        let mut other = commit.clone();
        other.data = test_ref(b"attacker-root");
        assert!(verify(&commit, &other.encoded()).is_err());
    }
}
