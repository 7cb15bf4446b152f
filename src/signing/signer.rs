//! Commit signing.
//!
//! The keypair is derived fresh from the cached seed for every signing call
//! and dropped as soon as the signature exists; derived keys are never
//! cached across calls. Signatures are secp256k1 ECDSA over the SHA-256
//! digest of the verified commit bytes, low-S normalized, in 64-byte raw
//! form. The signing-key identifier is the `did:key` form of the public key.

use crate::error::{AgoraError, AuthError};
use crate::signing::keystore::{KEY_HEX_PREFIX, KeyStore};
use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

/// Multicodec prefix for a secp256k1 public key (0xe7, varint-encoded).
const MULTICODEC_SECP256K1: [u8; 2] = [0xe7, 0x01];

/// A signature over verified commit bytes plus the identifier of the key
/// that produced it.
#[derive(Debug, Clone)]
pub struct CommitSignature {
    /// 64-byte raw `r || s` signature, low-S normalized.
    pub sig: Vec<u8>,
    /// `did:key` identifier of the signing key.
    pub signing_key_id: String,
}

/// Check that key material is cached without deriving anything. The write
/// pipeline calls this before spending a network round trip.
pub fn require_key(keystore: &dyn KeyStore) -> Result<(), AgoraError> {
    if keystore.sign_key()?.is_none() {
        return Err(AuthError::MissingKey.into());
    }
    Ok(())
}

/// Sign `bytes` with the cached seed.
pub fn sign_commit(bytes: &[u8], keystore: &dyn KeyStore) -> Result<CommitSignature, AgoraError> {
    let Some(cached) = keystore.sign_key()? else {
        return Err(AuthError::MissingKey.into());
    };
    let bare = cached
        .strip_prefix(KEY_HEX_PREFIX)
        .ok_or_else(|| AuthError::KeyImport("cached seed missing 0x prefix".into()))?;
    let mut seed = hex::decode(bare)
        .map_err(|e| AuthError::KeyImport(format!("cached seed is not hex: {e}")))?;

    let signing_key = SigningKey::from_slice(&seed)
        .map_err(|e| AuthError::KeyImport(e.to_string()));
    seed.zeroize();
    let signing_key = signing_key?;

    let signature: Signature = signing_key.sign(bytes);
    let signature = signature.normalize_s().unwrap_or(signature);
    let signing_key_id = did_key(signing_key.verifying_key());

    // signing_key drops here; k256 zeroizes it.
    Ok(CommitSignature {
        sig: signature.to_bytes().to_vec(),
        signing_key_id,
    })
}

/// Stable public-key identifier: `did:key:z` + base58btc(multicodec ++
/// compressed point).
fn did_key(verifying_key: &VerifyingKey) -> String {
    let point = verifying_key.to_encoded_point(true);
    let mut prefixed = Vec::with_capacity(2 + point.as_bytes().len());
    prefixed.extend_from_slice(&MULTICODEC_SECP256K1);
    prefixed.extend_from_slice(point.as_bytes());
    format!("did:key:z{}", bs58::encode(prefixed).into_string())
}
