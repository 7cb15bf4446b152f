//! Local cache for the signing-key seed.
//!
//! The seed is created at login and destroyed at logout. It is stored
//! encrypted at rest (ChaCha20-Poly1305, key file with owner-only
//! permissions) and handed out as a `0x`-prefixed hex string; the pipeline
//! borrows it for one signing operation and never persists or logs it.

use crate::error::AuthError;
use anyhow::{Context, Result, bail};
use chacha20poly1305::{
    ChaCha20Poly1305, KeyInit, Nonce,
    aead::{Aead, OsRng, rand_core::RngCore},
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// Fixed prefix on cached seed material; stripped before key import.
pub const KEY_HEX_PREFIX: &str = "0x";

const SEED_FILE: &str = "signing_key";
const KEY_FILE: &str = ".keystore_key";
const ENC_PREFIX: &str = "ENC:";
const NONCE_LEN: usize = 12;

/// Read-only access to cached signing key material.
///
/// `sign_key` returns the seed as `0x`-prefixed hex, or `None` when the
/// caller is not logged in, a recoverable precondition rather than a crash.
pub trait KeyStore: Send + Sync {
    fn sign_key(&self) -> Result<Option<String>, AuthError>;
}

// ─── In-memory store (tests, ephemeral sessions) ─────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    key: Option<String>,
}

impl MemoryKeyStore {
    pub fn empty() -> Self {
        Self { key: None }
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn sign_key(&self) -> Result<Option<String>, AuthError> {
        Ok(self.key.clone())
    }
}

// ─── Encrypted file store ────────────────────────────────────────────────────

pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Cache a seed at login. Accepts hex with or without the `0x` prefix
    /// and stores the prefixed form.
    pub fn store(&self, seed_hex: &str) -> Result<(), AuthError> {
        let bare = seed_hex.strip_prefix(KEY_HEX_PREFIX).unwrap_or(seed_hex);
        let mut decoded = hex::decode(bare)
            .map_err(|e| AuthError::KeyImport(format!("seed is not hex: {e}")))?;
        let len = decoded.len();
        decoded.zeroize();
        if len != 32 {
            return Err(AuthError::KeyImport(format!(
                "seed must be 32 bytes, got {len}"
            )));
        }
        self.write_encrypted(&format!("{KEY_HEX_PREFIX}{bare}"))
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    /// Destroy the cached seed at logout.
    pub fn clear(&self) -> Result<(), AuthError> {
        let path = self.root.join(SEED_FILE);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| AuthError::Store(e.to_string()))?;
        }
        Ok(())
    }

    fn write_encrypted(&self, plaintext: &str) -> Result<()> {
        fs::create_dir_all(&self.root).context("failed to create keystore dir")?;
        let mut key_bytes = self.load_or_create_key()?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key_bytes)
            .map_err(|_| anyhow::anyhow!("invalid key length"))?;
        key_bytes.zeroize();

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("encryption failed: {e}"))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        fs::write(
            self.root.join(SEED_FILE),
            format!("{ENC_PREFIX}{}", hex::encode(combined)),
        )
        .context("failed to write seed file")?;
        Ok(())
    }

    fn read_encrypted(&self) -> Result<Option<String>> {
        let path = self.root.join(SEED_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path).context("failed to read seed file")?;
        let Some(hex_str) = value.trim().strip_prefix(ENC_PREFIX) else {
            bail!("seed file is not encrypted");
        };
        let combined = hex::decode(hex_str).context("invalid hex in seed file")?;
        if combined.len() < NONCE_LEN {
            bail!("seed file too short");
        }
        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let mut key_bytes = self.load_or_create_key()?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key_bytes)
            .map_err(|_| anyhow::anyhow!("invalid key length"))?;
        key_bytes.zeroize();

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| anyhow::anyhow!("decryption failed: {e}"))?;
        let seed = String::from_utf8(plaintext).context("seed is not valid UTF-8")?;
        Ok(Some(seed))
    }

    fn key_path(&self) -> PathBuf {
        self.root.join(KEY_FILE)
    }

    fn read_key_file(path: &Path) -> Result<Vec<u8>> {
        let hex_key = fs::read_to_string(path).context("failed to read key file")?;
        let key = hex::decode(hex_key.trim()).context("invalid hex in key file")?;
        if key.len() != 32 {
            bail!("key file has invalid length (expected 32 bytes)");
        }
        Ok(key)
    }

    fn write_new_key_file(path: &Path, key: &[u8]) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(path)
                .context("failed to create key file")?;
            file.write_all(hex::encode(key).as_bytes())
                .context("failed to write key file")?;
            file.sync_all().context("failed to sync key file")?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, hex::encode(key)).context("failed to write key file")?;
        }

        Self::enforce_key_permissions(path)
    }

    fn enforce_key_permissions(path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .context("failed to set key file permissions")?;
        }
        #[cfg(not(unix))]
        let _ = path;
        Ok(())
    }

    fn load_or_create_key(&self) -> Result<Vec<u8>> {
        let path = self.key_path();
        if path.exists() {
            Self::enforce_key_permissions(&path)?;
            Self::read_key_file(&path)
        } else {
            let mut key = vec![0u8; 32];
            OsRng.fill_bytes(&mut key);
            match Self::write_new_key_file(&path, &key) {
                Ok(()) => Ok(key),
                Err(error) => {
                    let is_already_exists = error
                        .downcast_ref::<std::io::Error>()
                        .is_some_and(|io| io.kind() == std::io::ErrorKind::AlreadyExists);
                    if is_already_exists {
                        Self::enforce_key_permissions(&path)?;
                        Self::read_key_file(&path)
                    } else {
                        Err(error)
                    }
                }
            }
        }
    }
}

impl KeyStore for FileKeyStore {
    fn sign_key(&self) -> Result<Option<String>, AuthError> {
        self.read_encrypted()
            .map_err(|e| AuthError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SEED: &str = "0x0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn store_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(dir.path());
        store.store(SEED).unwrap();
        assert_eq!(store.sign_key().unwrap().as_deref(), Some(SEED));
    }

    #[test]
    fn unprefixed_seed_is_stored_prefixed() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(dir.path());
        store.store(&SEED[2..]).unwrap();
        assert_eq!(store.sign_key().unwrap().as_deref(), Some(SEED));
    }

    #[test]
    fn seed_is_encrypted_at_rest() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(dir.path());
        store.store(SEED).unwrap();
        let on_disk = std::fs::read_to_string(dir.path().join(SEED_FILE)).unwrap();
        assert!(on_disk.starts_with(ENC_PREFIX));
        assert!(!on_disk.contains(&SEED[2..]));
    }

    #[test]
    fn absent_seed_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(dir.path());
        assert!(store.sign_key().unwrap().is_none());
    }

    #[test]
    fn clear_removes_the_seed() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(dir.path());
        store.store(SEED).unwrap();
        store.clear().unwrap();
        assert!(store.sign_key().unwrap().is_none());
        // Clearing an already-empty store is fine.
        store.clear().unwrap();
    }

    #[test]
    fn rejects_short_seeds() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(dir.path());
        assert!(matches!(
            store.store("0xdeadbeef"),
            Err(AuthError::KeyImport(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn key_file_permissions_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(dir.path());
        store.store(SEED).unwrap();

        let metadata = std::fs::metadata(dir.path().join(KEY_FILE)).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}
