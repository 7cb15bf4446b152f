//! Explicit session context.
//!
//! The write pipeline takes a `Session` by value or reference rather than
//! reaching for ambient global state, so it stays testable without a live
//! login. The CLI persists the session as JSON next to the config.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Repository identity of the logged-in user.
    pub did: String,
    /// Bearer token for the service.
    pub access_token: String,
    /// Optional on-chain address forwarded with finalize requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ckb_addr: Option<String>,
}

impl Session {
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let session = serde_json::from_str(&raw).map_err(|e| ConfigError::Load(e.to_string()))?;
        Ok(Some(session))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Save(e.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }

    pub fn clear(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_load_clear_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let session = Session {
            did: "did:plc:alice".into(),
            access_token: "token".into(),
            ckb_addr: Some("ckb1q...".into()),
        };
        session.save(&path).unwrap();
        let loaded = Session::load(&path).unwrap().unwrap();
        assert_eq!(loaded.did, "did:plc:alice");
        assert_eq!(loaded.ckb_addr.as_deref(), Some("ckb1q..."));

        Session::clear(&path).unwrap();
        assert!(Session::load(&path).unwrap().is_none());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(Session::load(&dir.path().join("absent.json")).unwrap().is_none());
    }
}
