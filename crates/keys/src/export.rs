//! On-disk representation of a randomly generated key that could not be
//! re-derived from a seed/password (spec §6: "Exported decryption key file").

use crate::KeyMaterial;
use anyhow::{Context, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedKeyFile {
    pub version: u32,
    pub key: String,
    pub algorithm: String,
    pub created_at: String,
}

impl ExportedKeyFile {
    #[must_use]
    pub fn new(key: &KeyMaterial) -> Self {
        Self {
            version: 1,
            key: base64::engine::general_purpose::STANDARD.encode(key.0),
            algorithm: "XChaCha20-Poly1305".to_string(),
            created_at: OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
        }
    }

    /// Writes this key file as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization or the filesystem write fails.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("serialize exported key file")?;
        std::fs::write(path, content).context("write exported key file")?;
        Ok(())
    }

    /// Reads and parses a previously exported key file.
    ///
    /// # Errors
    /// Returns an error if the file is missing, unreadable, not valid JSON,
    /// or the embedded key is not valid base64 / not 32 bytes.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("read exported key file")?;
        let parsed: Self = serde_json::from_str(&content).context("parse exported key file")?;
        Ok(parsed)
    }

    /// Decodes the embedded key back into `KeyMaterial`.
    ///
    /// # Errors
    /// Returns an error if the base64 payload is malformed or not 32 bytes.
    pub fn key_material(&self) -> Result<KeyMaterial> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.key)
            .context("decode exported key")?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("exported key must be 32 bytes"))?;
        Ok(KeyMaterial(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_json_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");

        let key = KeyMaterial::random();
        let exported = ExportedKeyFile::new(&key);
        exported.write(&path).unwrap();

        let read_back = ExportedKeyFile::read(&path).unwrap();
        assert_eq!(read_back.version, 1);
        assert_eq!(read_back.algorithm, "XChaCha20-Poly1305");
        let recovered = read_back.key_material().unwrap();
        assert_eq!(recovered.0, key.0);
    }

    #[test]
    fn rejects_malformed_key_length() {
        let bad = ExportedKeyFile {
            version: 1,
            key: base64::engine::general_purpose::STANDARD.encode(b"too-short"),
            algorithm: "XChaCha20-Poly1305".to_string(),
            created_at: String::new(),
        };
        assert!(bad.key_material().is_err());
    }
}
