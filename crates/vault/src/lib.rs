//! Encrypted mapping vault: the persistent original-to-anonymized lookup
//! table described in spec §4.2. Lookup keys are `HMAC-SHA256` truncations
//! of `column || direction || value` so the file never holds either
//! plaintext originals or anonymized values outside of AEAD ciphertext.

pub mod crypto;
pub mod db;

pub use crypto::{aead_decrypt, aead_encrypt, header_verifier, lookup_key, mapping_ad};
pub use db::{Db, InsertOutcome, MappingRow, VaultHeader};

use maskvault_keys::KeyMaterial;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault I/O error: {0}")]
    Io(#[from] rusqlite::Error),
    #[error("corrupt vault header: {0}")]
    CorruptHeader(String),
    #[error("vault authentication failed: wrong password or corrupted key material")]
    Auth,
    #[error("vault record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cryptographic error: {0}")]
    Crypto(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct MappingPayload {
    original: String,
    anonymized: String,
}

/// Result of [`Vault::upsert`] (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertResult {
    Inserted,
    AlreadyExists(String),
}

/// The open, keyed vault. Holds the decryption key in memory for the
/// lifetime of a run; never persisted.
pub struct Vault {
    db: Db,
    vault_key: KeyMaterial,
    master_key_for_lookup: [u8; 32],
    db_path: PathBuf,
}

impl Vault {
    /// Opens an existing vault file, or creates a new one if `path` does
    /// not exist yet, deriving the vault key from `password` and the
    /// header's per-vault salt (generated fresh on first creation).
    ///
    /// `master_key_for_lookup` is the key used to compute forward/reverse
    /// HMAC lookup keys — the coordinator's `KeySchedule` master key (spec
    /// §4.2: lookup keys are over the same master key as column sub-keys).
    ///
    /// # Errors
    /// Returns [`VaultError::Auth`] if a header exists and `password`
    /// does not reproduce its stored verifier tag, or [`VaultError::Io`] /
    /// [`VaultError::CorruptHeader`] for file-level problems.
    pub fn open_or_create(path: &Path, password: Option<&[u8]>, master_key_for_lookup: [u8; 32]) -> Result<Self, VaultError> {
        let db = Db::open(path)?;

        let vault_key = match db.read_header()? {
            Some(header) => {
                let key = maskvault_keys::derive_vault_key(password, &header.salt);
                if header_verifier(&key) != header.verifier {
                    return Err(VaultError::Auth);
                }
                key
            }
            None => {
                let mut salt = vec![0u8; 16];
                getrandom::fill(&mut salt).map_err(|e| VaultError::Crypto(e.to_string()))?;
                let key = maskvault_keys::derive_vault_key(password, &salt);
                let verifier = header_verifier(&key);
                db.write_header(&VaultHeader {
                    salt,
                    kdf_iterations: maskvault_keys::KDF_ITERATIONS,
                    verifier,
                })?;
                key
            }
        };

        Ok(Self {
            db,
            vault_key,
            master_key_for_lookup,
            db_path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// `get_forward(column, original) -> anonymized | none` (spec §4.2).
    ///
    /// # Errors
    /// Returns [`VaultError::Crypto`] if a matching record fails to
    /// decrypt/authenticate (corrupt record), [`VaultError::Io`] on
    /// database failure.
    pub fn get_forward(&self, column: &str, original: &str) -> Result<Option<String>, VaultError> {
        let key = lookup_key(&self.master_key_for_lookup, column, 0x00, original)?;
        let Some(row) = self.db.get_by_forward_key(&key)? else {
            return Ok(None);
        };
        let payload = self.decrypt_row(&row)?;
        Ok(Some(payload.anonymized))
    }

    /// `get_reverse(column, anonymized) -> original | none` (spec §4.2).
    ///
    /// # Errors
    /// See [`Vault::get_forward`].
    pub fn get_reverse(&self, column: &str, anonymized: &str) -> Result<Option<String>, VaultError> {
        let key = lookup_key(&self.master_key_for_lookup, column, 0x01, anonymized)?;
        let Some(row) = self.db.get_by_reverse_key(&key)? else {
            return Ok(None);
        };
        let payload = self.decrypt_row(&row)?;
        Ok(Some(payload.original))
    }

    /// Atomically records `(column, original) -> anonymized`. Implemented
    /// as write-then-check against the unique forward-key index: if another
    /// caller won the race, the candidate we computed is discarded and
    /// theirs is returned instead (spec §4.2).
    ///
    /// # Errors
    /// Propagates I/O, serialization, or cryptographic failures. These are
    /// always hard errors — the vault never silently drops a write.
    pub fn upsert(&self, column: &str, original: &str, anonymized: &str) -> Result<UpsertResult, VaultError> {
        let forward_key = lookup_key(&self.master_key_for_lookup, column, 0x00, original)?;
        let reverse_key = lookup_key(&self.master_key_for_lookup, column, 0x01, anonymized)?;
        let payload = serde_json::to_vec(&MappingPayload {
            original: original.to_string(),
            anonymized: anonymized.to_string(),
        })?;
        let ad = mapping_ad(column, &forward_key);
        let (nonce, ciphertext) = aead_encrypt(&self.vault_key, &payload, &ad)?;

        match self.db.insert_mapping(column, &forward_key, &reverse_key, &nonce, &ciphertext)? {
            InsertOutcome::Inserted => Ok(UpsertResult::Inserted),
            InsertOutcome::Duplicate => {
                let row = self
                    .db
                    .get_by_forward_key(&forward_key)?
                    .ok_or_else(|| VaultError::Crypto("duplicate reported but row vanished".into()))?;
                let existing = self.decrypt_row(&row)?;
                tracing::debug!(column, "vault upsert lost race, returning existing mapping");
                Ok(UpsertResult::AlreadyExists(existing.anonymized))
            }
        }
    }

    /// `iter_column(column) -> lazy sequence` (spec §4.2), materialized as
    /// a `Vec` of decrypted `(original, anonymized)` pairs for diagnostics.
    ///
    /// # Errors
    /// Fails fast (without skipping remaining rows) on the first corrupt
    /// record, per spec §4.2's "never silently skipped" failure model.
    pub fn iter_column(&self, column: &str) -> Result<Vec<(String, String)>, VaultError> {
        self.db
            .iter_column(column)?
            .iter()
            .map(|row| self.decrypt_row(row).map(|p| (p.original, p.anonymized)))
            .collect()
    }

    /// `flush()` — durably commits pending writes (spec §4.2).
    ///
    /// # Errors
    /// Returns [`VaultError::Io`] if the underlying checkpoint fails.
    pub fn flush(&self) -> Result<(), VaultError> {
        self.db.flush()
    }

    fn decrypt_row(&self, row: &MappingRow) -> Result<MappingPayload, VaultError> {
        let ad = mapping_ad(&row.column_name, &row.forward_key);
        let pt = aead_decrypt(&self.vault_key, &row.nonce, &row.ciphertext, &ad)?;
        Ok(serde_json::from_slice(&pt)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::fs;

    fn tmp_path(name: &str) -> PathBuf {
        let now = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        let pid = std::process::id();
        std::env::temp_dir().join(format!("maskvault_vault_{name}_{pid}_{now}.sqlite3"))
    }

    #[test]
    fn upsert_then_forward_and_reverse_lookup() {
        let path = tmp_path("upsert_lookup");
        let vault = Vault::open_or_create(&path, Some(b"pw"), [1u8; 32]).unwrap();

        let r = vault.upsert("email", "john@example.com", "axel@corp.test").unwrap();
        assert_eq!(r, UpsertResult::Inserted);

        assert_eq!(vault.get_forward("email", "john@example.com").unwrap().as_deref(), Some("axel@corp.test"));
        assert_eq!(vault.get_reverse("email", "axel@corp.test").unwrap().as_deref(), Some("john@example.com"));
        assert_eq!(vault.get_forward("email", "nobody@example.com").unwrap(), None);
        fs::remove_file(path).ok();
    }

    #[test]
    fn upsert_is_idempotent_for_same_original() {
        let path = tmp_path("upsert_idempotent");
        let vault = Vault::open_or_create(&path, Some(b"pw"), [2u8; 32]).unwrap();

        let first = vault.upsert("email", "a@b.com", "x@y.com").unwrap();
        assert_eq!(first, UpsertResult::Inserted);

        // A second writer computing a different candidate for the same
        // original loses the race and learns the existing value.
        let second = vault.upsert("email", "a@b.com", "different-candidate@y.com").unwrap();
        assert_eq!(second, UpsertResult::AlreadyExists("x@y.com".to_string()));
        fs::remove_file(path).ok();
    }

    #[test]
    fn reopening_with_wrong_password_fails_auth() {
        let path = tmp_path("wrong_password");
        {
            let vault = Vault::open_or_create(&path, Some(b"correct-horse"), [3u8; 32]).unwrap();
            vault.upsert("email", "a@b.com", "c@d.com").unwrap();
        }
        let err = Vault::open_or_create(&path, Some(b"wrong-password"), [3u8; 32]).unwrap_err();
        assert!(matches!(err, VaultError::Auth));
        fs::remove_file(path).ok();
    }

    #[test]
    fn reopening_with_correct_password_recovers_mappings() {
        let path = tmp_path("reopen_ok");
        {
            let vault = Vault::open_or_create(&path, Some(b"pw"), [4u8; 32]).unwrap();
            vault.upsert("phone", "+15551234567", "+19998887777").unwrap();
            vault.flush().unwrap();
        }
        let vault = Vault::open_or_create(&path, Some(b"pw"), [4u8; 32]).unwrap();
        assert_eq!(vault.get_forward("phone", "+15551234567").unwrap().as_deref(), Some("+19998887777"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn iter_column_lists_only_its_own_column() {
        let path = tmp_path("iter_column");
        let vault = Vault::open_or_create(&path, Some(b"pw"), [5u8; 32]).unwrap();
        vault.upsert("email", "a@b.com", "x@y.com").unwrap();
        vault.upsert("phone", "111", "222").unwrap();

        let rows = vault.iter_column("email").unwrap();
        assert_eq!(rows, vec![("a@b.com".to_string(), "x@y.com".to_string())]);
        fs::remove_file(path).ok();
    }
}
