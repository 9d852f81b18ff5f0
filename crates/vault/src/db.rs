use crate::VaultError;
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

/// Magic string stamped into the header row; used to refuse to open a file
/// that is a valid `SQLite` database but not one of ours (spec §4.2: corrupt
/// records/headers are reported, never silently skipped).
const HEADER_MAGIC: &str = "ANOV1";

#[derive(Debug)]
pub struct Db {
    conn: Connection,
}

pub struct VaultHeader {
    pub salt: Vec<u8>,
    pub kdf_iterations: u32,
    pub verifier: Vec<u8>,
}

pub struct MappingRow {
    pub id: i64,
    pub column_name: String,
    pub forward_key: Vec<u8>,
    pub reverse_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub created_at: OffsetDateTime,
}

pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

impl Db {
    /// Opens (creating if absent) the `SQLite` file backing the vault and
    /// runs migrations.
    ///
    /// # Errors
    /// Returns [`VaultError::Io`] if the file cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: &std::path::Path) -> Result<Self, VaultError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), VaultError> {
        self.conn.execute_batch(
            r"
        PRAGMA journal_mode=WAL;
        PRAGMA foreign_keys=ON;

        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            magic TEXT NOT NULL,
            salt BLOB NOT NULL,
            kdf_iterations INTEGER NOT NULL,
            verifier BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS mappings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            column_name TEXT NOT NULL,
            forward_key BLOB NOT NULL,
            reverse_key BLOB NOT NULL,
            nonce BLOB NOT NULL,
            ciphertext BLOB NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_mappings_forward ON mappings(forward_key);
        CREATE INDEX IF NOT EXISTS idx_mappings_reverse ON mappings(reverse_key);
        CREATE INDEX IF NOT EXISTS idx_mappings_column ON mappings(column_name);
        ",
        )?;
        Ok(())
    }

    pub fn is_meta_empty(&self) -> Result<bool, VaultError> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM meta", [], |r| r.get(0))?;
        Ok(count == 0)
    }

    /// Writes the vault header (salt, KDF iteration count, verifier tag).
    /// Overwrites any existing header — callers only do this once, at
    /// vault creation.
    pub fn write_header(&self, header: &VaultHeader) -> Result<(), VaultError> {
        self.conn.execute("DELETE FROM meta", [])?;
        self.conn.execute(
            "INSERT INTO meta (id, magic, salt, kdf_iterations, verifier) VALUES (1, ?, ?, ?, ?)",
            params![HEADER_MAGIC, header.salt, header.kdf_iterations, header.verifier],
        )?;
        Ok(())
    }

    /// Reads the vault header, refusing to proceed if the magic tag does
    /// not match.
    ///
    /// # Errors
    /// Returns [`VaultError::CorruptHeader`] if a header row exists but its
    /// magic tag is wrong.
    pub fn read_header(&self) -> Result<Option<VaultHeader>, VaultError> {
        let row = self
            .conn
            .query_row("SELECT magic, salt, kdf_iterations, verifier FROM meta WHERE id = 1", [], |r| {
                let magic: String = r.get(0)?;
                let salt: Vec<u8> = r.get(1)?;
                let kdf_iterations: u32 = r.get(2)?;
                let verifier: Vec<u8> = r.get(3)?;
                Ok((magic, salt, kdf_iterations, verifier))
            })
            .optional()?;

        match row {
            None => Ok(None),
            Some((magic, salt, kdf_iterations, verifier)) => {
                if magic != HEADER_MAGIC {
                    return Err(VaultError::CorruptHeader(format!("unexpected magic {magic:?}")));
                }
                Ok(Some(VaultHeader { salt, kdf_iterations, verifier }))
            }
        }
    }

    /// Inserts a mapping row. The unique index on `forward_key` is the
    /// atomicity anchor for `Vault::upsert` (spec §4.2): a concurrent
    /// insert of the same `(column, original)` loses this race and is told
    /// so via [`InsertOutcome::Duplicate`] rather than an error.
    pub fn insert_mapping(
        &self,
        column: &str,
        forward_key: &[u8],
        reverse_key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> Result<InsertOutcome, VaultError> {
        let now = OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        match self.conn.execute(
            "INSERT INTO mappings (column_name, forward_key, reverse_key, nonce, ciphertext, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![column, forward_key, reverse_key, nonce, ciphertext, now],
        ) {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == 2067 || e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_by_forward_key(&self, forward_key: &[u8]) -> Result<Option<MappingRow>, VaultError> {
        self.get_by(&"forward_key", forward_key)
    }

    pub fn get_by_reverse_key(&self, reverse_key: &[u8]) -> Result<Option<MappingRow>, VaultError> {
        self.get_by(&"reverse_key", reverse_key)
    }

    fn get_by(&self, column: &str, key: &[u8]) -> Result<Option<MappingRow>, VaultError> {
        let sql = format!(
            "SELECT id, column_name, forward_key, reverse_key, nonce, ciphertext, created_at FROM mappings WHERE {column} = ? LIMIT 1"
        );
        self.conn
            .query_row(&sql, params![key], Self::row_to_mapping)
            .optional()
            .map_err(VaultError::from)
    }

    /// Lists every mapping stored for `column`, for diagnostics (spec §4.2
    /// `iter_column`). Materialized as a `Vec`; vaults are expected to stay
    /// small enough per run that this is not a concern in practice.
    pub fn iter_column(&self, column: &str) -> Result<Vec<MappingRow>, VaultError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, column_name, forward_key, reverse_key, nonce, ciphertext, created_at FROM mappings WHERE column_name = ? ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![column], Self::row_to_mapping)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn row_to_mapping(r: &rusqlite::Row) -> rusqlite::Result<MappingRow> {
        Ok(MappingRow {
            id: r.get(0)?,
            column_name: r.get(1)?,
            forward_key: r.get(2)?,
            reverse_key: r.get(3)?,
            nonce: r.get(4)?,
            ciphertext: r.get(5)?,
            created_at: OffsetDateTime::parse(&r.get::<_, String>(6)?, &time::format_description::well_known::Rfc3339)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
        })
    }

    /// Durably commits pending writes (spec §4.2 `flush`).
    pub fn flush(&self) -> Result<(), VaultError> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::fs;

    fn tmp_path(name: &str) -> std::path::PathBuf {
        let now = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        let pid = std::process::id();
        std::env::temp_dir().join(format!("maskvault_db_{name}_{pid}_{now}.sqlite3"))
    }

    #[test]
    fn open_and_migrate_is_idempotent() {
        let path = tmp_path("open_migrate");
        let db = Db::open(&path).unwrap();
        assert!(db.is_meta_empty().unwrap());
        let db2 = Db::open(&path).unwrap();
        assert!(db2.is_meta_empty().unwrap());
        fs::remove_file(path).ok();
    }

    #[test]
    fn write_and_read_header_roundtrip() {
        let path = tmp_path("header_roundtrip");
        let db = Db::open(&path).unwrap();
        let header = VaultHeader {
            salt: vec![1, 2, 3, 4],
            kdf_iterations: 200_000,
            verifier: vec![0xAB; 32],
        };
        db.write_header(&header).unwrap();
        assert!(!db.is_meta_empty().unwrap());

        let read = db.read_header().unwrap().expect("header present");
        assert_eq!(read.salt, header.salt);
        assert_eq!(read.kdf_iterations, header.kdf_iterations);
        assert_eq!(read.verifier, header.verifier);
        fs::remove_file(path).ok();
    }

    #[test]
    fn insert_mapping_and_lookup_by_both_keys() {
        let path = tmp_path("mapping_lookup");
        let db = Db::open(&path).unwrap();
        let outcome = db.insert_mapping("email", b"fwd-key-16bytes!", b"rev-key-16bytes!", b"nonce", b"ct").unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted));

        let by_fwd = db.get_by_forward_key(b"fwd-key-16bytes!").unwrap().expect("row present");
        assert_eq!(by_fwd.column_name, "email");
        let by_rev = db.get_by_reverse_key(b"rev-key-16bytes!").unwrap().expect("row present");
        assert_eq!(by_rev.id, by_fwd.id);
        fs::remove_file(path).ok();
    }

    #[test]
    fn duplicate_forward_key_insert_is_reported_not_errored() {
        let path = tmp_path("mapping_duplicate");
        let db = Db::open(&path).unwrap();
        let first = db.insert_mapping("email", b"same-forward-key", b"rev-a", b"n1", b"c1").unwrap();
        assert!(matches!(first, InsertOutcome::Inserted));
        let second = db.insert_mapping("email", b"same-forward-key", b"rev-b", b"n2", b"c2").unwrap();
        assert!(matches!(second, InsertOutcome::Duplicate));
        fs::remove_file(path).ok();
    }

    #[test]
    fn iter_column_only_returns_matching_column() {
        let path = tmp_path("iter_column");
        let db = Db::open(&path).unwrap();
        db.insert_mapping("email", b"fwd-1-of-16bytes", b"rev-1-of-16bytes", b"n", b"c").unwrap();
        db.insert_mapping("phone", b"fwd-2-of-16bytes", b"rev-2-of-16bytes", b"n", b"c").unwrap();
        let rows = db.iter_column("email").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].column_name, "email");
        fs::remove_file(path).ok();
    }

    #[test]
    fn read_header_rejects_wrong_magic() {
        let path = tmp_path("bad_magic");
        let db = Db::open(&path).unwrap();
        db.conn
            .execute(
                "INSERT INTO meta (id, magic, salt, kdf_iterations, verifier) VALUES (1, 'BOGUS', ?, 1, ?)",
                params![vec![0u8; 4], vec![0u8; 4]],
            )
            .unwrap();
        let err = db.read_header().unwrap_err();
        assert!(matches!(err, VaultError::CorruptHeader(_)));
        fs::remove_file(path).ok();
    }
}
