//! Coordinator / public library surface of the maskvault anonymization core
//! (spec §4.8). The [`Engine`] replaces the source system's global mutable
//! state with an explicit, `RwLock`-guarded owner of the key schedule,
//! vault, per-column detector cache, and fake-data corpora (spec §9).

mod config;
mod hmac_mode;
mod report;

pub use config::{EngineConfig, Mode};
pub use maskvault_detect::{DataType, DetectionResult, DetectorParams};
pub use report::{ColumnParams, ColumnStats, RunParameters, RunReport};

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use maskvault_detect::DetectorCache;
use maskvault_fakedata::Corpora;
use maskvault_keys::KeySchedule;
use maskvault_transform::{TransformCtx, TransformError};
use maskvault_vault::{UpsertResult, Vault, VaultError};
use thiserror::Error;

/// Spec §7's six error tags, as matchable variants rather than a single
/// `anyhow` chain — the one place this core departs from the teacher's pure
/// `anyhow` style, since callers need to distinguish fatal-for-run
/// (`VaultAuth`), fatal-before-processing (`ConfigInvalid`), and
/// fatal-for-cell (everything else) outcomes.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("vault I/O error: {0}")]
    VaultIo(VaultError),
    #[error("vault authentication failed: wrong password or corrupted key material")]
    VaultAuth,
    /// Never constructed by this core: [`maskvault_detect::detect`] always
    /// falls back to `DataType::FreeText` rather than failing to decide, so
    /// the local recovery spec §7 assigns this tag is already unconditional.
    /// Kept in the taxonomy for API completeness and forward compatibility.
    #[error("type detector could not decide a data type for column {0:?}")]
    DetectorUndecided(String),
    #[error("no collision-free value found after {0} attempts")]
    ExhaustedDomain(u32),
    #[error("value could not be parsed under the expected format: {0}")]
    FormatUnparseable(String),
    #[error("invalid engine configuration: {0}")]
    ConfigInvalid(String),
}

impl From<VaultError> for CoreError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::Auth => Self::VaultAuth,
            other => Self::VaultIo(other),
        }
    }
}

impl From<TransformError> for CoreError {
    fn from(e: TransformError) -> Self {
        match e {
            TransformError::ExhaustedDomain(n) => Self::ExhaustedDomain(n),
            TransformError::FormatUnparseable(s) => Self::FormatUnparseable(s),
            TransformError::Vault(v) => v.into(),
            TransformError::Fpe(maskvault_fpe::FpeError::ExhaustedDomain(n)) => Self::ExhaustedDomain(n),
            TransformError::Fpe(maskvault_fpe::FpeError::NotInAlphabet(c)) => {
                Self::FormatUnparseable(format!("character {c:?} is not in the expected alphabet"))
            }
        }
    }
}

/// Bound on how many values of a column are remembered for detection
/// purposes (spec §4.6: "samples should already be capped at 1000 non-null
/// cells by the caller").
const MAX_SAMPLE_SIZE: usize = 1000;

/// Owns everything one anonymization run needs (spec §9: an explicit
/// `Engine`, not module-level global state).
pub struct Engine {
    schedule: KeySchedule,
    vault: Vault,
    corpora: Corpora,
    detector_cache: DetectorCache,
    seed_present: bool,
    profile: String,
    preserve_domains: bool,
    lenient: bool,
    anonymize_columns: Option<HashSet<String>>,
    mode: RwLock<Mode>,
    sample_buffers: RwLock<HashMap<String, Vec<String>>>,
    column_stats: RwLock<HashMap<String, ColumnStats>>,
    exhausted_domain_count: AtomicU64,
    format_unparseable_fallback_count: AtomicU64,
}

impl Engine {
    /// Opens (or creates) the vault at `path`, deriving the master key from
    /// `seed` and the vault encryption key from `password` (spec §3, §4.2).
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigInvalid`] if `config` fails validation,
    /// or the vault-opening errors from [`maskvault_vault::Vault::open_or_create`]
    /// (notably [`CoreError::VaultAuth`] on a wrong password).
    pub fn open(path: &Path, password: Option<&[u8]>, seed: Option<&[u8]>, config: EngineConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let schedule = KeySchedule::from_seed(seed);
        let master = *schedule.master().as_bytes();
        let vault = Vault::open_or_create(path, password, master)?;
        Ok(Self {
            schedule,
            vault,
            corpora: Corpora::new(),
            detector_cache: DetectorCache::new(),
            seed_present: seed.is_some(),
            profile: config.profile,
            preserve_domains: config.preserve_domains,
            lenient: config.lenient,
            anonymize_columns: config.anonymize_columns,
            mode: RwLock::new(config.mode),
            sample_buffers: RwLock::new(HashMap::new()),
            column_stats: RwLock::new(HashMap::new()),
            exhausted_domain_count: AtomicU64::new(0),
            format_unparseable_fallback_count: AtomicU64::new(0),
        })
    }

    /// Switches the active anonymization mode for subsequent calls (spec §6).
    pub fn set_mode(&self, mode: Mode) {
        *self.mode.write().expect("engine mode lock poisoned") = mode;
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        *self.mode.read().expect("engine mode lock poisoned")
    }

    /// Feeds `values` into `column`'s pending sample buffer before any
    /// `anonymize` call is made for it, so the first detection decision for
    /// the column sees a representative sample rather than a single cell
    /// (spec §4.8 step 4: "sample is drawn from the pending input, the
    /// collaborator exposes a bounded sampler" — the collaborator is
    /// expected to call this).
    pub fn prime_column_sample(&self, column: &str, values: impl IntoIterator<Item = String>) {
        let mut buffers = self.sample_buffers.write().expect("sample buffer lock poisoned");
        let entry = buffers.entry(column.to_string()).or_default();
        entry.extend(values);
        entry.truncate(MAX_SAMPLE_SIZE);
    }

    fn remember_and_sample(&self, column: &str, value: &str) -> Vec<String> {
        let mut buffers = self.sample_buffers.write().expect("sample buffer lock poisoned");
        let entry = buffers.entry(column.to_string()).or_default();
        if entry.len() < MAX_SAMPLE_SIZE {
            entry.push(value.to_string());
        }
        entry.clone()
    }

    fn detect(&self, column: &str, value: &str) -> DetectionResult {
        let sample = self.remember_and_sample(column, value);
        self.detector_cache.get_or_detect(column, || sample)
    }

    fn record_detection(&self, column: &str, detection: &DetectionResult) {
        let mut stats = self.column_stats.write().expect("column stats lock poisoned");
        let entry = stats.entry(column.to_string()).or_default();
        entry.data_type = report::data_type_tag(detection.data_type).to_string();
        entry.confidence = detection.confidence;
    }

    fn record_hit(&self, column: &str) {
        let mut stats = self.column_stats.write().expect("column stats lock poisoned");
        stats.entry(column.to_string()).or_default().vault_hits += 1;
    }

    fn record_fresh(&self, column: &str) {
        let mut stats = self.column_stats.write().expect("column stats lock poisoned");
        stats.entry(column.to_string()).or_default().fresh_transforms += 1;
    }

    fn ctx<'a>(&'a self, column: &'a str, column_key: &'a [u8; 32]) -> TransformCtx<'a> {
        TransformCtx {
            column,
            column_key,
            master_key: self.schedule.master().as_bytes(),
            vault: &self.vault,
            corpora: &self.corpora,
            preserve_domains: self.preserve_domains,
        }
    }

    fn column_allowed(&self, column: &str) -> bool {
        self.anonymize_columns.as_ref().is_none_or(|allowed| allowed.contains(column))
    }

    /// `anonymize(column, value) -> string` (spec §4.8 / §6), the single
    /// public per-cell entry point.
    ///
    /// # Errors
    /// See [`CoreError`]. In lenient mode, unrecoverable per-cell errors
    /// (`ExhaustedDomain`, vault I/O failures mid-collision-retry) are
    /// swallowed and the original value is returned instead; `VaultAuth`
    /// always propagates, as it is fatal for the whole run.
    pub fn anonymize(&self, column: &str, value: &str) -> Result<String, CoreError> {
        if value.is_empty() {
            return Ok(value.to_string());
        }
        if !self.column_allowed(column) {
            return Ok(value.to_string());
        }

        let mode = self.mode();
        if mode != Mode::Hmac {
            if let Some(existing) = self.vault.get_forward(column, value)? {
                self.record_hit(column);
                return Ok(existing);
            }
        }

        let column_key = self.schedule.column_key(column).expect("hmac key length is fixed at 32 bytes");
        let detection = self.detect(column, value);
        self.record_detection(column, &detection);

        if mode == Mode::Hmac {
            return Ok(hmac_mode::transform(&column_key, column, value));
        }

        let candidate = match maskvault_transform::transform(&self.ctx(column, &column_key), value, detection.data_type, &detection.params) {
            Ok(candidate) => candidate,
            Err(TransformError::FormatUnparseable(msg)) => {
                tracing::warn!(column, msg, "value did not match its detected format, falling back to free-text handling");
                self.format_unparseable_fallback_count.fetch_add(1, Ordering::Relaxed);
                match maskvault_transform::transform(&self.ctx(column, &column_key), value, DataType::FreeText, &DetectorParams::None) {
                    Ok(candidate) => candidate,
                    Err(e) => return self.finish_with_cell_error(e.into(), value),
                }
            }
            Err(e) => return self.finish_with_cell_error(e.into(), value),
        };

        self.record_fresh(column);
        match self.vault.upsert(column, value, &candidate)? {
            UpsertResult::Inserted => Ok(candidate),
            UpsertResult::AlreadyExists(existing) => Ok(existing),
        }
    }

    fn finish_with_cell_error(&self, err: CoreError, original: &str) -> Result<String, CoreError> {
        if matches!(err, CoreError::ExhaustedDomain(_)) {
            self.exhausted_domain_count.fetch_add(1, Ordering::Relaxed);
        }
        if self.lenient {
            tracing::warn!(%err, "unrecoverable cell error in lenient mode, returning the original value unchanged");
            Ok(original.to_string())
        } else {
            Err(err)
        }
    }

    /// `deanonymize(column, value) -> string | none` (spec §4.8 / §6): the
    /// reverse-lookup mirror of [`Engine::anonymize`]. Mode `hmac` never
    /// stores a mapping and is not reversible, so it always returns `None`
    /// (spec invariant 4).
    ///
    /// # Errors
    /// Propagates vault I/O failures; a forward-only miss is `Ok(None)`,
    /// not an error.
    pub fn deanonymize(&self, column: &str, value: &str) -> Result<Option<String>, CoreError> {
        if value.is_empty() {
            return Ok(Some(value.to_string()));
        }
        if self.mode() == Mode::Hmac {
            return Ok(None);
        }
        if !self.column_allowed(column) {
            return Ok(Some(value.to_string()));
        }
        Ok(self.vault.get_reverse(column, value)?)
    }

    /// Snapshots the serializable run-parameters document (spec §6).
    #[must_use]
    pub fn run_parameters(&self) -> RunParameters {
        let detector_cache_columns = self.column_stats.read().expect("column stats lock poisoned");
        let columns = detector_cache_columns
            .iter()
            .map(|(name, stats)| ColumnParams {
                name: name.clone(),
                data_type: stats.data_type.clone(),
                confidence: stats.confidence,
                params: serde_json::Value::Null,
            })
            .collect();
        RunParameters { mode: self.mode(), profile: self.profile.clone(), seed_present: self.seed_present, columns }
    }

    /// Snapshots the ambient diagnostic report (ties to [`RunReport`]).
    #[must_use]
    pub fn run_report(&self) -> RunReport {
        let stats = self.column_stats.read().expect("column stats lock poisoned");
        RunReport {
            columns: stats.values().cloned().collect(),
            exhausted_domain_count: self.exhausted_domain_count.load(Ordering::Relaxed),
            format_unparseable_fallback_count: self.format_unparseable_fallback_count.load(Ordering::Relaxed),
        }
    }

    /// Durably flushes the underlying vault (spec §4.2 `flush()`).
    ///
    /// # Errors
    /// Returns [`CoreError::VaultIo`] if the underlying checkpoint fails.
    pub fn flush(&self) -> Result<(), CoreError> {
        Ok(self.vault.flush()?)
    }
}
