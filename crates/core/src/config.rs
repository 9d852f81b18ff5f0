//! Engine configuration (spec §4.8 / §6 / §7): anonymization mode, domain
//! preservation, error policy, and the column allow-list.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::CoreError;

/// Anonymization strategy (spec §6: `set_mode`).
///
/// `Hybrid` is exactly the per-type dispatch described in spec §4.7 (FPE for
/// `phone|numeric_id|credit_card|iban|uuid|date`, fake-data draws for
/// `email|name|address|domain|free_text`) — every type's §4.7 contract
/// already specifies one approach, so `Fake` and `Fpe` dispatch to the same
/// per-type transformer as `Hybrid` (there is no alternate "FPE a name" or
/// "fake-draw a credit card" contract in the spec, and forcing one would
/// break the Luhn/IBAN/calendar-validity invariants for the structured
/// types). `Hmac` is the one mode with genuinely distinct behavior: it
/// bypasses the vault entirely and is not reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Fake,
    Fpe,
    Hmac,
    Hybrid,
}

/// Construction-time configuration for an [`crate::Engine`] (spec §4.8,
/// ambient `EngineConfig` per SPEC_FULL's expanded §4.1 note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mode: Mode,
    /// Free-form label surfaced in [`crate::RunParameters`] (spec §6:
    /// `"profile": string`), e.g. a KDF cost profile name.
    pub profile: String,
    pub preserve_domains: bool,
    /// `lenient`: unrecoverable per-cell errors return the original value
    /// unchanged. `strict` (default): they propagate to the caller (spec §7).
    pub lenient: bool,
    /// The "anonymize set" (spec §4.8 step 2). `None` means every column is
    /// eligible; `Some(columns)` restricts anonymization to exactly those
    /// column names.
    pub anonymize_columns: Option<HashSet<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { mode: Mode::Hybrid, profile: "default".to_string(), preserve_domains: true, lenient: false, anonymize_columns: None }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    #[must_use]
    pub fn with_preserve_domains(mut self, preserve: bool) -> Self {
        self.preserve_domains = preserve;
        self
    }

    #[must_use]
    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    #[must_use]
    pub fn with_anonymize_columns(mut self, columns: HashSet<String>) -> Self {
        self.anonymize_columns = Some(columns);
        self
    }

    /// Validates the configuration (spec §7: `ConfigInvalid`, "fatal before
    /// processing").
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigInvalid`] if `profile` is empty or the
    /// column allow-list is present but empty (which would anonymize
    /// nothing, almost certainly not the caller's intent).
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.profile.trim().is_empty() {
            return Err(CoreError::ConfigInvalid("profile must not be empty".to_string()));
        }
        if matches!(&self.anonymize_columns, Some(columns) if columns.is_empty()) {
            return Err(CoreError::ConfigInvalid(
                "anonymize_columns was set but is empty; omit it to anonymize every column".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_profile_is_invalid() {
        let config = EngineConfig::default().with_profile("");
        assert!(matches!(config.validate(), Err(CoreError::ConfigInvalid(_))));
    }

    #[test]
    fn empty_explicit_column_set_is_invalid() {
        let config = EngineConfig::default().with_anonymize_columns(HashSet::new());
        assert!(matches!(config.validate(), Err(CoreError::ConfigInvalid(_))));
    }

    #[test]
    fn builder_methods_compose() {
        let mut columns = HashSet::new();
        columns.insert("email".to_string());
        let config = EngineConfig::default().with_mode(Mode::Fpe).with_lenient(true).with_anonymize_columns(columns);
        assert_eq!(config.mode, Mode::Fpe);
        assert!(config.lenient);
        assert!(config.validate().is_ok());
    }
}
