//! Serializable run-level summaries (spec §6's "anonymization parameters
//! serialized per run", plus an ambient diagnostic companion grounded on
//! `chamber_vault::BackupConfig`'s small-serde-struct-next-to-the-vault
//! pattern).

use maskvault_detect::DataType;
use serde::{Deserialize, Serialize};

use crate::Mode;

#[must_use]
pub(crate) fn data_type_tag(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Uuid => "uuid",
        DataType::Email => "email",
        DataType::Phone => "phone",
        DataType::CreditCard => "credit_card",
        DataType::Iban => "iban",
        DataType::Date => "date",
        DataType::NumericId => "numeric_id",
        DataType::Domain => "domain",
        DataType::Name => "name",
        DataType::Address => "address",
        DataType::FreeText => "free_text",
    }
}

/// Per-column entry of [`RunParameters`] (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnParams {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub confidence: f64,
    pub params: serde_json::Value,
}

/// `{"mode":..., "profile":..., "seed_present":bool, "columns":[...]}`
/// (spec §6, verbatim shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParameters {
    pub mode: Mode,
    pub profile: String,
    pub seed_present: bool,
    pub columns: Vec<ColumnParams>,
}

/// Per-column counters inside [`RunReport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnStats {
    pub data_type: String,
    pub confidence: f64,
    pub vault_hits: u64,
    pub fresh_transforms: u64,
}

/// Diagnostic summary of one engine run (ambient addition, spec §6's "run
/// parameters" fleshed out with counts a caller would want to log or
/// display — not part of spec.md itself).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub columns: Vec<ColumnStats>,
    pub exhausted_domain_count: u64,
    pub format_unparseable_fallback_count: u64,
}
