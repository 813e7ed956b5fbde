//! Result shapes returned by the TCS endpoints

use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of a sync or format preview, as reported by the remote system
///
/// Only `message` and `filled_count` drive the audit log; the rest is
/// passed through for display. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Human-readable result message
    #[serde(default)]
    pub message: String,
    /// Number of records TCS reported as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    /// Total hours covered by the run
    #[serde(
        default,
        deserialize_with = "hours_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_hours: Option<f64>,
    /// Screenshot captured by the automation after filling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    /// Date as formatted for TCS (`YYYY/MM/DD`), format previews only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Copy-pasteable TCS text, format previews only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_text: Option<String>,
    /// Per-entry breakdown, format previews only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<TcsEntry>,
}

impl SyncOutcome {
    /// Text to show for this outcome: the message, else the formatted text
    pub fn summary(&self) -> &str {
        if !self.message.is_empty() {
            return &self.message;
        }
        self.formatted_text.as_deref().unwrap_or_default()
    }
}

/// A single time entry formatted for TCS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcsEntry {
    pub project_name: String,
    /// Account group (code + name)
    pub account_group: String,
    /// Work category (code + name)
    pub work_category: String,
    #[serde(deserialize_with = "hours")]
    pub hours: f64,
    pub description: String,
}

/// Format preview over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangePreview {
    /// Start date (`YYYY/MM/DD`)
    pub start_date: String,
    /// End date (`YYYY/MM/DD`)
    pub end_date: String,
    /// One preview per date that has entries
    pub daily_formats: Vec<SyncOutcome>,
    #[serde(deserialize_with = "hours")]
    pub total_hours: f64,
    pub formatted_text: String,
}

/// Hours arrive either as a JSON number or as a decimal string ("7.5")
#[derive(Deserialize)]
#[serde(untagged)]
enum Hours {
    Number(f64),
    Text(String),
}

impl Hours {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            Hours::Number(n) => Ok(n),
            Hours::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid hours value: {s:?}"))),
        }
    }
}

fn hours<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Hours::deserialize(deserializer)?.into_f64()
}

fn hours_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Option::<Hours>::deserialize(deserializer)?
        .map(Hours::into_f64)
        .transpose()
}
