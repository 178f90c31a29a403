//! Survey response export options

use serde::Serialize;
use serde_json::{Map, Value};

use super::ExportFormat;
use crate::error::{Result, ValidationError};

/// Options for `surveys/{id}/export-responses`.
///
/// Unset options are omitted from the request so Qualtrics applies its own
/// defaults.
///
/// # Example
/// ```ignore
/// let options = ResponseExportOptions::new()
///     .use_labels(true)
///     .limit(500);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseExportOptions {
    /// File format; sent as the job's `format`, not with the other options
    #[serde(skip)]
    pub format: ExportFormat,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_labels: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_label_columns: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_responses_in_progress: Option<bool>,

    /// Maximum number of responses exported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seen_unanswered_recode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiselect_seen_unanswered_recode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_display_order: Option<bool>,
}

impl ResponseExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn use_labels(mut self, value: bool) -> Self {
        self.use_labels = Some(value);
        self
    }

    pub fn include_label_columns(mut self, value: bool) -> Self {
        self.include_label_columns = Some(value);
        self
    }

    pub fn export_responses_in_progress(mut self, value: bool) -> Self {
        self.export_responses_in_progress = Some(value);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn seen_unanswered_recode(mut self, value: impl Into<String>) -> Self {
        self.seen_unanswered_recode = Some(value.into());
        self
    }

    pub fn multiselect_seen_unanswered_recode(mut self, value: impl Into<String>) -> Self {
        self.multiselect_seen_unanswered_recode = Some(value.into());
        self
    }

    pub fn include_display_order(mut self, value: bool) -> Self {
        self.include_display_order = Some(value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.use_labels.is_some() && self.include_label_columns.is_some() {
            return Err(ValidationError::InvalidOption(
                "useLabels and includeLabelColumns cannot be combined; pass only one".to_string(),
            )
            .into());
        }
        if self.limit == Some(0) {
            return Err(
                ValidationError::InvalidOption("limit must be greater than zero".to_string()).into(),
            );
        }
        Ok(())
    }

    /// Validated options as request body fields (camelCase, unset omitted).
    pub fn to_payload(&self) -> Result<Map<String, Value>> {
        self.validate()?;
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}
