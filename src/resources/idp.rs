//! Imported data project exports

use serde_json::Map;
use tokio_util::sync::CancellationToken;

use super::Qualtrics;
use crate::client::Transport;
use crate::error::{Result, ValidationError};
use crate::export::{ExportFormat, ExportTarget, Table};

impl<T: Transport> Qualtrics<T> {
    /// Export every record of an imported data project.
    ///
    /// IDP IDs follow no fixed format, so only emptiness and path characters
    /// are checked.
    pub async fn export_idp_records(
        &self,
        idp_id: &str,
        format: ExportFormat,
        cancel: &CancellationToken,
    ) -> Result<Table> {
        let idp_id = idp_id.trim();
        if idp_id.is_empty() || idp_id.contains(['/', '?', '#']) {
            return Err(ValidationError::InvalidId {
                kind: "imported data project ID",
                value: idp_id.to_string(),
                reason: "must be non-empty and contain no URL path characters".to_string(),
            }
            .into());
        }

        self.poller(cancel)
            .run(
                ExportTarget::ImportedDataProject(idp_id.to_string()),
                format,
                Map::new(),
            )
            .await?
            .into_table()
            .await
    }
}
