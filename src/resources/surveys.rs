//! Survey response exports

use log::debug;
use serde_json::Map;
use tokio_util::sync::CancellationToken;

use super::Qualtrics;
use crate::client::Transport;
use crate::error::Result;
use crate::export::{
    CompletedExport, ExportFormat, ExportTarget, ResponseExportOptions, SurveyQuestion, Table,
};
use crate::models::SurveyId;

impl<T: Transport> Qualtrics<T> {
    /// Export a survey's responses and parse them into a table.
    pub async fn export_survey_responses(
        &self,
        survey: &SurveyId,
        options: &ResponseExportOptions,
        cancel: &CancellationToken,
    ) -> Result<Table> {
        self.export_survey_responses_raw(survey, options, cancel)
            .await?
            .into_table()
            .await
    }

    /// Export a survey's responses, returning the undecoded download.
    ///
    /// Use this for formats that do not unpack into a table (JSON, SPSS, XML).
    pub async fn export_survey_responses_raw(
        &self,
        survey: &SurveyId,
        options: &ResponseExportOptions,
        cancel: &CancellationToken,
    ) -> Result<CompletedExport> {
        let payload = options.to_payload()?;
        debug!("Exporting responses of {} with {:?}", survey, payload);

        self.poller(cancel)
            .run(
                ExportTarget::SurveyResponses(survey.clone()),
                options.format,
                payload,
            )
            .await
    }

    /// Export responses through the legacy `responseexports` endpoint.
    pub async fn export_legacy_responses(
        &self,
        survey: &SurveyId,
        format: ExportFormat,
        cancel: &CancellationToken,
    ) -> Result<Table> {
        self.poller(cancel)
            .run(ExportTarget::LegacyResponses(survey.clone()), format, Map::new())
            .await?
            .into_table()
            .await
    }

    /// Question IDs and texts, read from the first row of a small export.
    pub async fn get_survey_questions(&self, survey: &SurveyId) -> Result<Vec<SurveyQuestion>> {
        let options = ResponseExportOptions::new().limit(2);
        let table = self
            .export_survey_responses(survey, &options, &CancellationToken::new())
            .await?;
        Ok(table.questions())
    }
}
