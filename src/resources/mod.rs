//! Typed Qualtrics operations
//!
//! [`Qualtrics`] bundles a transport, credentials and tuning settings and
//! exposes one method per supported resource operation. Exports run through
//! [`ExportPoller`]; collection listings run through [`PageWalker`].

use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::client::{PageSpec, PageWalker, PaginationParams, QualtricsClient, Record, Transport};
use crate::config::{Config, Credentials, PollSettings, Preferences};
use crate::error::{PaginationError, Result};
use crate::export::ExportPoller;

mod directory;
mod distributions;
mod idp;
mod library;
mod surveys;

/// Qualtrics API facade.
///
/// # Example
/// ```ignore
/// let qualtrics = Qualtrics::from_config(&Config::load_with_env()?)?;
/// let survey = SurveyId::parse("SV_0123456789abcde")?;
/// let table = qualtrics
///     .export_survey_responses(&survey, &ResponseExportOptions::new(), &CancellationToken::new())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Qualtrics<T: Transport = QualtricsClient> {
    transport: T,
    credentials: Credentials,
    polling: PollSettings,
    preferences: Preferences,
}

impl Qualtrics<QualtricsClient> {
    /// Build a client from configuration (file plus environment).
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::with_transport(QualtricsClient::new()?, config.credentials()?)
            .with_polling(config.polling.clone())
            .with_preferences(config.preferences.clone()))
    }

    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self::with_transport(QualtricsClient::new()?, credentials))
    }
}

impl<T: Transport> Qualtrics<T> {
    pub fn with_transport(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            polling: PollSettings::default(),
            preferences: Preferences::default(),
        }
    }

    pub fn with_polling(mut self, polling: PollSettings) -> Self {
        self.polling = polling;
        self
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Export poller bound to this client, aborted by `cancel`.
    pub fn poller(&self, cancel: &CancellationToken) -> ExportPoller<'_, T> {
        ExportPoller::new(&self.transport, &self.credentials, self.polling.clone())
            .with_cancellation(cancel.clone())
    }

    /// Walk every page of a collection, keeping `fields` of each item.
    async fn list(&self, path: &str, query: &[(&str, &str)], fields: &[&str]) -> Result<Vec<Record>> {
        let params = PaginationParams::new().page_size(self.preferences.page_size);
        let first_url = self.first_page_url(path, query, &params)?;

        PageWalker::new(
            &self.transport,
            &self.credentials,
            PageSpec::new(params.effective_page_size()).fields(fields),
        )
        .max_pages(self.preferences.max_pages)
        .walk(&first_url)
        .await
    }

    fn first_page_url(
        &self,
        path: &str,
        query: &[(&str, &str)],
        params: &PaginationParams,
    ) -> Result<String> {
        let raw = self.credentials.url(path);
        let mut url = Url::parse(&raw).map_err(|e| PaginationError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        params.apply_to(url.as_str())
    }
}
