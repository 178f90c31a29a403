//! Asynchronous export jobs
//!
//! An export is submitted, polled until it reaches a terminal state, then
//! downloaded as a zip archive. [`ExportPoller`] drives that lifecycle for
//! any [`ExportTarget`]; [`archive`] unpacks the downloaded file.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::ByteStream;
use crate::error::{ApiError, Result};
use crate::models::SurveyId;

pub mod archive;
pub mod options;
pub mod poller;

pub use archive::{SurveyQuestion, Table, collect_stream, extract_table};
pub use options::ResponseExportOptions;
pub use poller::ExportPoller;

/// How a finished export's file is addressed in its download URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAddressing {
    /// `{base}/{jobId}/file`
    JobId,
    /// `{base}/{fileId}/file`, file id taken from the completed status
    FileId,
}

/// Endpoint family an export job is submitted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// `surveys/{id}/export-responses`
    SurveyResponses(SurveyId),
    /// `responseexports` with the survey ID in the body
    LegacyResponses(SurveyId),
    /// `imported-data-projects/{id}/exports`
    ImportedDataProject(String),
    /// Any other endpoint following the same submit/status/file layout
    Custom {
        path: String,
        addressing: FileAddressing,
    },
}

impl ExportTarget {
    /// Path jobs are submitted to; status and download paths extend it.
    pub fn base_path(&self) -> String {
        match self {
            ExportTarget::SurveyResponses(survey) => format!("surveys/{}/export-responses", survey),
            ExportTarget::LegacyResponses(_) => "responseexports".to_string(),
            ExportTarget::ImportedDataProject(id) => format!("imported-data-projects/{}/exports", id),
            ExportTarget::Custom { path, .. } => path.trim_matches('/').to_string(),
        }
    }

    pub fn addressing(&self) -> FileAddressing {
        match self {
            ExportTarget::SurveyResponses(_) | ExportTarget::ImportedDataProject(_) => {
                FileAddressing::FileId
            }
            ExportTarget::LegacyResponses(_) => FileAddressing::JobId,
            ExportTarget::Custom { addressing, .. } => *addressing,
        }
    }

    /// Submission body: format first, then target fields, then `payload`.
    pub fn submit_body(&self, format: ExportFormat, payload: Map<String, Value>) -> Value {
        let mut body = Map::new();
        body.insert("format".to_string(), Value::String(format.to_string()));
        if let ExportTarget::LegacyResponses(survey) = self {
            body.insert("surveyId".to_string(), Value::String(survey.to_string()));
        }
        body.extend(payload);
        Value::Object(body)
    }
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportTarget::LegacyResponses(survey) => write!(f, "responseexports ({})", survey),
            other => f.write_str(&other.base_path()),
        }
    }
}

/// Export file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
    Json,
    Ndjson,
    Spss,
    Xml,
}

impl ExportFormat {
    /// Field delimiter for delimited-text formats.
    pub fn delimiter(self) -> Option<u8> {
        match self {
            ExportFormat::Csv => Some(b','),
            ExportFormat::Tsv => Some(b'\t'),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
            ExportFormat::Ndjson => "ndjson",
            ExportFormat::Spss => "spss",
            ExportFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted export job.
///
/// The job ID is fixed at submission; status and download paths are derived
/// from it and never from later responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    job_id: String,
    target: ExportTarget,
    format: ExportFormat,
    submitted_at: DateTime<Utc>,
}

impl ExportJob {
    pub(crate) fn new(job_id: impl Into<String>, target: ExportTarget, format: ExportFormat) -> Self {
        Self {
            job_id: job_id.into(),
            target,
            format,
            submitted_at: Utc::now(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn target(&self) -> &ExportTarget {
        &self.target
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn status_path(&self) -> String {
        format!("{}/{}", self.target.base_path(), self.job_id)
    }

    /// Download path for this job; file-id addressed targets need `file_id`.
    pub fn download_path(&self, file_id: Option<&str>) -> Result<String> {
        let key = match self.target.addressing() {
            FileAddressing::JobId => self.job_id.as_str(),
            FileAddressing::FileId => file_id.ok_or_else(|| {
                ApiError::InvalidResponse(format!(
                    "export job {} completed without a file id",
                    self.job_id
                ))
            })?,
        };
        Ok(format!("{}/{}/file", self.target.base_path(), key))
    }
}

/// Progress of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    InProgress,
    Complete,
    Failed,
}

/// Parsed status poll result
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    pub percent_complete: f64,
    pub file_id: Option<String>,
}

impl JobStatus {
    /// Parse the `result` object of a status response.
    pub fn from_result(result: &Value) -> Result<Self> {
        let percent_complete = result
            .get("percentComplete")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let file_id = ["fileId", "file"]
            .iter()
            .find_map(|key| result.get(*key).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let state = match result.get("status").and_then(Value::as_str) {
            Some(status) => parse_state(status)?,
            // The legacy endpoint reports only percentComplete and file
            None if file_id.is_some() => JobState::Complete,
            None => JobState::InProgress,
        };

        Ok(Self {
            state,
            percent_complete,
            file_id,
        })
    }
}

fn parse_state(status: &str) -> Result<JobState> {
    let normalized: String = status
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .to_ascii_lowercase();

    match normalized.as_str() {
        "inprogress" => Ok(JobState::InProgress),
        "complete" => Ok(JobState::Complete),
        "failed" => Ok(JobState::Failed),
        _ => Err(ApiError::InvalidResponse(format!("unknown export status '{}'", status)).into()),
    }
}

/// A job that finished and can be downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyExport {
    pub job: ExportJob,
    pub file_id: Option<String>,
    /// Status polls it took to get here
    pub polls: u32,
}

impl ReadyExport {
    pub fn download_path(&self) -> Result<String> {
        self.job.download_path(self.file_id.as_deref())
    }
}

/// A finished export with its download stream
pub struct CompletedExport {
    pub ready: ReadyExport,
    pub stream: ByteStream,
}

impl fmt::Debug for CompletedExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletedExport")
            .field("ready", &self.ready)
            .field("stream", &"..")
            .finish()
    }
}

impl CompletedExport {
    /// Buffer the download and unpack its first file as a table.
    pub async fn into_table(self) -> Result<Table> {
        let format = self.ready.job.format();
        let bytes = collect_stream(self.stream).await?;
        extract_table(&bytes, format)
    }
}
