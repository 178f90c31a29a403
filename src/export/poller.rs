//! Export job poller
//!
//! Submits an export, polls its status with a capped doubling delay, and
//! downloads the finished file. Submission retries are bounded; polling is
//! bounded by a deadline and can be cancelled at any sleep or request.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Method;
use serde_json::{Map, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{
    CompletedExport, ExportFormat, ExportJob, ExportTarget, FileAddressing, JobState, JobStatus,
    ReadyExport,
};
use crate::client::{ByteStream, ResponseBody, Transport, ensure_success};
use crate::config::{Credentials, PollSettings};
use crate::error::{ApiError, Error, ExportError, Result};

/// Drives export jobs through submit, poll and download.
///
/// # Example
/// ```ignore
/// let poller = ExportPoller::new(&client, &credentials, PollSettings::default());
/// let export = poller
///     .run(ExportTarget::SurveyResponses(survey), ExportFormat::Csv, Map::new())
///     .await?;
/// let table = export.into_table().await?;
/// ```
pub struct ExportPoller<'a, T: Transport + ?Sized> {
    transport: &'a T,
    credentials: &'a Credentials,
    settings: PollSettings,
    cancel: CancellationToken,
}

impl<'a, T: Transport + ?Sized> ExportPoller<'a, T> {
    pub fn new(transport: &'a T, credentials: &'a Credentials, settings: PollSettings) -> Self {
        Self {
            transport,
            credentials,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Submit an export job.
    ///
    /// Retryable failures re-send the identical request up to
    /// `max_submit_attempts` times in total.
    pub async fn submit(
        &self,
        target: ExportTarget,
        format: ExportFormat,
        payload: Map<String, Value>,
    ) -> Result<ExportJob> {
        let request = self
            .credentials
            .request(Method::POST, &target.base_path())
            .json(target.submit_body(format, payload));
        let max_attempts = self.settings.submit_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(
                "Submitting {} export to {} (attempt {}/{})",
                format, target, attempt, max_attempts
            );

            let response = match self
                .until_cancelled(self.transport.execute(request.clone()))
                .await
            {
                Some(response) => response?,
                None => return Err(ExportError::Cancelled { job_id: None }.into()),
            };
            let status = response.status;
            let body = response.into_json()?;

            let err = match ensure_success(status, &body) {
                Ok(()) => {
                    let job_id = job_id_from(&body)?;
                    info!("Export job {} submitted to {}", job_id, target);
                    return Ok(ExportJob::new(job_id, target, format));
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err.into());
            }
            if attempt >= max_attempts {
                warn!("Giving up on export submission after {} attempts", attempt);
                return Err(ExportError::RetriesExhausted { attempts: attempt, last: err }.into());
            }

            warn!("Export submission failed ({}), retrying", err);
            if !self.pause(self.settings.retry_delay()).await {
                return Err(ExportError::Cancelled { job_id: None }.into());
            }
        }
    }

    /// Fetch the current status of a job once.
    pub async fn poll_status(&self, job: &ExportJob) -> Result<JobStatus> {
        let response = self
            .transport
            .execute(self.credentials.request(Method::GET, &job.status_path()))
            .await?;
        let status = response.status;
        let body = response.into_json()?;

        ensure_success(status, &body)?;
        let result = body.get("result").ok_or_else(|| {
            ApiError::InvalidResponse("status response has no 'result' object".to_string())
        })?;
        JobStatus::from_result(result)
    }

    /// Poll until the job completes, fails, the deadline passes, or the
    /// cancellation token fires.
    pub async fn wait_until_ready(&self, job: ExportJob) -> Result<ReadyExport> {
        let started = Instant::now();
        let deadline = self.settings.deadline();
        let max_delay = self.settings.max_poll_interval();
        let mut delay = self.settings.poll_interval();
        let mut polls = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(&job));
            }

            polls += 1;
            let polled = match self.until_cancelled(self.poll_status(&job)).await {
                Some(polled) => polled,
                None => return Err(self.cancelled(&job)),
            };
            match polled {
                Ok(status) => match status.state {
                    JobState::Failed => {
                        warn!("Export job {} failed", job.job_id());
                        return Err(ExportError::JobFailed {
                            job_id: job.job_id().to_string(),
                            percent_complete: status.percent_complete,
                        }
                        .into());
                    }
                    _ if status.file_id.is_some() || status.state == JobState::Complete => {
                        if job.target().addressing() == FileAddressing::FileId
                            && status.file_id.is_none()
                        {
                            return Err(ApiError::InvalidResponse(format!(
                                "export job {} completed without a file id",
                                job.job_id()
                            ))
                            .into());
                        }
                        info!("Export job {} ready after {} polls", job.job_id(), polls);
                        return Ok(ReadyExport {
                            job,
                            file_id: status.file_id,
                            polls,
                        });
                    }
                    JobState::InProgress | JobState::Complete => debug!(
                        "Export job {}: {:.0}% complete",
                        job.job_id(),
                        status.percent_complete
                    ),
                },
                Err(Error::Api(err)) if err.is_retryable() => {
                    warn!(
                        "Status poll for {} failed ({}); treating as still in progress",
                        job.job_id(),
                        err
                    );
                }
                Err(err) => return Err(err),
            }

            let waited = started.elapsed();
            let remaining = deadline.saturating_sub(waited);
            if remaining.is_zero() {
                return Err(ExportError::DeadlineExceeded {
                    job_id: job.job_id().to_string(),
                    waited,
                }
                .into());
            }

            if !self.pause(delay.min(remaining)).await {
                return Err(self.cancelled(&job));
            }
            delay = delay.saturating_mul(2).min(max_delay);
        }
    }

    /// Open the download stream of a finished job.
    pub async fn download(&self, ready: &ReadyExport) -> Result<ByteStream> {
        let path = ready.download_path()?;
        debug!("Downloading export {} from {}", ready.job.job_id(), path);

        let request = self.credentials.request(Method::GET, &path).streamed();
        let response = match self.until_cancelled(self.transport.execute(request)).await {
            Some(response) => response?,
            None => return Err(self.cancelled(&ready.job)),
        };
        let status = response.status;

        match response.body {
            ResponseBody::Stream(stream) => Ok(stream),
            ResponseBody::Json(body) => {
                ensure_success(status, &body)?;
                Err(ApiError::InvalidResponse(format!(
                    "expected an export file from {}, got a JSON document",
                    path
                ))
                .into())
            }
        }
    }

    /// Submit, wait and open the download in one call.
    pub async fn run(
        &self,
        target: ExportTarget,
        format: ExportFormat,
        payload: Map<String, Value>,
    ) -> Result<CompletedExport> {
        let job = self.submit(target, format, payload).await?;
        let ready = self.wait_until_ready(job).await?;
        let stream = self.download(&ready).await?;
        Ok(CompletedExport { ready, stream })
    }

    /// Sleep for `duration`; false if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Race an in-flight request against the token; `None` if cancelled.
    /// A response that is already available wins.
    async fn until_cancelled<F: Future>(&self, request: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            output = request => Some(output),
            _ = self.cancel.cancelled() => None,
        }
    }

    fn cancelled(&self, job: &ExportJob) -> Error {
        info!("Export job {} cancelled", job.job_id());
        ExportError::Cancelled {
            job_id: Some(job.job_id().to_string()),
        }
        .into()
    }
}

/// Job ID from a submission envelope; endpoints name it differently.
fn job_id_from(body: &Value) -> Result<String> {
    let result = body.get("result").unwrap_or(&Value::Null);
    ["jobId", "progressId", "id"]
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::InvalidResponse("export submission returned no job id".to_string()).into()
        })
}
