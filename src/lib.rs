//! Async client for the Qualtrics REST API (v3)
//!
//! Two protocols do the heavy lifting:
//! - [`export::ExportPoller`] submits export jobs, polls them to completion
//!   and downloads the result archive.
//! - [`client::PageWalker`] follows `nextPage` links across paginated
//!   collections.
//!
//! Both run on a [`client::Transport`] and classify every response through
//! [`client::classify`]. [`Qualtrics`] wraps them in typed operations.

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod resources;

pub use client::{QualtricsClient, Record, Transport};
pub use config::{Config, Credentials, PollSettings, Preferences};
pub use error::{ApiError, ConfigError, Error, ExportError, PaginationError, Result, ValidationError};
pub use export::{ExportFormat, ExportTarget, ResponseExportOptions, Table};
pub use models::{ContactId, DistributionId, LibraryId, MailingListId, RecordExt, SurveyId};
pub use resources::Qualtrics;
pub use tokio_util::sync::CancellationToken;
