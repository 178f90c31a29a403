//! Qualtrics domain types
//!
//! Typed resource IDs and helpers for the untyped records returned by
//! collection endpoints.

mod ids;
mod record;

pub use ids::{
    ContactId, ContactMarker, DistributionId, DistributionMarker, Id, IdKind, LibraryId,
    LibraryMarker, MailingListId, MailingListMarker, SurveyId, SurveyMarker,
};
pub use record::{RecordExt, fields};
