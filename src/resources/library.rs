//! Library messages

use super::Qualtrics;
use crate::client::{Record, Transport};
use crate::error::Result;
use crate::models::{LibraryId, fields};

impl<T: Transport> Qualtrics<T> {
    /// Every message in a user (`UR_`) or global (`GR_`) library.
    pub async fn list_messages(&self, library: &LibraryId) -> Result<Vec<Record>> {
        self.list(
            &format!("libraries/{}/messages", library),
            &[],
            fields::MESSAGES,
        )
        .await
    }
}
