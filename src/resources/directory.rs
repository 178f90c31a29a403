//! XM Directory contacts and mailing lists

use super::Qualtrics;
use crate::client::{Record, Transport};
use crate::error::Result;
use crate::models::{MailingListId, fields};

impl<T: Transport> Qualtrics<T> {
    /// Every contact in the configured directory.
    pub async fn list_contacts_in_directory(&self) -> Result<Vec<Record>> {
        let directory = self.credentials.directory_id()?;
        self.list(
            &format!("directories/{}/contacts", directory),
            &[],
            fields::DIRECTORY_CONTACTS,
        )
        .await
    }

    /// Every mailing list in the configured directory.
    pub async fn list_mailing_lists(&self) -> Result<Vec<Record>> {
        let directory = self.credentials.directory_id()?;
        self.list(
            &format!("directories/{}/mailinglists", directory),
            &[],
            fields::MAILING_LISTS,
        )
        .await
    }

    /// Every contact of one mailing list.
    pub async fn list_mailing_list_contacts(&self, list: &MailingListId) -> Result<Vec<Record>> {
        let directory = self.credentials.directory_id()?;
        self.list(
            &format!("directories/{}/mailinglists/{}/contacts", directory, list),
            &[],
            fields::MAILING_LIST_CONTACTS,
        )
        .await
    }
}
