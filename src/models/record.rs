//! Collection record helpers and per-endpoint field lists

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::ids::{Id, IdKind};
use crate::client::Record;
use crate::error::ValidationError;

/// Fields kept for each collection endpoint, in output order.
pub mod fields {
    /// XM Directory contacts
    pub const DIRECTORY_CONTACTS: &[&str] = &[
        "contactId",
        "firstName",
        "lastName",
        "email",
        "phone",
        "unsubscribed",
        "language",
        "extRef",
    ];

    /// Mailing lists in a directory
    pub const MAILING_LISTS: &[&str] = &[
        "mailingListId",
        "name",
        "ownerId",
        "lastModifiedDate",
        "creationDate",
        "contactCount",
    ];

    /// Contacts of one mailing list
    pub const MAILING_LIST_CONTACTS: &[&str] = &[
        "contactId",
        "firstName",
        "lastName",
        "email",
        "phone",
        "extRef",
        "language",
        "unsubscribed",
    ];

    /// Survey distributions
    pub const DISTRIBUTIONS: &[&str] = &[
        "id",
        "parentDistributionId",
        "ownerId",
        "organizationId",
        "requestStatus",
        "requestType",
        "sendDate",
        "createdDate",
        "modifiedDate",
        "headers",
        "recipients",
        "message",
        "surveyLink",
        "embeddedData",
        "stats",
    ];

    /// Library messages
    pub const MESSAGES: &[&str] = &["id", "description", "category"];
}

/// Typed accessors for [`Record`] values
pub trait RecordExt {
    /// String field; `None` when missing, null, or not a string.
    fn str_field(&self, key: &str) -> Option<&str>;

    /// Timestamp field given as epoch milliseconds or an RFC 3339 string.
    fn timestamp_field(&self, key: &str) -> Option<DateTime<Utc>>;

    /// Typed ID field, e.g. `record.id_field::<ContactMarker>("contactId")`.
    /// `Ok(None)` when missing or null; a malformed ID is an error.
    fn id_field<K: IdKind>(&self, key: &str) -> Result<Option<Id<K>>, ValidationError>;
}

impl RecordExt for Record {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn timestamp_field(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    fn id_field<K: IdKind>(&self, key: &str) -> Result<Option<Id<K>>, ValidationError> {
        self.str_field(key).map(Id::parse).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactId, ContactMarker, DistributionMarker};
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_str_field() {
        let r = record(json!({"name": "Panel A", "contactCount": 3, "ownerId": null}));
        assert_eq!(r.str_field("name"), Some("Panel A"));
        assert_eq!(r.str_field("contactCount"), None);
        assert_eq!(r.str_field("ownerId"), None);
        assert_eq!(r.str_field("missing"), None);
    }

    #[test]
    fn test_timestamp_field_epoch_millis() {
        let r = record(json!({"creationDate": 1_577_836_800_000i64}));
        let ts = r.timestamp_field("creationDate").unwrap();
        assert_eq!(ts.to_rfc3339(), "2020-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_timestamp_field_rfc3339() {
        let r = record(json!({"sendDate": "2021-06-01T12:30:00Z", "bad": "yesterday"}));
        let ts = r.timestamp_field("sendDate").unwrap();
        assert_eq!(ts.timestamp(), 1_622_550_600);
        assert!(r.timestamp_field("bad").is_none());
    }

    #[test]
    fn test_id_field() {
        let r = record(json!({
            "contactId": "CID_000000000000007",
            "extRef": null,
            "id": "EMD_short"
        }));
        let contact: Option<ContactId> = r.id_field("contactId").unwrap();
        assert_eq!(contact.unwrap().as_str(), "CID_000000000000007");
        assert!(r.id_field::<ContactMarker>("extRef").unwrap().is_none());
        assert!(matches!(
            r.id_field::<DistributionMarker>("id"),
            Err(ValidationError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_field_lists_have_no_duplicates() {
        for list in [
            fields::DIRECTORY_CONTACTS,
            fields::MAILING_LISTS,
            fields::MAILING_LIST_CONTACTS,
            fields::DISTRIBUTIONS,
            fields::MESSAGES,
        ] {
            let mut sorted = list.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), list.len());
        }
    }
}
