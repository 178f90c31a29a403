//! Strongly typed Qualtrics resource IDs
//!
//! Qualtrics IDs are fixed-length strings with a kind prefix (`SV_` for
//! surveys, `CG_` for mailing lists, ...). Validation happens once at parse
//! time so request builders can splice IDs into paths without re-checking.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefix and length rules for one kind of ID
pub trait IdKind {
    /// Human-readable kind, used in error messages
    const NAME: &'static str;
    /// Accepted prefixes
    const PREFIXES: &'static [&'static str];
    /// Total length including the prefix
    const LEN: usize;
}

/// Validated ID of kind `K`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id<K> {
    value: String,
    _kind: PhantomData<K>,
}

macro_rules! id_kind {
    ($marker:ident, $alias:ident, $name:literal, [$($prefix:literal),+], $len:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $marker;

        impl IdKind for $marker {
            const NAME: &'static str = $name;
            const PREFIXES: &'static [&'static str] = &[$($prefix),+];
            const LEN: usize = $len;
        }

        pub type $alias = Id<$marker>;
    };
}

id_kind!(SurveyMarker, SurveyId, "survey ID", ["SV_"], 18);
id_kind!(ContactMarker, ContactId, "contact ID", ["CID_"], 19);
id_kind!(MailingListMarker, MailingListId, "mailing list ID", ["CG_"], 18);
id_kind!(DistributionMarker, DistributionId, "distribution ID", ["EMD_"], 19);
id_kind!(LibraryMarker, LibraryId, "library ID", ["UR_", "GR_"], 18);

impl<K: IdKind> Id<K> {
    /// Validate and wrap an ID.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let value = input.trim();
        let invalid = |reason: String| ValidationError::InvalidId {
            kind: K::NAME,
            value: value.to_string(),
            reason,
        };

        if !K::PREFIXES.iter().any(|p| value.starts_with(p)) {
            return Err(invalid(format!("must start with {}", K::PREFIXES.join(" or "))));
        }

        let len = value.chars().count();
        if len != K::LEN {
            return Err(invalid(format!(
                "must be {} characters long, got {}",
                K::LEN,
                len
            )));
        }

        // IDs are spliced into URL paths
        if value.chars().any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#')) {
            return Err(invalid("contains characters not allowed in a URL path".to_string()));
        }

        Ok(Self {
            value: value.to_string(),
            _kind: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<K> fmt::Display for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<K> AsRef<str> for Id<K> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<K: IdKind> FromStr for Id<K> {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<K: IdKind> TryFrom<&str> for Id<K> {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl<K> Serialize for Id<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, K: IdKind> Deserialize<'de> for Id<K> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
