//! Typed shapes of the records stored in PocketBase.
//!
//! PocketBase has a few serialization quirks that these types absorb: empty
//! text/relation/file fields come back as `""` instead of `null`, and
//! datetimes use a space-separated UTC format (`2024-05-01 12:34:56.789Z`).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::prelude::*;


/// Length of PocketBase record IDs.
const RECORD_ID_LEN: usize = 15;

/// A PocketBase record ID: exactly 15 lowercase alphanumeric characters.
///
/// Parsing enforces the format, so a `RecordId` can be interpolated into
/// request paths and filter expressions without further escaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub(crate) struct RecordId(String);

impl RecordId {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RecordId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == RECORD_ID_LEN
            && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        if !valid {
            bail!(
                "invalid record ID '{s}': expected {RECORD_ID_LEN} lowercase \
                    alphanumeric characters",
            );
        }

        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for RecordId {
    type Error = anyhow::Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}


/// Review state of a submission. Closed enumeration: anything else is
/// rejected at the parsing boundary, before any request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => bail!(
                "invalid status '{other}': expected 'pending', 'approved' or 'rejected'",
            ),
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}


/// What a submission proposes: a completely new mosque, or changes to an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmissionKind {
    NewMosque,
    EditMosque,
}

impl SubmissionKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NewMosque => "new_mosque",
            Self::EditMosque => "edit_mosque",
        }
    }
}


/// An account in the `users` collection.
///
/// `verified` means "email verified". Suspension is a separate flag, see
/// [`crate::users::set_suspended`].
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct User {
    pub(crate) id: RecordId,
    #[serde(default)]
    pub(crate) name: String,
    // Only included by PocketBase for requests that may see it.
    #[serde(default)]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) verified: bool,
    #[serde(default)]
    pub(crate) suspended: bool,
    #[serde(with = "pbtime")]
    pub(crate) created: DateTime<Utc>,
    #[serde(with = "pbtime")]
    pub(crate) updated: DateTime<Utc>,
}


/// A pending proposal for a mosque record, awaiting review.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Submission {
    pub(crate) id: RecordId,
    #[serde(rename = "type")]
    pub(crate) kind: SubmissionKind,

    /// The proposed mosque field values. This object is fully controlled by
    /// the submitter and must never be copied anywhere wholesale.
    #[serde(default)]
    pub(crate) data: serde_json::Map<String, serde_json::Value>,

    /// Reference to the mosque being edited. Only set for `edit_mosque`.
    #[serde(default, deserialize_with = "opt_record_id")]
    pub(crate) mosque: Option<RecordId>,

    /// File name of the attached image, if any.
    #[serde(default, deserialize_with = "opt_string")]
    pub(crate) image: Option<String>,

    pub(crate) status: SubmissionStatus,
    pub(crate) submitted_by: RecordId,
    #[serde(default, deserialize_with = "opt_record_id")]
    pub(crate) reviewed_by: Option<RecordId>,
    #[serde(default, deserialize_with = "pbtime::opt_deserialize")]
    pub(crate) reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_string")]
    pub(crate) rejection_reason: Option<String>,
    #[serde(with = "pbtime")]
    pub(crate) created: DateTime<Utc>,
    #[serde(with = "pbtime")]
    pub(crate) updated: DateTime<Utc>,
}


/// A mosque record in the directory.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Mosque {
    pub(crate) id: RecordId,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) address: String,
    #[serde(default)]
    pub(crate) latitude: f64,
    #[serde(default)]
    pub(crate) longitude: f64,
    #[serde(default)]
    pub(crate) status: String,
    #[serde(default, deserialize_with = "opt_record_id")]
    pub(crate) created_by: Option<RecordId>,
    #[serde(default, deserialize_with = "opt_string")]
    pub(crate) image: Option<String>,
}


/// The paged list envelope PocketBase wraps all record listings in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    pub(crate) page: u32,
    pub(crate) per_page: u32,
    pub(crate) total_items: u64,
    pub(crate) total_pages: u32,
    pub(crate) items: Vec<T>,
}


/// Handling of PocketBase's UTC datetime strings, e.g.
/// `2024-05-01 12:34:56.789Z`.
pub(crate) mod pbtime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

    pub(crate) fn to_string(datetime: &DateTime<Utc>) -> String {
        datetime.format(FORMAT).to_string()
    }

    pub(crate) fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.fZ")
            .map(|naive| naive.and_utc())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    /// Like [`deserialize`], but maps PocketBase's empty string to `None`.
    pub(crate) fn opt_deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => parse(s).map(Some).map_err(D::Error::custom),
        }
    }
}

/// Deserializes an optional relation/ID field, mapping `""` to `None`.
fn opt_record_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<RecordId>, D::Error> {
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(D::Error::custom),
    }
}

/// Deserializes an optional text/file field, mapping `""` to `None`.
fn opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}


#[cfg(test)]
mod tests {
    use super::{pbtime, RecordId, SubmissionStatus};

    #[test]
    fn record_id_accepts_valid() {
        for id in ["abc123def456ghi", "000000000000000", "zzzzzzzzzzzzzzz"] {
            id.parse::<RecordId>().expect(&format!("'{id}' should be a valid record ID"));
        }
    }

    #[test]
    fn record_id_rejects_invalid() {
        let invalid = [
            "",
            "short",
            "abc123def456ghij",        // too long
            "ABC123DEF456GHI",         // upper case
            "abc123def456gh!",         // symbol
            "abc 23def456ghi",         // whitespace
            "abc123def456gh\u{e9}",    // non-ASCII
            "' || 1=1 || 'xy",         // filter injection attempt
        ];
        for id in invalid {
            id.parse::<RecordId>().unwrap_err();
        }
    }

    #[test]
    fn status_parse_closed_set() {
        assert_eq!("pending".parse::<SubmissionStatus>().unwrap(), SubmissionStatus::Pending);
        assert_eq!("approved".parse::<SubmissionStatus>().unwrap(), SubmissionStatus::Approved);
        assert_eq!("rejected".parse::<SubmissionStatus>().unwrap(), SubmissionStatus::Rejected);

        for invalid in ["", "Pending", "PENDING", "accepted", "pending'||'", "pending "] {
            invalid.parse::<SubmissionStatus>().unwrap_err();
        }
    }

    #[test]
    fn pbtime_roundtrip() {
        let parsed = pbtime::parse("2024-05-01 12:34:56.789Z").unwrap();
        assert_eq!(pbtime::to_string(&parsed), "2024-05-01 12:34:56.789Z");

        // Without fractional seconds
        pbtime::parse("2024-05-01 12:34:56Z").unwrap();

        pbtime::parse("2024-05-01T12:34:56.789Z").unwrap_err();
        pbtime::parse("").unwrap_err();
    }
}
