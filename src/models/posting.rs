//! Posting records and the persisted posting list.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::utils::{group_thousands, parse_int};

/// Offset of the timestamps written into `added_at` (KST, UTC+9).
pub const KST_OFFSET_SECS: i32 = 9 * 3600;

/// `at` expressed in KST, the offset every `added_at` stamp carries.
pub fn to_kst(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS).expect("UTC+9 is a valid offset");
    at.with_timezone(&kst)
}

/// A record as produced by the extractor, before its key is resolved.
///
/// Also the wire shape of a persisted entry: `Posting` deserializes through
/// this type, so lists written by older tooling (`ix`, `dday`, numeric
/// strings) still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPosting {
    /// Source identifier (`ix` query parameter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// `ix` key of older lists; read only, `id` wins when both are present
    #[serde(default, rename = "ix", skip_serializing)]
    pub legacy_ix: Option<String>,

    #[serde(default)]
    pub title: String,

    /// Absolute link to the posting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,

    /// The `D-n` counter shown on the listing
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub days_remaining: Option<i64>,

    /// `dday` key of older lists; read only
    #[serde(
        default,
        rename = "dday",
        deserialize_with = "lenient_i64",
        skip_serializing
    )]
    pub legacy_dday: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub views: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<FixedOffset>>,

    /// Keys this version does not know about, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawPosting {
    /// Resolve the record key: the explicit id, else the legacy `ix`, else the link.
    pub fn resolve_id(&self) -> Option<String> {
        [
            self.id.as_deref(),
            self.legacy_ix.as_deref(),
            self.url.as_deref(),
        ]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Normalize into a keyed `Posting`.
    pub fn normalize(self) -> Result<Posting> {
        let id = self.resolve_id().ok_or_else(|| AppError::MissingId {
            title: self.title.clone(),
        })?;

        Ok(Posting {
            id,
            title: self.title,
            url: self.url.unwrap_or_default(),
            organizer: self.organizer,
            days_remaining: self.days_remaining.or(self.legacy_dday),
            status: self.status,
            views: self.views,
            category: self.category,
            added_at: self.added_at,
            extra: self.extra,
        })
    }
}

/// One posting with a resolved, non-empty key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosting")]
pub struct Posting {
    pub id: String,

    pub title: String,

    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// First-seen time; written once, never replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<FixedOffset>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<RawPosting> for Posting {
    type Error = AppError;

    fn try_from(raw: RawPosting) -> Result<Self> {
        raw.normalize()
    }
}

impl Posting {
    /// Overwrite descriptive fields with `incoming`, keeping our `added_at`.
    ///
    /// Every field of `incoming` wins, absent ones included. `added_at` stays
    /// as it was unless this record never had one.
    pub fn absorb(&mut self, incoming: Posting) {
        let added_at = self.added_at.or(incoming.added_at);
        let mut extra = std::mem::take(&mut self.extra);
        extra.extend(incoming.extra);

        *self = Posting {
            added_at,
            extra,
            ..incoming
        };
    }

    /// Numeric value of the id, if it is made of ASCII digits only.
    pub fn numeric_id(&self) -> Option<u128> {
        if self.id.is_empty() || !self.id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.id.parse().ok()
    }

    /// `D-n`, or `-` when unknown.
    pub fn days_label(&self) -> String {
        self.days_remaining
            .map_or_else(|| "-".to_string(), |d| format!("D-{d}"))
    }

    /// View count with thousands separators, or `-` when unknown.
    pub fn views_label(&self) -> String {
        self.views
            .map_or_else(|| "-".to_string(), group_thousands)
    }

    pub fn organizer_label(&self) -> &str {
        non_empty_or_dash(self.organizer.as_deref())
    }

    pub fn status_label(&self) -> &str {
        non_empty_or_dash(self.status.as_deref())
    }
}

fn non_empty_or_dash(value: Option<&str>) -> &str {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => "-",
    }
}

/// The ordered list persisted as the whole state of the system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostingList(Vec<Posting>);

impl PostingList {
    pub fn new(postings: Vec<Posting>) -> Self {
        Self(postings)
    }

    /// Decode stored bytes. Blank content reads as an empty list.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode as pretty JSON (two-space indent, UTF-8 text kept as-is).
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&self.0)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Posting] {
        &self.0
    }

    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn into_inner(self) -> Vec<Posting> {
        self.0
    }
}

impl From<Vec<Posting>> for PostingList {
    fn from(postings: Vec<Posting>) -> Self {
        Self(postings)
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => parse_int(&s),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_i64(deserializer)?.and_then(|n| u64::try_from(n).ok()))
}
