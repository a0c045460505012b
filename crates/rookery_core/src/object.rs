use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One raw item of a prefix listing, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object key. Directory entries end with `/`.
    pub key: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub is_directory: bool,
}

impl ObjectEntry {
    pub fn file(key: impl Into<String>, size: u64, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            key: key.into(),
            size,
            modified,
            is_directory: false,
        }
    }

    pub fn directory(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            modified: None,
            is_directory: true,
        }
    }
}

/// Stored attributes of a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub size: u64,
    pub etag: EntityTag,
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
}

/// An opaque strong entity tag, kept without surrounding quotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTag(String);

impl EntityTag {
    /// Accepts both quoted (`"abc"`) and bare (`abc`) values as stores report them.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        let raw = raw.strip_prefix("W/").unwrap_or(raw);
        Self(raw.trim_matches('"').to_string())
    }

    /// Tag for stores that do not keep one: derived from size and modification time.
    pub fn synthesize(size: u64, modified: DateTime<Utc>) -> Self {
        Self(format!(
            "{:x}-{:x}",
            modified.timestamp_nanos_opt().unwrap_or(modified.timestamp()),
            size
        ))
    }

    pub fn opaque(&self) -> &str {
        &self.0
    }
}

/// Renders the header form, `"<opaque>"`.
impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}
