//! Virtual directories synthesized from flat prefix listings.
//!
//! The store has no directories of its own. A listing of `org/acme/` yields the
//! keys below that prefix, with deeper prefixes collapsed into entries such as
//! `org/acme/lib/`. [`Directory`] turns that into a sorted, display-ready view.

use crate::error::StorageError;
use crate::object::ObjectEntry;
use crate::traits::ObjectStream;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Key with the listed prefix stripped, e.g. `lib/` or `lib-1.0.jar`.
    pub name: String,
    pub key: String,
    pub is_directory: bool,
    pub size_bytes: Option<u64>,
    /// Binary-unit rendering of `size_bytes`, `-` for directories.
    pub size: String,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified: Option<String>,
}

impl DirectoryEntry {
    fn from_object(prefix: &str, object: ObjectEntry) -> Self {
        let name = object
            .key
            .strip_prefix(prefix)
            .unwrap_or(&object.key)
            .to_string();

        if object.is_directory {
            return Self {
                name,
                key: object.key,
                is_directory: true,
                size_bytes: None,
                size: "-".to_string(),
                modified_at: None,
                modified: None,
            };
        }

        Self {
            name,
            key: object.key,
            is_directory: false,
            size_bytes: Some(object.size),
            size: format_bytes(object.size),
            modified: object
                .modified
                .map(|m| m.format(MODIFIED_FORMAT).to_string()),
            modified_at: object.modified,
        }
    }

    /// Directories before files, then by name.
    fn display_order(&self, other: &Self) -> Ordering {
        other
            .is_directory
            .cmp(&self.is_directory)
            .then_with(|| self.name.cmp(&other.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    /// `/` for the root, otherwise the listed prefix.
    pub request_path: String,
    pub entries: Vec<DirectoryEntry>,
}

impl Directory {
    /// Builds the view for `prefix` from a materialized listing.
    ///
    /// An empty listing is only valid at the root. The store's own placeholder
    /// object for `prefix`, if it keeps one, is not an entry.
    pub fn from_entries<I>(prefix: &str, objects: I) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = ObjectEntry>,
    {
        let mut objects = objects.into_iter().peekable();
        if objects.peek().is_none() && !prefix.is_empty() {
            return Err(StorageError::NotFound(prefix.to_string()));
        }

        let mut entries: Vec<DirectoryEntry> = objects
            .filter(|object| object.key != prefix)
            .map(|object| DirectoryEntry::from_object(prefix, object))
            .collect();
        entries.sort_by(DirectoryEntry::display_order);

        Ok(Self {
            request_path: if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            },
            entries,
        })
    }

    /// Drains a store listing. Sorting needs the whole listing in memory.
    pub async fn collect(prefix: &str, stream: ObjectStream) -> Result<Self, StorageError> {
        let objects: Vec<ObjectEntry> = stream.try_collect().await?;
        Self::from_entries(prefix, objects)
    }
}

/// Renders a byte count with binary units: `512B`, `1.0KiB`, `3.4MiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{bytes}B");
    }

    let mut exp = 0;
    let mut scale = UNIT;
    while exp + 1 < PREFIXES.len() && bytes / scale >= UNIT {
        scale *= UNIT;
        exp += 1;
    }

    format!("{:.1}{}iB", bytes as f64 / scale as f64, PREFIXES[exp])
}
