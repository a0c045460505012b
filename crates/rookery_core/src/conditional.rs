//! Conditional retrieval against stored object validators.

use crate::object::{EntityTag, ObjectMetadata};
use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// Version identity of the object being fetched, read fresh from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    pub etag: EntityTag,
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
}

impl From<ObjectMetadata> for Validators {
    fn from(meta: ObjectMetadata) -> Self {
        Self {
            etag: meta.etag,
            last_modified: meta.last_modified,
            content_type: meta.content_type,
        }
    }
}

impl Validators {
    /// `Last-Modified` in IMF-fixdate form.
    pub fn http_last_modified(&self) -> String {
        httpdate::fmt_http_date(SystemTime::from(self.last_modified))
    }

    fn modified_after(&self, since: SystemTime) -> bool {
        // HTTP dates carry whole seconds only.
        self.last_modified.timestamp() > DateTime::<Utc>::from(since).timestamp()
    }
}

/// One entity tag from an `If-Match` / `If-None-Match` list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestTag {
    opaque: String,
    weak: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TagCondition {
    Any,
    Tags(Vec<RequestTag>),
}

impl TagCondition {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "*" {
            return Some(TagCondition::Any);
        }

        let tags: Vec<RequestTag> = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                let (weak, t) = match t.strip_prefix("W/") {
                    Some(rest) => (true, rest),
                    None => (false, t),
                };
                RequestTag {
                    opaque: t.trim_matches('"').to_string(),
                    weak,
                }
            })
            .collect();

        (!tags.is_empty()).then_some(TagCondition::Tags(tags))
    }

    /// Strong comparison: weak request tags never match.
    fn matches(&self, etag: &EntityTag) -> bool {
        match self {
            TagCondition::Any => true,
            TagCondition::Tags(tags) => tags
                .iter()
                .any(|tag| !tag.weak && tag.opaque == etag.opaque()),
        }
    }
}

/// The conditional request headers of a fetch. Unparseable values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    if_match: Option<TagCondition>,
    if_none_match: Option<TagCondition>,
    if_modified_since: Option<SystemTime>,
    if_unmodified_since: Option<SystemTime>,
}

/// Outcome of evaluating [`Preconditions`] against [`Validators`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// The client copy is current: 304, no body.
    Fresh,
    /// Send the body: 200.
    Serve,
    /// `If-Match` / `If-Unmodified-Since` failed: 412.
    PreconditionFailed,
}

impl Preconditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn if_match(mut self, raw: &str) -> Self {
        self.if_match = TagCondition::parse(raw);
        self
    }

    pub fn if_none_match(mut self, raw: &str) -> Self {
        self.if_none_match = TagCondition::parse(raw);
        self
    }

    pub fn if_modified_since(mut self, raw: &str) -> Self {
        self.if_modified_since = httpdate::parse_http_date(raw.trim()).ok();
        self
    }

    pub fn if_unmodified_since(mut self, raw: &str) -> Self {
        self.if_unmodified_since = httpdate::parse_http_date(raw.trim()).ok();
        self
    }

    /// RFC 7232 §6 evaluation order, for a `GET`.
    pub fn evaluate(&self, validators: &Validators) -> FetchDecision {
        match &self.if_match {
            Some(condition) if !condition.matches(&validators.etag) => {
                return FetchDecision::PreconditionFailed;
            }
            Some(_) => {}
            None => {
                if let Some(since) = self.if_unmodified_since
                    && validators.modified_after(since)
                {
                    return FetchDecision::PreconditionFailed;
                }
            }
        }

        match &self.if_none_match {
            Some(condition) if condition.matches(&validators.etag) => FetchDecision::Fresh,
            Some(_) => FetchDecision::Serve,
            None => match self.if_modified_since {
                Some(since) if !validators.modified_after(since) => FetchDecision::Fresh,
                _ => FetchDecision::Serve,
            },
        }
    }
}
