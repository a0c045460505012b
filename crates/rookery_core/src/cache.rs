//! `Cache-Control` directives and per-route cache policies.

use crate::config::Properties;
use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDirective {
    pub max_age: Option<u64>,
    pub s_max_age: Option<u64>,
    pub private: bool,
    pub no_cache: bool,
    pub no_store: bool,
    pub no_transform: bool,
    pub must_revalidate: bool,
    pub proxy_revalidate: bool,
    /// Directives without a dedicated field (`public`, `immutable`, ...), in input order.
    pub extensions: Vec<(String, Option<String>)>,
}

impl FromStr for CacheDirective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut directive = CacheDirective::default();

        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (name, value) = match token.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
                None => (token, None),
            };

            let seconds = |value: Option<&str>| -> Result<u64, String> {
                value
                    .ok_or_else(|| format!("`{name}` requires a value"))?
                    .parse::<u64>()
                    .map_err(|e| format!("`{name}`: {e}"))
            };

            match name.to_ascii_lowercase().as_str() {
                "max-age" => directive.max_age = Some(seconds(value)?),
                "s-maxage" => directive.s_max_age = Some(seconds(value)?),
                "private" => directive.private = true,
                "no-cache" => directive.no_cache = true,
                "no-store" => directive.no_store = true,
                "no-transform" => directive.no_transform = true,
                "must-revalidate" => directive.must_revalidate = true,
                "proxy-revalidate" => directive.proxy_revalidate = true,
                _ => directive
                    .extensions
                    .push((name.to_string(), value.map(str::to_string))),
            }
        }

        Ok(directive)
    }
}

/// Canonical serialization: flags first, then ages, then extensions.
impl fmt::Display for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();

        let flags = [
            (self.private, "private"),
            (self.no_cache, "no-cache"),
            (self.no_store, "no-store"),
            (self.no_transform, "no-transform"),
            (self.must_revalidate, "must-revalidate"),
            (self.proxy_revalidate, "proxy-revalidate"),
        ];
        parts.extend(
            flags
                .iter()
                .filter(|(set, _)| *set)
                .map(|(_, name)| name.to_string()),
        );

        if let Some(max_age) = self.max_age {
            parts.push(format!("max-age={max_age}"));
        }
        if let Some(s_max_age) = self.s_max_age {
            parts.push(format!("s-maxage={s_max_age}"));
        }

        for (name, value) in &self.extensions {
            match value {
                Some(value) if value.contains([' ', ',', ';']) => {
                    parts.push(format!("{name}=\"{value}\""))
                }
                Some(value) => parts.push(format!("{name}={value}")),
                None => parts.push(name.clone()),
            }
        }

        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeUnit {
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn to_seconds(self, value: u64) -> u64 {
        let factor = match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 60 * 60,
            TimeUnit::Days => 24 * 60 * 60,
        };
        value.saturating_mul(factor)
    }
}

/// Directive values declared directly on a route.
///
/// Negative ages leave the directive out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineCachePolicy {
    pub max_age: i64,
    pub s_max_age: i64,
    pub private: bool,
    pub no_cache: bool,
    pub no_store: bool,
    pub no_transform: bool,
    pub must_revalidate: bool,
    pub unit: TimeUnit,
}

impl Default for InlineCachePolicy {
    fn default() -> Self {
        Self {
            max_age: -1,
            s_max_age: -1,
            private: false,
            no_cache: false,
            no_store: false,
            no_transform: false,
            must_revalidate: false,
            unit: TimeUnit::Seconds,
        }
    }
}

impl InlineCachePolicy {
    pub fn to_directive(&self) -> CacheDirective {
        let age = |value: i64| u64::try_from(value).ok().map(|v| self.unit.to_seconds(v));

        CacheDirective {
            max_age: age(self.max_age),
            s_max_age: age(self.s_max_age),
            private: self.private,
            no_cache: self.no_cache,
            no_store: self.no_store,
            no_transform: self.no_transform,
            must_revalidate: self.must_revalidate,
            ..Default::default()
        }
    }
}

/// How a route obtains its `Cache-Control` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CachePolicy {
    #[default]
    None,
    Inline(InlineCachePolicy),
    /// Read from the named runtime property; unset means no header.
    Property(String),
}

impl CachePolicy {
    pub fn property(name: impl Into<String>) -> Self {
        CachePolicy::Property(name.into())
    }

    /// Resolves the policy once, when the routes are built.
    pub fn resolve(&self, properties: &Properties) -> Result<Option<CacheDirective>, ConfigError> {
        match self {
            CachePolicy::None => Ok(None),
            CachePolicy::Inline(inline) => Ok(Some(inline.to_directive())),
            CachePolicy::Property(name) => properties
                .get(name)
                .map(|raw| {
                    raw.parse::<CacheDirective>()
                        .map_err(|reason| ConfigError::CacheControl {
                            property: name.clone(),
                            reason,
                        })
                })
                .transpose(),
        }
    }
}
