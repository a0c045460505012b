//! # Rookery credentials-file auth
//!
//! Resolves HTTP Basic credentials against a flat credentials file:
//!
//! ```text
//! # username:password:roles
//! deployer:s3cret:write,read
//! ci:token:read
//! *:*:list
//! ```
//!
//! The `*:*` entry, if present, is the anonymous identity used for requests
//! without an `Authorization` header.
//!
//! ## Usage
//!
//! ```no_run
//! use rookery_auth_file::CredentialStore;
//!
//! let auth = CredentialStore::from_file("users.txt").unwrap();
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rookery_core::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const BASIC: &str = "basic";
const ANONYMOUS: &str = "*";

/// Lookup key for a username/password pair. Only a digest of the pair is kept.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CredentialToken(String);

impl CredentialToken {
    pub fn new(username: &str, password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(username.as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The wildcard pair `*:*` that stands for unauthenticated access.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS, ANONYMOUS)
    }

    /// Decodes the credentials part of a `Basic` header: base64 of `user:password`.
    pub fn from_basic_payload(payload: &str) -> Option<Self> {
        let decoded = STANDARD.decode(payload.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }
}

impl fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CredentialToken")
            .field(&"<redacted>")
            .finish()
    }
}

/// Parses one line of a credentials file.
///
/// `Ok(None)` for blank and comment lines.
pub fn parse_line(
    source_name: &str,
    line_no: usize,
    line: &str,
) -> Result<Option<(CredentialToken, Identity)>, MalformedCredentialLine> {
    if line.trim().is_empty() || line.trim_start().starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(':').collect();
    let &[username, password, roles] = fields.as_slice() else {
        return Err(MalformedCredentialLine {
            source_name: source_name.to_string(),
            line: line_no,
        });
    };

    let roles = roles
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty());

    Ok(Some((
        CredentialToken::new(username, password),
        Identity::new(username, roles),
    )))
}

/// Immutable credential index shared by every request.
#[derive(Clone, Default)]
pub struct CredentialStore {
    users: Arc<HashMap<CredentialToken, Identity>>,
}

impl CredentialStore {
    /// Loads a credentials file. Only an unreadable file is an error; bad lines
    /// are logged and skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Credentials {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::parse(&path.display().to_string(), &contents);
        info!(
            "Loaded {} credential(s) from {}",
            store.users.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn parse(source_name: &str, contents: &str) -> Self {
        let mut users = HashMap::new();

        for (line_no, line) in contents.lines().enumerate() {
            match parse_line(source_name, line_no, line) {
                Ok(Some((token, identity))) => register(&mut users, token, identity),
                Ok(None) => {}
                Err(e) => warn!("{e}"),
            }
        }

        Self {
            users: Arc::new(users),
        }
    }

    /// Registers an anonymous identity unless the file already defines `*:*`.
    pub fn with_anonymous<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        register(
            Arc::make_mut(&mut self.users),
            CredentialToken::anonymous(),
            Identity::new("anonymous", roles),
        );
        self
    }

    pub fn lookup(&self, token: &CredentialToken) -> Option<&Identity> {
        self.users.get(token)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// First registration wins; a later line with the same credentials would
/// otherwise silently change that user's roles.
fn register(
    users: &mut HashMap<CredentialToken, Identity>,
    token: CredentialToken,
    identity: Identity,
) {
    match users.entry(token) {
        Entry::Occupied(existing) => warn!(
            "Ignoring duplicate credentials for '{}', keeping roles of '{}'",
            identity.name,
            existing.get().name
        ),
        Entry::Vacant(slot) => {
            slot.insert(identity);
        }
    }
}

impl AuthProvider for CredentialStore {
    fn authenticate(&self, authorization: Option<&str>) -> SecurityContext {
        let Some(header) = authorization else {
            return self
                .lookup(&CredentialToken::anonymous())
                .cloned()
                .map(SecurityContext::Anonymous)
                .unwrap_or_default();
        };

        let payload = header
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BASIC))
            .map(|(_, payload)| payload);

        match payload
            .and_then(CredentialToken::from_basic_payload)
            .and_then(|token| self.lookup(&token))
        {
            Some(identity) => SecurityContext::Authenticated(identity.clone()),
            None => {
                debug!("Authorization header did not resolve to an identity");
                SecurityContext::None
            }
        }
    }
}
