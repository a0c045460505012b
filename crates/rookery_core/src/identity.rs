use crate::error::AuthError;
use std::collections::BTreeSet;

pub const ROLE_WRITE: &str = "write";
pub const ROLE_READ: &str = "read";
pub const ROLE_LIST: &str = "list";

/// A principal and the roles granted to it by the credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub roles: BTreeSet<String>,
}

impl Identity {
    pub fn new<I, R>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_any_role(&self, required: &[&str]) -> bool {
        required.iter().any(|role| self.roles.contains(*role))
    }
}

/// Who is making the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SecurityContext {
    /// No usable credentials were presented.
    #[default]
    None,
    /// No `Authorization` header, resolved to the registered anonymous identity.
    Anonymous(Identity),
    /// A `Basic` header that matched a registered credential.
    Authenticated(Identity),
}

impl SecurityContext {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SecurityContext::None => None,
            SecurityContext::Anonymous(identity) | SecurityContext::Authenticated(identity) => {
                Some(identity)
            }
        }
    }

    /// Grants access when the identity holds at least one of `required`.
    pub fn authorize(&self, required: &[&str]) -> Result<&Identity, AuthError> {
        let identity = self.identity().ok_or(AuthError::Unauthorized)?;
        if identity.has_any_role(required) {
            Ok(identity)
        } else {
            Err(AuthError::Forbidden(format!(
                "'{}' needs one of the roles: {}",
                identity.name,
                required.join(", ")
            )))
        }
    }
}
