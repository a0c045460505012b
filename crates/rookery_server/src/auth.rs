use crate::state::AppState;
use rookery_core::prelude::*;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::convert::Infallible;

/// Roles accepted by the listing routes.
pub const LIST_ROLES: [&str; 3] = [ROLE_WRITE, ROLE_READ, ROLE_LIST];
/// Roles accepted by artifact downloads.
pub const FETCH_ROLES: [&str; 2] = [ROLE_WRITE, ROLE_READ];
/// Roles accepted by uploads and deletes.
pub const WRITE_ROLES: [&str; 1] = [ROLE_WRITE];

/// The caller of the current request, resolved from its `Authorization` header.
///
/// Extraction never fails; handlers decide what the context may do via
/// [`SecurityContext::authorize`].
#[derive(Clone, Debug)]
pub struct RequestIdentity(pub SecurityContext);

impl<S, A> FromRequestParts<AppState<S, A>> for RequestIdentity
where
    S: StorageBackend,
    A: AuthProvider,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, A>,
    ) -> Result<Self, Self::Rejection> {
        // A header that is not valid UTF-8 is present but unusable.
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());

        Ok(RequestIdentity(state.auth.authenticate(header)))
    }
}
