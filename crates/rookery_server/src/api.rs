use crate::auth::{FETCH_ROLES, LIST_ROLES, RequestIdentity, WRITE_ROLES};
use crate::cache::CacheScope;
use crate::state::AppState;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{
            CONTENT_TYPE, ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE,
            LAST_MODIFIED, WWW_AUTHENTICATE,
        },
    },
    response::{IntoResponse, Redirect, Response},
};
use futures::TryStreamExt;
use rookery_core::prelude::*;
use tracing::{error, info};

const REALM: &str = "Basic realm=\"rookery\"";

pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn write_status(err: &WriteError) -> StatusCode {
    match err {
        WriteError::Conflict(_) => StatusCode::CONFLICT,
        WriteError::DirectoryPath(_) => StatusCode::BAD_REQUEST,
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<StorageError>() {
            return storage_status(err);
        }
        if let Some(err) = self.0.downcast_ref::<AuthError>() {
            return match err {
                AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            };
        }
        if let Some(err) = self.0.downcast_ref::<WriteError>() {
            return write_status(err);
        }
        match self.0.downcast_ref::<GuardError>() {
            Some(GuardError::Write(err)) => write_status(err),
            Some(GuardError::Storage(err)) => storage_status(err),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {:#}", self.0);
        }

        let mut response = (status, self.0.to_string()).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
        }
        response
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn preconditions(headers: &HeaderMap) -> Preconditions {
    let mut conditions = Preconditions::new();
    if let Some(raw) = header(headers, &IF_MATCH) {
        conditions = conditions.if_match(raw);
    }
    if let Some(raw) = header(headers, &IF_NONE_MATCH) {
        conditions = conditions.if_none_match(raw);
    }
    if let Some(raw) = header(headers, &IF_MODIFIED_SINCE) {
        conditions = conditions.if_modified_since(raw);
    }
    if let Some(raw) = header(headers, &IF_UNMODIFIED_SINCE) {
        conditions = conditions.if_unmodified_since(raw);
    }
    conditions
}

fn validator_headers(validators: &Validators) -> Result<[(HeaderName, HeaderValue); 2], ApiError> {
    Ok([
        (ETAG, HeaderValue::from_str(&validators.etag.to_string())?),
        (
            LAST_MODIFIED,
            HeaderValue::from_str(&validators.http_last_modified())?,
        ),
    ])
}

/// The stored content type, on both full and not-modified responses.
fn insert_content_type(response: &mut Response, validators: &Validators) {
    if let Some(content_type) = validators
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
    {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
}

async fn list_directory<S: StorageBackend, A: AuthProvider>(
    state: &AppState<S, A>,
    identity: &SecurityContext,
    prefix: &str,
) -> Result<Response, ApiError> {
    identity.authorize(&LIST_ROLES)?;

    let stream = state.storage.list(prefix, false).await?;
    let directory = Directory::collect(prefix, stream).await?;

    let mut response = Json(directory).into_response();
    response.extensions_mut().insert(CacheScope::List);
    Ok(response)
}

async fn fetch_artifact<S: StorageBackend, A: AuthProvider>(
    state: &AppState<S, A>,
    identity: &SecurityContext,
    key: &str,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    identity.authorize(&FETCH_ROLES)?;

    let metadata = state
        .storage
        .metadata(key)
        .await?
        .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
    let validators = Validators::from(metadata);

    match preconditions(headers).evaluate(&validators) {
        FetchDecision::PreconditionFailed => {
            return Ok(StatusCode::PRECONDITION_FAILED.into_response());
        }
        FetchDecision::Fresh => {
            let headers = validator_headers(&validators)?;
            let mut response = (StatusCode::NOT_MODIFIED, headers).into_response();
            insert_content_type(&mut response, &validators);
            return Ok(response);
        }
        FetchDecision::Serve => {}
    }

    if let Some(url) = state.storage.get_download_url(key).await? {
        return Ok(Redirect::temporary(&url).into_response());
    }

    let body = state.storage.read_stream(key).await?;
    let mut response = (
        validator_headers(&validators)?,
        Body::from_stream(body.map_err(std::io::Error::other)),
    )
        .into_response();

    insert_content_type(&mut response, &validators);
    response.extensions_mut().insert(CacheScope::Fetch);
    Ok(response)
}

/// GET /
pub async fn list_root<S: StorageBackend, A: AuthProvider>(
    State(state): State<AppState<S, A>>,
    RequestIdentity(identity): RequestIdentity,
) -> Result<Response, ApiError> {
    list_directory(&state, &identity, "").await
}

/// GET /{dir}/ lists, GET /{file} downloads.
pub async fn get_path<S: StorageBackend, A: AuthProvider>(
    State(state): State<AppState<S, A>>,
    RequestIdentity(identity): RequestIdentity,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if path.ends_with('/') {
        list_directory(&state, &identity, &path).await
    } else {
        fetch_artifact(&state, &identity, &path, &headers).await
    }
}

/// PUT /{file}
pub async fn put_artifact<S: StorageBackend, A: AuthProvider>(
    State(state): State<AppState<S, A>>,
    RequestIdentity(identity): RequestIdentity,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let user = identity.authorize(&WRITE_ROLES)?;
    state.guard.check(&state.storage, &path).await?;

    let size = body.len();
    state
        .storage
        .write(&path, body, header(&headers, &CONTENT_TYPE))
        .await?;

    info!(key = %path, size, user = %user.name, "artifact stored");
    Ok(StatusCode::ACCEPTED)
}

/// DELETE /{dir}/
///
/// Deletes every object below the prefix, one at a time, and returns how many
/// were removed.
pub async fn delete_directory<S: StorageBackend, A: AuthProvider>(
    State(state): State<AppState<S, A>>,
    RequestIdentity(identity): RequestIdentity,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = identity.authorize(&WRITE_ROLES)?;
    if !path.ends_with('/') {
        return Ok((
            StatusCode::METHOD_NOT_ALLOWED,
            "Only directories can be deleted",
        )
            .into_response());
    }

    let mut objects = state.storage.list(&path, true).await?;
    let mut deleted: u64 = 0;
    while let Some(object) = objects.try_next().await.inspect_err(|e| {
        error!(prefix = %path, deleted, "listing failed during delete: {e}");
    })? {
        if let Err(e) = state.storage.delete(&object.key).await {
            error!(prefix = %path, key = %object.key, deleted, "delete stopped part-way: {e}");
            return Err(e.into());
        }
        deleted += 1;
    }

    info!(prefix = %path, deleted, user = %user.name, "directory deleted");
    Ok(deleted.to_string().into_response())
}
