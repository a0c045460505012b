use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{HeaderValue, Method, header::CACHE_CONTROL},
    middleware::Next,
    response::Response,
};
use rookery_core::prelude::*;

/// Marks which route family produced a response, so the matching policy applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheScope {
    List,
    Fetch,
}

/// Cache-Control values resolved once when the router is built.
#[derive(Clone, Debug, Default)]
pub struct CacheHeaders {
    pub list: Option<HeaderValue>,
    pub fetch: Option<HeaderValue>,
}

impl CacheHeaders {
    pub fn resolve(
        list: &CachePolicy,
        fetch: &CachePolicy,
        properties: &Properties,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            list: header_value(list, properties)?,
            fetch: header_value(fetch, properties)?,
        })
    }

    pub fn for_scope(&self, scope: CacheScope) -> Option<&HeaderValue> {
        match scope {
            CacheScope::List => self.list.as_ref(),
            CacheScope::Fetch => self.fetch.as_ref(),
        }
    }
}

fn header_value(
    policy: &CachePolicy,
    properties: &Properties,
) -> Result<Option<HeaderValue>, ConfigError> {
    let Some(directive) = policy.resolve(properties)? else {
        return Ok(None);
    };

    let rendered = directive.to_string();
    if rendered.is_empty() {
        return Ok(None);
    }

    HeaderValue::from_str(&rendered)
        .map(Some)
        .map_err(|e| ConfigError::CacheControl {
            property: format!("{policy:?}"),
            reason: e.to_string(),
        })
}

/// Adds `Cache-Control` to successful `GET` responses with a body, unless a
/// handler already set one.
pub async fn apply_cache_control(
    State(headers): State<CacheHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let is_get = request.method() == Method::GET;
    let mut response = next.run(request).await;

    if !is_get
        || !response.status().is_success()
        || response.headers().contains_key(CACHE_CONTROL)
        || response.body().size_hint().exact() == Some(0)
    {
        return response;
    }

    let value = response
        .extensions()
        .get::<CacheScope>()
        .and_then(|scope| headers.for_scope(*scope))
        .cloned();

    if let Some(value) = value {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
    response
}
