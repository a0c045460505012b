use crate::{api, prelude::*};
use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
use rookery_core::prelude::*;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The builder for the Rookery Server.
#[derive(Clone, Debug, Default)]
pub struct RookeryServer {
    config: RookeryServerConfig,
}

impl RookeryServer {
    pub fn new(config: RookeryServerConfig) -> Self {
        Self { config }
    }
}

#[derive(Clone, Debug)]
pub struct RookeryServerConfig {
    /// Reject redeploying an artifact that already exists.
    ///
    /// Defaults to `false`. Maven metadata files are always overwritable.
    pub unique_artifacts: bool,
    /// Runtime properties consulted by property-backed cache policies.
    pub properties: Properties,
    /// Cache policy for directory listings.
    ///
    /// Defaults to the `repository.cache-control.list` property.
    pub list_cache: CachePolicy,
    /// Cache policy for artifact downloads.
    ///
    /// Defaults to the `repository.cache-control.fetch` property.
    pub fetch_cache: CachePolicy,
}

impl Default for RookeryServerConfig {
    fn default() -> Self {
        Self {
            unique_artifacts: false,
            properties: Properties::default(),
            list_cache: CachePolicy::property(PROPERTY_CACHE_CONTROL_LIST),
            fetch_cache: CachePolicy::property(PROPERTY_CACHE_CONTROL_FETCH),
        }
    }
}

impl RookeryServer {
    /// Builds the router. Cache policies are resolved here, so a bad
    /// `Cache-Control` property fails startup rather than a request.
    pub fn build<S: StorageBackend, A: AuthProvider>(
        self,
        storage: S,
        auth: A,
    ) -> Result<Router, ConfigError> {
        let RookeryServerConfig {
            unique_artifacts,
            properties,
            list_cache,
            fetch_cache,
        } = self.config;

        let cache_headers = CacheHeaders::resolve(&list_cache, &fetch_cache, &properties)?;
        info!(
            unique_artifacts,
            list = ?cache_headers.list,
            fetch = ?cache_headers.fetch,
            "repository routes configured"
        );

        let state = AppState {
            storage,
            auth,
            guard: WriteGuard::new(unique_artifacts),
        };

        Ok(Router::new()
            .route("/health", get(|| async { "OK" }))
            .route("/", get(api::list_root))
            .route(
                "/{*path}",
                get(api::get_path)
                    .put(api::put_artifact)
                    .delete(api::delete_directory),
            )
            .layer(middleware::from_fn_with_state(
                cache_headers,
                apply_cache_control,
            ))
            .layer(DefaultBodyLimit::disable())
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }
}
