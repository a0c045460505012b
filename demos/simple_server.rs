//! # Simple Server Example
//!
//! Serves a repository from `./rookery_data` with users from `users.txt`, e.g.:
//!
//! ```text
//! deployer:secret:write
//! ci:ci-pass:read
//! *:*:list
//! ```
//!
//! ## Usage
//!
//! ```sh
//! cargo run --example simple_server --features "server fs file_auth"
//! ```

use rookery::prelude::*;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Providers
    let storage = FileSystemStorage::new("./rookery_data");
    let auth = CredentialStore::from_file(DEFAULT_CREDENTIALS_LOCATION)?;

    // Build App
    let app = RookeryServer::new(RookeryServerConfig {
        properties: Properties::new().with(PROPERTY_CACHE_CONTROL_LIST, "no-cache"),
        ..Default::default()
    })
    .build(storage, auth)?;

    // Serve
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    println!("Server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
