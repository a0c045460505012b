use opendal::{Operator, services::Fs};
use rookery::prelude::*;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Providers
    // This example uses the FileSystem backend, but you can easily swap this
    // for S3, GCS, Azure, etc., by changing the Builder (e.g., opendal::services::S3).
    let root_path =
        env::var("ROOKERY_FS_ROOT").unwrap_or_else(|_| "/tmp/rookery_opendal".to_string());
    let op = Operator::new(Fs::default().root(&root_path))?.finish();

    let storage = OpendalStorage::new(op);
    let auth = CredentialStore::from_file(DEFAULT_CREDENTIALS_LOCATION)?;

    // Build
    let app = RookeryServer::new(RookeryServerConfig::default()).build(storage, auth)?;

    // Serve
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    println!("Server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
