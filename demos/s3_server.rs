use aws_config::BehaviorVersion;
use rookery::prelude::*;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Config
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);

    let bucket_name = env::var("ROOKERY_BUCKET")?;
    let credentials = env::var("ROOKERY_CREDENTIALS")
        .unwrap_or_else(|_| DEFAULT_CREDENTIALS_LOCATION.to_string());

    // Providers
    let storage = S3Storage::new(s3_client, bucket_name, Some("maven/".to_string()))
        .with_presigned_downloads(Duration::from_secs(300));
    let auth = CredentialStore::from_file(credentials)?;

    // Release artifacts never change; metadata is always revalidated.
    let app = RookeryServer::new(RookeryServerConfig {
        unique_artifacts: true,
        properties: Properties::new()
            .with(PROPERTY_CACHE_CONTROL_FETCH, "public, max-age=31536000")
            .with(PROPERTY_CACHE_CONTROL_LIST, "no-cache"),
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
