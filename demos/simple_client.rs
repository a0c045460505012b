//! # Simple Client Example
//!
//! Deploys a jar and its pom, lists the version directory, and downloads the jar
//! back from a running `simple_server`.
//!
//! ## Usage
//!
//! ```sh
//! cargo run --example simple_client --features "client"
//! ```

use rookery::prelude::*;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = RookeryClient::new(
        "http://localhost:3000",
        Some(Credentials::new("deployer", "secret")),
    );

    let version_dir = "org/acme/widget/1.0.0/";
    client
        .upload(
            &format!("{version_dir}widget-1.0.0.jar"),
            b"not really a jar".to_vec(),
            Some("application/java-archive"),
        )
        .await?;
    client
        .upload(
            &format!("{version_dir}widget-1.0.0.pom"),
            b"<project/>".to_vec(),
            Some("text/xml"),
        )
        .await?;

    let listing = client.list(version_dir).await?;
    for entry in &listing.entries {
        println!("{:>8}  {}", entry.size, entry.name);
    }

    // Download the jar to a different location
    let output_path = Path::new("downloaded-widget.jar");
    client
        .download_to(&format!("{version_dir}widget-1.0.0.jar"), output_path)
        .await?;

    println!("Jar downloaded to {}!", output_path.display());
    Ok(())
}
