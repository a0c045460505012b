use anyhow::Context;
use aws_config::BehaviorVersion;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rookery_auth_file::CredentialStore;
use rookery_client::{Credentials, RookeryClient};
use rookery_core::prelude::*;
use rookery_fs::FileSystemStorage;
use rookery_s3::S3Storage;
use rookery_server::{RookeryServer, RookeryServerConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "rookery")]
#[command(about = "Maven-style artifact repository server and client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository URL
    #[arg(short, long, global = true, default_value = "http://localhost:3000")]
    url: String,

    #[arg(long, global = true, env = "ROOKERY_USER")]
    user: Option<String>,

    #[arg(long, global = true, env = "ROOKERY_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the repository server
    Serve(ServeArgs),
    /// List a directory
    Ls {
        #[arg(default_value = "")]
        dir: String,
    },
    /// Download an artifact
    Get {
        path: String,
        /// Defaults to the artifact's file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a single file
    Put { file: PathBuf, path: String },
    /// Upload a local Maven repository tree
    Deploy {
        /// The directory to walk (e.g., "~/.m2/repository/org/acme")
        #[arg(long)]
        dir: PathBuf,

        /// Remote prefix the tree is uploaded under
        #[arg(long, default_value = "")]
        to: String,
    },
    /// Recursively delete a directory
    Rm { dir: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StorageKind {
    Fs,
    S3,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, value_enum, env = "ROOKERY_STORAGE", default_value = "fs")]
    storage: StorageKind,

    /// Root directory for the filesystem backend
    #[arg(long, env = "ROOKERY_ROOT", default_value = "./rookery_data")]
    root: PathBuf,

    /// Bucket for the S3 backend
    #[arg(long, env = "ROOKERY_BUCKET")]
    bucket: Option<String>,

    /// Key prefix inside the bucket
    #[arg(long, env = "ROOKERY_PREFIX")]
    prefix: Option<String>,

    /// Redirect downloads to presigned URLs valid for this many seconds
    #[arg(long, env = "ROOKERY_PRESIGN_SECS")]
    presign_secs: Option<u64>,

    #[arg(long, env = "ROOKERY_CREDENTIALS", default_value = DEFAULT_CREDENTIALS_LOCATION)]
    credentials: PathBuf,

    #[arg(long, env = "ROOKERY_CACHE_CONTROL_FETCH")]
    cache_control_fetch: Option<String>,

    #[arg(long, env = "ROOKERY_CACHE_CONTROL_LIST")]
    cache_control_list: Option<String>,

    /// Reject redeploying existing artifacts
    #[arg(long, env = "ROOKERY_UNIQUE_ARTIFACT")]
    unique_artifact: bool,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

impl ServeArgs {
    fn properties(&self) -> Properties {
        let mut properties = Properties::new().with(
            PROPERTY_CREDENTIALS_LOCATION,
            self.credentials.to_string_lossy(),
        );
        let optional = [
            (PROPERTY_BUCKET_NAME, &self.bucket),
            (PROPERTY_CACHE_CONTROL_FETCH, &self.cache_control_fetch),
            (PROPERTY_CACHE_CONTROL_LIST, &self.cache_control_list),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                properties.set(name, value.as_str());
            }
        }
        properties.set(PROPERTY_UNIQUE_ARTIFACT, self.unique_artifact.to_string());
        properties
    }
}

async fn serve<S: StorageBackend>(args: &ServeArgs, storage: S) -> anyhow::Result<()> {
    let auth = CredentialStore::from_file(&args.credentials)?;
    if auth.is_empty() {
        warn!(
            path = %args.credentials.display(),
            "no credentials loaded, every request will be rejected"
        );
    }

    let app = RookeryServer::new(RookeryServerConfig {
        unique_artifacts: args.unique_artifact,
        properties: args.properties(),
        ..Default::default()
    })
    .build(storage, auth)?;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    match args.storage {
        StorageKind::Fs => {
            let storage = FileSystemStorage::new(&args.root);
            serve(&args, storage).await
        }
        StorageKind::S3 => {
            let bucket = args
                .bucket
                .clone()
                .context("--bucket (or ROOKERY_BUCKET) is required for the s3 backend")?;
            let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
            let client = aws_sdk_s3::Client::new(&aws_config);

            let mut storage = S3Storage::new(client, bucket, args.prefix.clone());
            if let Some(secs) = args.presign_secs {
                storage = storage.with_presigned_downloads(Duration::from_secs(secs));
            }
            serve(&args, storage).await
        }
    }
}

/// Files under `dir` as (local path, remote key) pairs. Repository metadata
/// goes last so it never points at artifacts that are not uploaded yet.
fn deploy_plan(dir: &Path, to: &str) -> anyhow::Result<Vec<(PathBuf, String)>> {
    let prefix = match to.trim_matches('/') {
        "" => String::new(),
        p => format!("{p}/"),
    };

    let mut plan = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative_path = entry
            .path()
            .strip_prefix(dir)?
            .to_string_lossy()
            .replace('\\', "/");
        plan.push((entry.path().to_path_buf(), format!("{prefix}{relative_path}")));
    }

    plan.sort_by(|(_, a), (_, b)| is_overwritable(a).cmp(&is_overwritable(b)).then(a.cmp(b)));
    Ok(plan)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let credentials = cli
        .user
        .clone()
        .map(|user| Credentials::new(user, cli.password.clone().unwrap_or_default()));
    let client = RookeryClient::new(cli.url.clone(), credentials);

    match cli.command {
        Commands::Serve(args) => run_server(args).await?,
        Commands::Ls { dir } => {
            let listing = client.list(&dir).await?;
            println!("{}", listing.request_path);
            for entry in listing.entries {
                println!(
                    "{:>10}  {:19}  {}",
                    entry.size,
                    entry.modified.as_deref().unwrap_or("-"),
                    entry.name
                );
            }
        }
        Commands::Get { path, output } => {
            let output = match output {
                Some(output) => output,
                None => PathBuf::from(path.rsplit('/').next().unwrap_or(&path)),
            };
            let written = client.download_to(&path, &output).await?;
            println!("Downloaded {path} to {} ({written} bytes)", output.display());
        }
        Commands::Put { file, path } => {
            client.upload_file(&file, &path).await?;
            println!("Uploaded {} to {path}", file.display());
        }
        Commands::Deploy { dir, to } => {
            let plan = deploy_plan(&dir, &to)?;
            println!("Deploying {} files from {dir:?}...", plan.len());

            for (local, remote) in &plan {
                println!("Uploading: {remote}");
                client.upload_file(local, remote).await?;
            }

            println!("Deployed {} files.", plan.len());
        }
        Commands::Rm { dir } => {
            let deleted = client.delete_dir(&dir).await?;
            println!("Deleted {deleted} objects under {dir}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_plan_uploads_metadata_last() {
        let dir = tempfile::TempDir::new().unwrap();
        let lib = dir.path().join("org/acme/lib");
        std::fs::create_dir_all(lib.join("1.0")).unwrap();
        std::fs::write(lib.join("maven-metadata.xml"), "<metadata/>").unwrap();
        std::fs::write(lib.join("maven-metadata.xml.sha1"), "abc").unwrap();
        std::fs::write(lib.join("1.0/lib-1.0.jar"), "jar").unwrap();
        std::fs::write(lib.join("1.0/lib-1.0.pom"), "pom").unwrap();

        let plan = deploy_plan(dir.path(), "/releases/").unwrap();
        let keys: Vec<_> = plan.iter().map(|(_, key)| key.as_str()).collect();

        assert_eq!(
            keys,
            [
                "releases/org/acme/lib/1.0/lib-1.0.jar",
                "releases/org/acme/lib/1.0/lib-1.0.pom",
                "releases/org/acme/lib/maven-metadata.xml",
                "releases/org/acme/lib/maven-metadata.xml.sha1",
            ]
        );
    }

    #[test]
    fn serve_args_become_properties() {
        let cli = Cli::parse_from([
            "rookery",
            "serve",
            "--cache-control-fetch",
            "max-age=60",
            "--unique-artifact",
        ]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let properties = args.properties();
        assert_eq!(properties.get(PROPERTY_CACHE_CONTROL_FETCH), Some("max-age=60"));
        assert_eq!(properties.get(PROPERTY_CACHE_CONTROL_LIST), None);
        assert_eq!(properties.get(PROPERTY_UNIQUE_ARTIFACT), Some("true"));
        assert_eq!(
            properties.get(PROPERTY_CREDENTIALS_LOCATION),
            Some(DEFAULT_CREDENTIALS_LOCATION)
        );
    }
}
