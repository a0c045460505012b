use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rookery_core::listing::Directory;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RookeryClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned error {0}: {1}")]
    ServerError(StatusCode, String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, RookeryClientError>;

/// Username and password sent as HTTP Basic credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Clone)]
pub struct RookeryClient {
    base_url: String,
    client: Client,
    credentials: Option<Credentials>,
}

impl RookeryClient {
    pub fn new(base_url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_request(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.username, Some(&c.password)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.auth_request(builder).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RookeryClientError::ServerError(status, text));
        }

        Ok(response)
    }

    /// Lists a directory. `""` or `"/"` is the repository root.
    pub async fn list(&self, dir: &str) -> Result<Directory> {
        let dir = match dir.trim_start_matches('/') {
            "" => String::new(),
            d if d.ends_with('/') => d.to_string(),
            d => format!("{d}/"),
        };

        let response = self.send(self.client.get(self.url(&dir))).await?;
        response
            .json()
            .await
            .map_err(|e| RookeryClientError::Validation(format!("Failed to parse listing: {e}")))
    }

    pub async fn download(&self, path: &str) -> Result<Bytes> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Ok(response.bytes().await?)
    }

    /// Streams an artifact into a local file. Returns the number of bytes written.
    pub async fn download_to(&self, path: &str, local: &Path) -> Result<u64> {
        let response = self.send(self.client.get(self.url(path))).await?;

        let mut file = File::create(local).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    pub async fn upload(
        &self,
        path: &str,
        body: impl Into<Bytes>,
        content_type: Option<&str>,
    ) -> Result<()> {
        if path.is_empty() || path.ends_with('/') {
            return Err(RookeryClientError::Validation(format!(
                "'{path}' is a directory path"
            )));
        }

        let mut builder = self.client.put(self.url(path)).body(body.into());
        if let Some(content_type) = content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        self.send(builder).await?;
        Ok(())
    }

    /// Uploads a local file, guessing its content type from the extension.
    pub async fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        let data = tokio::fs::read(local).await?;
        let content_type = mime_guess::from_path(local).first_raw();
        self.upload(remote, data, content_type).await
    }

    /// Recursively deletes a directory. Returns how many objects were removed.
    pub async fn delete_dir(&self, dir: &str) -> Result<u64> {
        let dir = dir.trim_start_matches('/');
        if !dir.ends_with('/') {
            return Err(RookeryClientError::Validation(format!(
                "'{dir}' is not a directory path"
            )));
        }

        let response = self.send(self.client.delete(self.url(dir))).await?;
        let text = response.text().await?;
        text.trim()
            .parse()
            .map_err(|_| RookeryClientError::Validation(format!("Unexpected delete count: {text}")))
    }
}
