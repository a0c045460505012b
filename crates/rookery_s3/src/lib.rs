use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use rookery_core::prelude::*;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, instrument};

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
    presign_downloads: Option<Duration>,
}

impl S3Storage {
    pub fn new(client: Client, bucket: String, prefix: Option<String>) -> Self {
        Self {
            client,
            bucket,
            prefix: prefix.unwrap_or_default(),
            presign_downloads: None,
        }
    }

    /// Serve artifact bodies by redirecting clients to presigned S3 URLs
    /// valid for `expires_in`, instead of proxying them.
    pub fn with_presigned_downloads(mut self, expires_in: Duration) -> Self {
        self.presign_downloads = Some(expires_in);
        self
    }

    fn key(&self, path: &str) -> String {
        self.prefix
            .is_empty()
            .then(|| path.to_string())
            .unwrap_or(format!("{}{path}", self.prefix))
    }
}

fn strip_root(root: &str, key: &str) -> String {
    key.strip_prefix(root).unwrap_or(key).to_string()
}

fn to_utc(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

impl StorageBackend for S3Storage {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self, prefix: &str, recursive: bool) -> Result<ObjectStream, StorageError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let root = self.prefix.clone();
        let full_prefix = self.key(prefix);

        let stream = async_stream::try_stream! {
            let mut continuation_token: Option<String> = None;

            loop {
                let mut request = client
                    .list_objects_v2()
                    .bucket(&bucket)
                    .prefix(&full_prefix);

                if !recursive {
                    request = request.delimiter("/");
                }
                if let Some(token) = continuation_token.take() {
                    request = request.continuation_token(token);
                }

                let output = request.send().await.map_err(|e| {
                    error!("Failed to list objects: {e:?}");
                    StorageError::Unavailable(format!("S3 List Error: {e:?}"))
                })?;

                for common in output.common_prefixes() {
                    if let Some(dir) = common.prefix() {
                        yield ObjectEntry::directory(strip_root(&root, dir));
                    }
                }

                for object in output.contents() {
                    if let Some(key) = object.key() {
                        yield ObjectEntry::file(
                            strip_root(&root, key),
                            object.size().unwrap_or(0).max(0) as u64,
                            object.last_modified().and_then(to_utc),
                        );
                    }
                }

                continuation_token = output
                    .next_continuation_token()
                    .filter(|_| output.is_truncated() == Some(true))
                    .map(str::to_string);
                if continuation_token.is_none() {
                    break;
                }
            }
        };

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, key))]
    async fn metadata(&self, path: &str) -> Result<Option<ObjectMetadata>, StorageError> {
        let key = self.key(path);
        tracing::Span::current().record("key", &key);

        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        match res {
            Ok(output) => {
                let size = output.content_length().unwrap_or(0).max(0) as u64;
                let last_modified = output
                    .last_modified()
                    .and_then(to_utc)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

                Ok(Some(ObjectMetadata {
                    size,
                    etag: output
                        .e_tag()
                        .map(EntityTag::new)
                        .unwrap_or_else(|| EntityTag::synthesize(size, last_modified)),
                    last_modified,
                    content_type: output.content_type().map(str::to_string),
                }))
            }
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => {
                debug!("Object not found in S3");
                Ok(None)
            }
            Err(e) => {
                error!("S3 Head Object Error: {:?}", e);
                Err(StorageError::Unavailable(format!("S3 Error: {e:?}")))
            }
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, key))]
    async fn read_stream(&self, path: &str) -> Result<ByteStream, StorageError> {
        let key = self.key(path);
        tracing::Span::current().record("key", &key);

        debug!("Reading object from S3...");
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        match res {
            Ok(output) => {
                let stream = ReaderStream::new(output.body.into_async_read())
                    .map(|chunk| chunk.map_err(StorageError::Io));
                Ok(Box::pin(stream))
            }
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                debug!("File not found in S3");
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => {
                error!("Unexpected S3 Error: {:?}", e);
                Err(StorageError::Unavailable(format!("S3 Error: {e:?}")))
            }
        }
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, key))]
    async fn write(
        &self,
        path: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let key = self.key(path);
        tracing::Span::current().record("key", &key);

        debug!("Uploading object to S3...");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .set_content_type(content_type.map(str::to_string))
            .body(S3ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to upload object: {e:?}");
                StorageError::Unavailable(format!("S3 Upload Error: {e:?}"))
            })?;

        debug!("Upload successful");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, key))]
    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let key = self.key(path);
        tracing::Span::current().record("key", &key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to delete object: {e:?}");
                StorageError::Unavailable(format!("S3 Delete Error: {e:?}"))
            })?;

        Ok(())
    }

    async fn get_download_url(&self, path: &str) -> Result<Option<String>, StorageError> {
        let Some(expires_in) = self.presign_downloads else {
            return Ok(None);
        };

        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::Unavailable(format!("Invalid presign duration: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .presigned(config)
            .await
            .map_err(|e| StorageError::Unavailable(format!("S3 Presign Error: {e:?}")))?;

        Ok(Some(request.uri().to_string()))
    }
}
