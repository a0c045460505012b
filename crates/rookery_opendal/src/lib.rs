use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use opendal::{ErrorKind, Metadata, Operator};
use rookery_core::prelude::*;
use std::time::SystemTime;

#[derive(Clone)]
pub struct OpendalStorage {
    op: Operator,
}

impl OpendalStorage {
    /// Create a new storage from an OpenDAL Operator.
    /// The Operator can be configured for any supported backend e.g., s3, fs, gcs, etc.
    pub fn new(op: Operator) -> Self {
        Self { op }
    }
}

fn generic(context: &str) -> impl Fn(opendal::Error) -> StorageError + '_ {
    move |e| StorageError::Unavailable(format!("OpenDAL {context} Error: {e}"))
}

fn to_utc(ts: impl Into<SystemTime>) -> DateTime<Utc> {
    DateTime::<Utc>::from(ts.into())
}

fn object_metadata(meta: &Metadata) -> ObjectMetadata {
    let size = meta.content_length();
    let last_modified = meta
        .last_modified()
        .map(to_utc)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    ObjectMetadata {
        size,
        etag: meta
            .etag()
            .map(EntityTag::new)
            .unwrap_or_else(|| EntityTag::synthesize(size, last_modified)),
        last_modified,
        content_type: meta.content_type().map(str::to_string),
    }
}

impl StorageBackend for OpendalStorage {
    async fn list(&self, prefix: &str, recursive: bool) -> Result<ObjectStream, StorageError> {
        let path = if prefix.is_empty() { "/" } else { prefix };

        let lister = self
            .op
            .lister_with(path)
            .recursive(recursive)
            .await
            .map_err(generic("List"))?;

        let stream = lister
            .try_filter(|entry| futures::future::ready(entry.path() != "/"))
            .try_filter_map(move |entry| {
                let meta = entry.metadata();
                let item = match (meta.is_dir(), recursive) {
                    (true, true) => None,
                    (true, false) => Some(ObjectEntry::directory(entry.path())),
                    (false, _) => Some(ObjectEntry::file(
                        entry.path(),
                        meta.content_length(),
                        meta.last_modified().map(to_utc),
                    )),
                };
                futures::future::ready(Ok(item))
            })
            .map_err(generic("List"));

        Ok(Box::pin(stream))
    }

    async fn metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError> {
        match self.op.stat(key).await {
            Ok(meta) if meta.is_file() => Ok(Some(object_metadata(&meta))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(generic("Stat")(e)),
        }
    }

    async fn read_stream(&self, key: &str) -> Result<ByteStream, StorageError> {
        let reader = match self.op.reader(key).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(generic("Read")(e)),
        };

        let stream = reader
            .into_bytes_stream(..)
            .await
            .map_err(generic("Read"))?
            .map(|chunk| chunk.map_err(StorageError::Io));

        Ok(Box::pin(stream))
    }

    async fn write(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut write = self.op.write_with(key, data);
        if let Some(content_type) = content_type {
            write = write.content_type(content_type);
        }
        write.await.map_err(generic("Write"))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.op.delete(key).await.map_err(generic("Delete"))
    }
}
