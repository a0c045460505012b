//! # Rookery FileSystem Storage
//!
//! A local filesystem backend for Rookery.
//!
//! This crate implements the [`StorageBackend`] trait, storing each object as a
//! file named by its key below a root directory. Directories on disk play the
//! role of key prefixes.
//!
//! ## Features
//!
//! * **Atomic Writes**: Uses temporary files and rename operations so artifacts are never read partially written.
//! * **Metadata Sidecars**: The entity tag and content type of each upload are kept under `.rookery/meta`.
//!
//! ## Usage
//!
//! ```no_run
//! use rookery_fs::FileSystemStorage;
//!
//! let storage = FileSystemStorage::new("./rookery_data");
//! ```

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use rookery_core::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

const INTERNAL_DIR: &str = ".rookery";

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    etag: String,
    size: u64,
    content_type: Option<String>,
}

/// A key whose path crosses an existing file names nothing, same as a missing one.
fn is_missing(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

async fn atomic_write(tmp_path: &Path, path: &Path, data: &[u8]) -> Result<(), StorageError> {
    for dir in [tmp_path.parent(), path.parent()].into_iter().flatten() {
        fs::create_dir_all(dir).await.map_err(StorageError::Io)?;
    }

    fs::write(tmp_path, data).await.map_err(StorageError::Io)?;
    if let Err(e) = fs::rename(tmp_path, path).await {
        let _ = fs::remove_file(tmp_path).await;
        return Err(StorageError::Io(e));
    }

    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path).await {
        Err(e) if !is_missing(&e) => Err(StorageError::Io(e)),
        _ => Ok(()),
    }
}

fn key_digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[derive(Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
    tmp_counter: Arc<AtomicU64>,
}

impl FileSystemStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            root: path.into(),
            tmp_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Maps a key onto the root. Keys that could escape it, or reach the
    /// internal directory, do not exist.
    fn get_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for (i, segment) in key.split('/').filter(|s| !s.is_empty()).enumerate() {
            if segment == "." || segment == ".." || segment.contains('\\') {
                return Err(StorageError::NotFound(key.to_string()));
            }
            if i == 0 && segment == INTERNAL_DIR {
                return Err(StorageError::NotFound(key.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Sidecars live in one flat directory, named by a digest of the key, so
    /// no key's sidecar can sit where another key needs a directory.
    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.root
            .join(INTERNAL_DIR)
            .join("meta")
            .join(format!("{}.json", key_digest(key)))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(INTERNAL_DIR)
            .join("tmp")
            .join(format!("{}-{n}", key_digest(key)))
    }

    async fn read_sidecar(&self, key: &str) -> Option<Sidecar> {
        let data = fs::read(self.sidecar_path(key)).await.ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Removes directories emptied by a delete, up to (not including) `stop`.
    async fn prune_empty_dirs(start: Option<&Path>, stop: &Path) {
        let mut current = start;
        while let Some(dir) = current {
            if dir == stop || !dir.starts_with(stop) || fs::remove_dir(dir).await.is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

impl StorageBackend for FileSystemStorage {
    async fn list(&self, prefix: &str, recursive: bool) -> Result<ObjectStream, StorageError> {
        let (dir_key, name_prefix) = match prefix.rfind('/') {
            Some(i) => prefix.split_at(i + 1),
            None => ("", prefix),
        };
        let dir = self.get_path(dir_key)?;
        let dir_key = dir_key.to_string();
        let name_prefix = name_prefix.to_string();

        let stream = async_stream::try_stream! {
            let mut pending = vec![(dir, dir_key, true)];

            while let Some((dir, key_prefix, top)) = pending.pop() {
                let read = fs::read_dir(&dir).await;
                if matches!(&read, Err(e) if is_missing(e)) {
                    continue;
                }
                let mut entries = read.map_err(StorageError::Io)?;

                while let Some(entry) = entries.next_entry().await.map_err(StorageError::Io)? {
                    let Ok(name) = entry.file_name().into_string() else {
                        continue;
                    };
                    if key_prefix.is_empty() && name == INTERNAL_DIR {
                        continue;
                    }
                    if top && !name.starts_with(name_prefix.as_str()) {
                        continue;
                    }

                    let meta = entry.metadata().await.map_err(StorageError::Io)?;
                    if meta.is_dir() {
                        let key = format!("{key_prefix}{name}/");
                        if recursive {
                            pending.push((entry.path(), key, false));
                        } else {
                            yield ObjectEntry::directory(key);
                        }
                    } else if meta.is_file() {
                        let modified = meta.modified().ok().map(DateTime::<Utc>::from);
                        yield ObjectEntry::file(format!("{key_prefix}{name}"), meta.len(), modified);
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError> {
        let path = self.get_path(key)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let size = meta.len();
        let last_modified = DateTime::<Utc>::from(meta.modified().map_err(StorageError::Io)?);

        // A sidecar describes the upload it was written with; a file replaced
        // behind our back gets a tag derived from its current state.
        let (etag, content_type) = match self.read_sidecar(key).await {
            Some(sidecar) if sidecar.size == size => {
                (EntityTag::new(sidecar.etag), sidecar.content_type)
            }
            _ => (EntityTag::synthesize(size, last_modified), None),
        };

        Ok(Some(ObjectMetadata {
            size,
            etag,
            last_modified,
            content_type,
        }))
    }

    async fn read_stream(&self, key: &str) -> Result<ByteStream, StorageError> {
        let path = self.get_path(key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if is_missing(&e) => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        Ok(Box::pin(
            ReaderStream::new(file).map(|chunk| chunk.map_err(StorageError::Io)),
        ))
    }

    async fn write(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let path = self.get_path(key)?;
        let sidecar = Sidecar {
            etag: hex::encode(Sha256::digest(&data)),
            size: data.len() as u64,
            content_type: content_type.map(str::to_string),
        };

        let sidecar_path = self.sidecar_path(key);
        let previous = fs::read(&sidecar_path).await.ok();

        // The sidecar goes first: a data file that lands without one would be
        // served with a made-up tag and no content type.
        atomic_write(
            &self.tmp_path(key),
            &sidecar_path,
            &serde_json::to_vec(&sidecar)?,
        )
        .await?;
        if let Err(e) = atomic_write(&self.tmp_path(key), &path, &data).await {
            // The old data is still in place, so it keeps its old sidecar.
            let _ = match previous {
                Some(bytes) => atomic_write(&self.tmp_path(key), &sidecar_path, &bytes).await,
                None => remove_if_exists(&sidecar_path).await,
            };
            return Err(e);
        }

        debug!(key, size = sidecar.size, "stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.get_path(key)?;
        let sidecar = self.sidecar_path(key);

        remove_if_exists(&path).await?;
        remove_if_exists(&sidecar).await?;

        Self::prune_empty_dirs(path.parent(), &self.root).await;
        Ok(())
    }
}
