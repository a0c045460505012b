use crate::error::*;
use crate::identity::SecurityContext;
use crate::object::{ObjectEntry, ObjectMetadata};

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Lazy, forward-only listing. Iterating again means listing again.
pub type ObjectStream = Pin<Box<dyn Stream<Item = Result<ObjectEntry, StorageError>> + Send>>;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

pub trait StorageBackend: Send + Sync + 'static + Clone {
    /// Lists keys under `prefix`.
    ///
    /// Non-recursive listings report immediate children only, with nested
    /// prefixes collapsed into directory entries ending in `/`. Recursive
    /// listings report every object below the prefix and no directories.
    fn list(
        &self,
        prefix: &str,
        recursive: bool,
    ) -> impl Future<Output = Result<ObjectStream, StorageError>> + Send;

    /// `Ok(None)` when no object exists at `key`.
    fn metadata(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<ObjectMetadata>, StorageError>> + Send;

    fn read_stream(&self, key: &str)
    -> impl Future<Output = Result<ByteStream, StorageError>> + Send;

    /// Creates or replaces the object at `key`.
    fn write(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StorageError>> + Send {
        async move { Ok(self.metadata(key).await?.is_some()) }
    }

    /// Optional: a location the client can fetch the object body from directly.
    fn get_download_url(
        &self,
        _key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        async { Ok(None) }
    }
}

pub trait AuthProvider: Send + Sync + 'static + Clone {
    /// Resolves the raw `Authorization` header (if any) to a security context.
    ///
    /// Never fails: anything unrecognised yields [`SecurityContext::None`] and
    /// is rejected later by the route's role check.
    fn authenticate(&self, authorization: Option<&str>) -> SecurityContext;
}
