use crate::error::{StorageError, WriteError};
use crate::traits::StorageBackend;
use tracing::info;

/// Repository metadata files that are rewritten on every deploy.
pub const OVERWRITABLE_SUFFIXES: [&str; 3] = [
    "maven-metadata.xml",
    "maven-metadata.xml.md5",
    "maven-metadata.xml.sha1",
];

pub fn is_overwritable(key: &str) -> bool {
    OVERWRITABLE_SUFFIXES
        .iter()
        .any(|suffix| key.ends_with(suffix))
}

/// Rejects redeployment of an existing artifact when uniqueness is enforced.
///
/// The existence check and the following write are separate store calls, so two
/// concurrent first writes of the same key can both pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteGuard {
    pub unique_artifacts: bool,
}

impl WriteGuard {
    pub fn new(unique_artifacts: bool) -> Self {
        Self { unique_artifacts }
    }

    pub async fn check<S: StorageBackend>(
        &self,
        storage: &S,
        key: &str,
    ) -> Result<(), GuardError> {
        if key.is_empty() || key.ends_with('/') {
            return Err(WriteError::DirectoryPath(key.to_string()).into());
        }

        if !self.unique_artifacts || is_overwritable(key) {
            return Ok(());
        }

        if storage.exists(key).await? {
            info!(key, "rejected redeploy of existing artifact");
            return Err(WriteError::Conflict(key.to_string()).into());
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
