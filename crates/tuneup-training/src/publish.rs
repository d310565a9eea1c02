//! Uploading converted datasets to object storage.

use crate::dataset::write_jsonl;
use crate::error::{TrainingError, TrainingResult};
use crate::gemini::ConvertedExample;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

/// Create-only object storage.
///
/// `upload_new` must never overwrite: an existing object is reported as
/// [`TrainingError::DestinationExists`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// URI of `name` in this store (e.g. `gs://bucket/name`).
    fn uri(&self, name: &str) -> String;

    async fn exists(&self, name: &str) -> TrainingResult<bool>;

    async fn upload_new(&self, local_path: &Path, name: &str) -> TrainingResult<String>;
}

/// Build a fresh object name for one split of a dataset.
#[must_use]
pub fn unique_object_name(prefix: &str, label: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let run = Uuid::new_v4();
    if prefix.is_empty() {
        format!("{run}/{label}.jsonl")
    } else {
        format!("{prefix}/{run}/{label}.jsonl")
    }
}

/// Write `examples` to a temporary JSONL file and upload it as `destination_name`.
pub async fn publish(
    store: &dyn ObjectStore,
    examples: &[ConvertedExample],
    destination_name: &str,
) -> TrainingResult<String> {
    if store.exists(destination_name).await? {
        return Err(TrainingError::DestinationExists(store.uri(destination_name)));
    }

    let mut file = tempfile::NamedTempFile::new()?;
    write_jsonl(file.as_file_mut(), examples)?;
    debug!(path = %file.path().display(), examples = examples.len(), "Wrote dataset to temporary file");

    let uri = store.upload_new(file.path(), destination_name).await?;
    info!(uri = %uri, examples = examples.len(), "Uploaded dataset");
    Ok(uri)
}

/// Object store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn uri(&self, name: &str) -> String {
        format!("file://{}", self.path_for(name).display())
    }

    async fn exists(&self, name: &str) -> TrainingResult<bool> {
        Ok(tokio::fs::try_exists(self.path_for(name)).await?)
    }

    async fn upload_new(&self, local_path: &Path, name: &str) -> TrainingResult<String> {
        let target = self.path_for(name);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut dest = match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&target).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(TrainingError::DestinationExists(self.uri(name)));
            }
            Err(e) => return Err(TrainingError::Transport(format!("{}: {}", target.display(), e))),
        };

        let mut src = tokio::fs::File::open(local_path).await?;
        tokio::io::copy(&mut src, &mut dest)
            .await
            .map_err(|e| TrainingError::Transport(format!("{}: {}", target.display(), e)))?;
        dest.flush().await?;

        Ok(self.uri(name))
    }
}
