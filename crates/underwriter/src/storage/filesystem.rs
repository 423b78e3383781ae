use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::blob::BlobStore;
use crate::error::BlobError;

/// Blob store over a local directory: `<root>/<container>/<key>`.
///
/// Used for local runs and tests in place of a storage account.
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a blob to a file path, refusing anything that would escape
    /// the container directory.
    fn resolve(&self, container: &str, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(container).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(BlobError::MalformedPath(format!("{}/{}", container, key)));
        }
        Ok(self.root.join(relative))
    }

    /// Writes a blob, creating intermediate directories.
    pub async fn put(&self, container: &str, key: &str, content: &[u8]) -> Result<(), BlobError> {
        let path = self.resolve(container, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::Request(format!("{}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| BlobError::Request(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(container, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound {
                path: format!("{}/{}", container, key),
            }),
            Err(e) => Err(BlobError::Request(format!("{}: {}", path.display(), e))),
        }
    }
}
