//! Directory-backed object store.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};

use super::{ObjectBlob, ObjectStore};
use crate::error::CoverError;

/// Read-only object store rooted at a local directory.
///
/// Object paths are relative, `/`-separated. Paths that would leave the
/// root (absolute, `..`) are treated as absent.
#[derive(Debug, Clone)]
pub struct DirObjectStore {
    root: PathBuf,
}

impl DirObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        (contained && !path.is_empty()).then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for DirObjectStore {
    async fn get(&self, path: &str) -> Result<Option<ObjectBlob>, CoverError> {
        let Some(full) = self.resolve(path) else {
            return Ok(None);
        };

        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Some(ObjectBlob {
                bytes: Bytes::from(data),
                content_type: mime_guess::from_path(&full).first().map(|m| m.to_string()),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoverError::Store(format!(
                "Failed to read {}: {}",
                full.display(),
                e
            ))),
        }
    }
}
