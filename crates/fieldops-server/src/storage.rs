//! Filesystem implementation of the object store.

use std::path::{Path, PathBuf};

use fieldops_core::upload::{self, ObjectStore, UploadError};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, UploadError> {
        upload::check_key(key)?;
        Ok(self.root.join(key))
    }
}

fn backend(err: std::io::Error) -> UploadError {
    UploadError::Backend(err.to_string())
}

impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, UploadError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(backend)?;
        }
        fs::write(&path, bytes).await.map_err(backend)?;
        Ok(format!("{}/{key}", self.public_url))
    }

    async fn delete(&self, key: &str) -> Result<(), UploadError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> PathBuf {
        std::env::temp_dir().join(format!("fieldops-store-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn put_then_delete() {
        let root = scratch();
        let store = LocalObjectStore::new(&root, "http://files.test/");

        let url = store
            .put("agent/photo-1-abc.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "http://files.test/agent/photo-1-abc.png");
        assert_eq!(fs::read(root.join("agent/photo-1-abc.png")).await.unwrap(), vec![1, 2, 3]);

        store.delete("agent/photo-1-abc.png").await.unwrap();
        assert!(!root.join("agent/photo-1-abc.png").exists());
        // Deleting again is a no-op.
        store.delete("agent/photo-1-abc.png").await.unwrap();

        fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn traversal_keys_are_refused() {
        let store = LocalObjectStore::new(scratch(), "http://files.test");
        assert!(matches!(
            store.put("../etc/passwd", vec![0], "image/png").await,
            Err(UploadError::InvalidKey)
        ));
        assert!(matches!(
            store.delete("/abs/key.png").await,
            Err(UploadError::InvalidKey)
        ));
    }
}
