//! Object storage for item images.
//!
//! Objects live in one bucket and are addressed by a relative path such as
//! `items/M-100-1718000000000.png`. Public URLs have the form
//! `{base_url}/{bucket}/{path}`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("storage io error: {0}")]
    Io(String),
}

/// A stored object's bytes and content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    fn public_url(&self, path: &str) -> String;

    /// Store `bytes` at `path`, replacing any previous object.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    async fn fetch(&self, path: &str) -> Result<StoredObject, StorageError>;

    /// Removing a missing object is not an error.
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

fn join_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), bucket, path)
}

/// Reject absolute paths and `..` so objects stay inside the bucket.
fn checked_path(path: &str) -> Result<&Path, StorageError> {
    let p = Path::new(path);
    let ok = !path.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(p)
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Process-local store for tests and local runs.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    bucket: String,
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::Io("object store lock poisoned".to_string())
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.base_url, &self.bucket, path)
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        checked_path(path)?;
        self.objects.write().map_err(|_| poisoned())?.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.public_url(path))
    }

    async fn fetch(&self, path: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .read()
            .map_err(|_| poisoned())?
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.objects.write().map_err(|_| poisoned())?.remove(path);
        Ok(())
    }
}

/// Filesystem store rooted at `{root}/{bucket}`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            base_url: base_url.into(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(&self.bucket).join(checked_path(path)?))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.base_url, &self.bucket, path)
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tracing::debug!(path = %target.display(), "stored object");
        Ok(self.public_url(path))
    }

    async fn fetch(&self, path: &str) -> Result<StoredObject, StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(StoredObject {
                bytes,
                content_type: content_type_for(path).to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trip_and_public_url() {
        let store = InMemoryObjectStore::new("inventory-images", "http://localhost:8080/storage/");
        let url = store
            .upload("items/M-1-1.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:8080/storage/inventory-images/items/M-1-1.png");
        assert_eq!(store.fetch("items/M-1-1.png").await.unwrap().bytes, vec![1, 2, 3]);

        store.remove("items/M-1-1.png").await.unwrap();
        store.remove("items/M-1-1.png").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn local_store_writes_under_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "inventory-images", "http://x/storage");
        store.upload("items/a.webp", vec![9; 4], "image/webp").await.unwrap();
        assert!(dir.path().join("inventory-images/items/a.webp").exists());

        let obj = store.fetch("items/a.webp").await.unwrap();
        assert_eq!(obj.content_type, "image/webp");

        store.remove("items/a.webp").await.unwrap();
        assert!(matches!(store.fetch("items/a.webp").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "b", "http://x");
        assert!(matches!(
            store.upload("../escape.png", vec![1], "image/png").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(store.upload("/etc/x.png", vec![1], "image/png").await.is_err());
    }
}
