use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use object_store::{ObjectStore, path::Path as ObjectPath};
use url::Url;

use super::{BlobError, BlobResult, BlobStore};
use crate::errors::Result;

/// 基于 object_store 的 BlobStore 实现，支持本地文件系统、内存、S3、GCS 与 Azure。
#[derive(Debug, Clone)]
pub struct ObjectBlobStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl ObjectBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        ObjectBlobStore {
            store,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()), "")
    }

    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        let (store, prefix) = object_store::parse_url(&url)?;
        debug!("Blob store resolved from {url} with prefix '{prefix}'");

        Ok(Self::new(Arc::from(store), prefix.as_ref()))
    }

    fn path(&self, key: &str) -> ObjectPath {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{}", self.prefix, key))
        }
    }

    #[cfg(test)]
    pub async fn put(&self, key: &str, content: impl Into<bytes::Bytes>) -> Result<()> {
        self.store
            .put(&self.path(key), object_store::PutPayload::from(content.into()))
            .await?;

        Ok(())
    }

    #[cfg(test)]
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.store.head(&self.path(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.store
            .delete(&self.path(key))
            .await
            .map_err(|e| classify(key, e))
    }
}

fn classify(key: &str, error: object_store::Error) -> BlobError {
    match error {
        object_store::Error::NotFound { .. } => BlobError::NotFound(key.to_string()),
        e @ (object_store::Error::PermissionDenied { .. }
        | object_store::Error::Unauthenticated { .. }
        | object_store::Error::InvalidPath { .. }
        | object_store::Error::NotSupported { .. }
        | object_store::Error::NotImplemented
        | object_store::Error::UnknownConfigurationKey { .. }) => {
            BlobError::Permanent(format!("{key}: {e}"))
        }
        e => BlobError::Transient(format!("{key}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::{local::LocalFileSystem, memory::InMemory};

    #[tokio::test]
    async fn test_delete_in_memory() {
        let blobstore = ObjectBlobStore::in_memory();
        blobstore.put("exports/1/0.zip", "content").await.unwrap();
        assert!(blobstore.exists("exports/1/0.zip").await.unwrap());

        blobstore.delete("exports/1/0.zip").await.unwrap();
        assert!(!blobstore.exists("exports/1/0.zip").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_local_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileSystem::new_with_prefix(dir.path()).unwrap();
        let blobstore = ObjectBlobStore::new(Arc::new(store), "exports");

        blobstore.put("1/0.zip", "content").await.unwrap();
        assert!(dir.path().join("exports/1/0.zip").exists());

        blobstore.delete("1/0.zip").await.unwrap();
        assert!(!dir.path().join("exports/1/0.zip").exists());

        // 再次删除得到 NotFound
        assert!(matches!(
            blobstore.delete("1/0.zip").await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_from_url() {
        let blobstore = ObjectBlobStore::from_url("memory:///exports").unwrap();
        blobstore.put("1/0.zip", "content").await.unwrap();
        assert!(blobstore.exists("1/0.zip").await.unwrap());

        assert!(ObjectBlobStore::from_url("not a url").is_err());
    }

    #[test]
    fn test_path() {
        let blobstore = ObjectBlobStore::new(Arc::new(InMemory::new()), "/exports/");
        assert_eq!(blobstore.path("1/0.zip").as_ref(), "exports/1/0.zip");

        let blobstore = ObjectBlobStore::new(Arc::new(InMemory::new()), "");
        assert_eq!(blobstore.path("/1/0.zip").as_ref(), "1/0.zip");
    }
}
