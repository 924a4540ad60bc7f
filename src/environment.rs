use std::sync::Arc;

use log::info;

use crate::{
    blobstore::{BlobStore, ObjectBlobStore},
    errors::Result,
    repository::{ExportRepository, SqliteExportRepository},
};

/// 服务依赖的外部能力，创建一次后按引用传入服务与清理器。
#[derive(Default, Clone)]
pub struct ServerEnv {
    database: Option<Arc<dyn ExportRepository>>,
    blobstore: Option<Arc<dyn BlobStore>>,
}

impl ServerEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: Arc<dyn ExportRepository>) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_blobstore(mut self, blobstore: Arc<dyn BlobStore>) -> Self {
        self.blobstore = Some(blobstore);
        self
    }

    pub fn database(&self) -> Option<&Arc<dyn ExportRepository>> {
        self.database.as_ref()
    }

    pub fn blobstore(&self) -> Option<&Arc<dyn BlobStore>> {
        self.blobstore.as_ref()
    }

    /// 按连接串创建生产环境的数据库与对象存储。
    pub async fn connect(database_url: &str, blobstore_url: &str) -> Result<Self> {
        let database = SqliteExportRepository::connect(database_url).await?;
        info!("Connected to export database");
        let blobstore = ObjectBlobStore::from_url(blobstore_url)?;
        info!("Blob store ready at {blobstore_url}");

        Ok(Self::new()
            .with_database(Arc::new(database))
            .with_blobstore(Arc::new(blobstore)))
    }
}

impl std::fmt::Debug for ServerEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerEnv")
            .field("database", &self.database.is_some())
            .field("blobstore", &self.blobstore.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect() {
        let env = ServerEnv::connect("sqlite::memory:", "memory:///exports")
            .await
            .unwrap();
        assert!(env.database().is_some());
        assert!(env.blobstore().is_some());

        assert!(
            ServerEnv::connect("sqlite::memory:", "no-scheme")
                .await
                .is_err()
        );

        let err = ServerEnv::connect("postgres://localhost/exports", "memory:///exports")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, crate::errors::Error::Internal(_)));
        assert_eq!(
            err.to_string(),
            "internal error: unsupported database URL `postgres://localhost/exports`, only sqlite is supported"
        );
    }
}
