mod sqlite;

pub use sqlite::SqliteExportRepository;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::batch::{BatchId, ExportBatch};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    // 记录不存在（或已被标记删除），清理时视为成功
    #[error("export batch not found: {0}")]
    NotFound(BatchId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type RepoResult<T> = std::result::Result<T, RepoError>;

/// 导出批次的元数据存储。
#[async_trait]
pub trait ExportRepository: Send + Sync {
    /// 列出截至 `reference_time` 已存活满 `ttl` 的全部批次。
    async fn list_expired(
        &self,
        reference_time: DateTime<Utc>,
        ttl: Duration,
    ) -> RepoResult<Vec<ExportBatch>>;

    /// 在同一事务中删除批次记录及其文件记录。
    async fn delete_batch_metadata(&self, batch_id: BatchId) -> RepoResult<()>;
}
