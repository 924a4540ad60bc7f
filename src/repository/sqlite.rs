use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};

use super::{ExportRepository, RepoError, RepoResult};
use crate::{
    err,
    errors::Result,
    models::batch::{BatchId, ExpiryPolicy, ExportBatch},
};

#[cfg(test)]
const STATUS_COMPLETE: &str = "COMPLETE";
const STATUS_DELETED: &str = "DELETED";

#[derive(Debug, Clone)]
pub struct SqliteExportRepository {
    pool: SqlitePool,
}

impl SqliteExportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteExportRepository { pool }
    }

    /// 连接数据库并执行迁移。
    pub async fn connect(url: &str) -> Result<Self> {
        if !url.starts_with("sqlite:") {
            return err!("unsupported database URL `{url}`, only sqlite is supported");
        }
        let options = if url.contains(":memory:") {
            // 内存数据库的每个连接都是独立的库，只能保留唯一的连接
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool))
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// 写入一个批次及其文件，返回批次 ID。创建时间向上取整到微秒。
    #[cfg(test)]
    pub async fn insert_batch(
        &self,
        created_at: DateTime<Utc>,
        files: &[&str],
    ) -> RepoResult<BatchId> {
        let mut tx = self.pool.begin().await?;

        let batch_id: BatchId =
            sqlx::query("INSERT INTO export_batch (created_at_us, status) VALUES (?, ?)")
                .bind(stored_micros(created_at))
                .bind(STATUS_COMPLETE)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

        for (position, filename) in files.iter().enumerate() {
            sqlx::query(
                "INSERT INTO export_file (batch_id, position, filename, status) VALUES (?, ?, ?, ?)",
            )
            .bind(batch_id)
            .bind(position as i64)
            .bind(*filename)
            .bind(STATUS_COMPLETE)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(batch_id)
    }

    /// 批次是否仍处于未删除状态。
    #[cfg(test)]
    pub async fn is_live(&self, batch_id: BatchId) -> RepoResult<bool> {
        let row = sqlx::query("SELECT status FROM export_batch WHERE id = ?")
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some_and(|row| row.get::<String, _>("status") != STATUS_DELETED))
    }
}

#[cfg(test)]
fn stored_micros(created_at: DateTime<Utc>) -> i64 {
    let micros = created_at.timestamp_micros();
    if created_at.timestamp_subsec_nanos() % 1_000 != 0 {
        micros + 1
    } else {
        micros
    }
}

#[async_trait]
impl ExportRepository for SqliteExportRepository {
    async fn list_expired(
        &self,
        reference_time: DateTime<Utc>,
        ttl: Duration,
    ) -> RepoResult<Vec<ExportBatch>> {
        let cutoff = ExpiryPolicy::new(ttl).cutoff(reference_time);
        if cutoff == DateTime::<Utc>::MIN_UTC {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT b.id, b.created_at_us, f.filename
            FROM export_batch b
            LEFT JOIN export_file f ON f.batch_id = b.id
            WHERE b.status != ? AND b.created_at_us <= ?
            ORDER BY b.created_at_us, b.id, f.position
            "#,
        )
        .bind(STATUS_DELETED)
        // 截止时间向下取整、创建时间向上取整，批次不会被提前判定过期
        .bind(cutoff.timestamp_micros())
        .fetch_all(&self.pool)
        .await?;

        // 结果已按批次分组，文件按写入顺序排列
        let mut expired: Vec<ExportBatch> = Vec::new();
        for row in rows {
            let id: BatchId = row.get("id");
            let filename: Option<String> = row.get("filename");

            if expired.last().is_none_or(|batch| batch.id != id) {
                let created_at_us: i64 = row.get("created_at_us");
                let created_at = DateTime::from_timestamp_micros(created_at_us).ok_or_else(|| {
                    RepoError::Internal(format!("batch {id} has invalid created_at_us"))
                })?;
                expired.push(ExportBatch {
                    id,
                    created_at,
                    files: Vec::new(),
                });
            }
            if let (Some(batch), Some(filename)) = (expired.last_mut(), filename) {
                batch.files.push(filename);
            }
        }

        debug!("Found {} expired export batch(es) before {cutoff}", expired.len());

        Ok(expired)
    }

    async fn delete_batch_metadata(&self, batch_id: BatchId) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE export_batch SET status = ? WHERE id = ? AND status != ?")
            .bind(STATUS_DELETED)
            .bind(batch_id)
            .bind(STATUS_DELETED)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            // 事务随 tx 丢弃而回滚
            return Err(RepoError::NotFound(batch_id));
        }

        sqlx::query("UPDATE export_file SET status = ? WHERE batch_id = ?")
            .bind(STATUS_DELETED)
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
