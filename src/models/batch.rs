use chrono::{DateTime, Utc};
use std::time::Duration;

pub type BatchId = i64;

/// 一次导出产生的全部文件，它们一同创建、一同过期。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBatch {
    pub id: BatchId,
    pub created_at: DateTime<Utc>,
    // 对象存储中的键，按写入顺序排列
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub ttl: Duration,
}

impl ExpiryPolicy {
    pub fn new(ttl: Duration) -> Self {
        ExpiryPolicy { ttl }
    }

    /// 创建时间早于等于该时刻的批次均已过期。
    pub fn cutoff(&self, reference_time: DateTime<Utc>) -> DateTime<Utc> {
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => reference_time
                .checked_sub_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            // TTL 超出 chrono 的表示范围，视为永不过期
            Err(_) => DateTime::<Utc>::MIN_UTC,
        }
    }

    pub fn is_expired(&self, batch: &ExportBatch, reference_time: DateTime<Utc>) -> bool {
        let cutoff = self.cutoff(reference_time);
        cutoff > DateTime::<Utc>::MIN_UTC && batch.created_at <= cutoff
    }
}
