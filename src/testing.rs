//! In-memory doubles for the two external stores.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    blobstore::{BlobError, BlobResult, BlobStore},
    models::batch::{BatchId, ExpiryPolicy, ExportBatch},
    repository::{ExportRepository, RepoError, RepoResult},
};

#[derive(Default)]
struct RepositoryState {
    next_id: BatchId,
    // 批次及其是否仍存活
    batches: BTreeMap<BatchId, (ExportBatch, bool)>,
    fail_listing: bool,
    fail_delete: HashSet<BatchId>,
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<RepositoryState>,
    ignore_ttl: bool,
}

impl MemoryRepository {
    /// 列举时返回所有存活批次，用来模拟有缺陷的仓库。
    pub fn ignoring_ttl() -> Self {
        MemoryRepository {
            ignore_ttl: true,
            ..Default::default()
        }
    }

    pub fn insert(&self, created_at: DateTime<Utc>, files: &[&str]) -> BatchId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let batch = ExportBatch {
            id,
            created_at,
            files: files.iter().map(|f| f.to_string()).collect(),
        };
        state.batches.insert(id, (batch, true));

        id
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    pub fn fail_delete(&self, batch_id: BatchId) {
        self.state.lock().unwrap().fail_delete.insert(batch_id);
    }

    pub fn is_live(&self, batch_id: BatchId) -> bool {
        let state = self.state.lock().unwrap();
        state.batches.get(&batch_id).is_some_and(|(_, live)| *live)
    }

    pub fn live_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.batches.values().filter(|(_, live)| *live).count()
    }
}

#[async_trait]
impl ExportRepository for MemoryRepository {
    async fn list_expired(
        &self,
        reference_time: DateTime<Utc>,
        ttl: Duration,
    ) -> RepoResult<Vec<ExportBatch>> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(RepoError::Internal("connection refused".to_string()));
        }
        let policy = ExpiryPolicy::new(ttl);

        Ok(state
            .batches
            .values()
            .filter(|(batch, live)| {
                *live && (self.ignore_ttl || policy.is_expired(batch, reference_time))
            })
            .map(|(batch, _)| batch.clone())
            .collect())
    }

    async fn delete_batch_metadata(&self, batch_id: BatchId) -> RepoResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete.contains(&batch_id) {
            return Err(RepoError::Internal("deadlock detected".to_string()));
        }
        match state.batches.get_mut(&batch_id) {
            Some((_, live)) if *live => {
                *live = false;
                Ok(())
            }
            _ => Err(RepoError::NotFound(batch_id)),
        }
    }
}

#[derive(Default)]
pub struct FailingBlobStore {
    failing: HashSet<String>,
    missing: HashSet<String>,
    deleted: Mutex<Vec<String>>,
}

impl FailingBlobStore {
    pub fn failing_on(keys: &[&str]) -> Self {
        FailingBlobStore {
            failing: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn missing(keys: &[&str]) -> Self {
        FailingBlobStore {
            missing: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    /// 已成功删除的键，按删除顺序排列。
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn delete(&self, key: &str) -> BlobResult<()> {
        if self.failing.contains(key) {
            return Err(BlobError::Permanent(format!("{key}: access denied")));
        }
        if self.missing.contains(key) {
            return Err(BlobError::NotFound(key.to_string()));
        }
        self.deleted.lock().unwrap().push(key.to_string());

        Ok(())
    }
}

pub struct SlowBlobStore {
    delay: Duration,
}

impl SlowBlobStore {
    pub fn new(delay: Duration) -> Self {
        SlowBlobStore { delay }
    }
}

#[async_trait]
impl BlobStore for SlowBlobStore {
    async fn delete(&self, _key: &str) -> BlobResult<()> {
        tokio::time::sleep(self.delay).await;

        Ok(())
    }
}
