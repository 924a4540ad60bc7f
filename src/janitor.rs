use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::time::Instant;

use crate::{
    blobstore::{BlobError, BlobStore},
    errors::{Error, Result},
    models::batch::{BatchId, ExpiryPolicy, ExportBatch},
    repository::{ExportRepository, RepoError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    // 删除对象失败，元数据保留，下次运行重试
    Blob,
    // 对象已删除但元数据仍在，需要人工核对
    Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub batch_id: BatchId,
    pub stage: FailureStage,
    pub error: String,
}

/// 一次清理的结果。每个过期批次恰好计入 cleaned、failures、skipped 之一。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    pub examined: usize,
    pub cleaned: usize,
    // 因超过截止时间而未开始处理的批次
    pub skipped: usize,
    pub deadline_exceeded: bool,
    pub failures: Vec<BatchFailure>,
}

impl CleanupOutcome {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

enum BatchResult {
    Cleaned,
    Failed(BatchFailure),
    Skipped,
}

pub struct CleanupOrchestrator {
    repository: Arc<dyn ExportRepository>,
    blobstore: Arc<dyn BlobStore>,
    policy: ExpiryPolicy,
    workers: usize,
}

impl CleanupOrchestrator {
    pub fn new(
        repository: Arc<dyn ExportRepository>,
        blobstore: Arc<dyn BlobStore>,
        ttl: Duration,
        workers: usize,
    ) -> Self {
        CleanupOrchestrator {
            repository,
            blobstore,
            policy: ExpiryPolicy::new(ttl),
            workers: workers.max(1),
        }
    }

    /// 删除 `reference_time` 时已过期的批次。
    ///
    /// 只有列举失败会让整次运行失败，单个批次的错误收集在结果中。
    /// 截止时间过后不再开始新的批次，已开始的批次会自然完成。
    pub async fn run(
        &self,
        reference_time: DateTime<Utc>,
        deadline: Instant,
    ) -> Result<CleanupOutcome> {
        let listed = self
            .repository
            .list_expired(reference_time, self.policy.ttl)
            .await
            .map_err(Error::Listing)?;

        let batches = listed
            .into_iter()
            .filter(|batch| {
                let expired = self.policy.is_expired(batch, reference_time);
                if !expired {
                    warn!(
                        "Ignoring export batch {} created at {}: not expired at {reference_time}",
                        batch.id, batch.created_at
                    );
                }

                expired
            })
            .collect::<Vec<_>>();

        let mut outcome = CleanupOutcome {
            examined: batches.len(),
            ..Default::default()
        };
        if batches.is_empty() {
            debug!("No expired export batches to clean up");
            return Ok(outcome);
        }

        let results: Vec<BatchResult> = stream::iter(batches)
            .map(|batch| async move {
                if Instant::now() >= deadline {
                    return BatchResult::Skipped;
                }
                self.clean_batch(batch).await
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        for result in results {
            match result {
                BatchResult::Cleaned => outcome.cleaned += 1,
                BatchResult::Failed(failure) => outcome.failures.push(failure),
                BatchResult::Skipped => outcome.skipped += 1,
            }
        }
        // 结果顺序不影响语义，排序便于阅读
        outcome.failures.sort_by_key(|failure| failure.batch_id);
        outcome.deadline_exceeded = outcome.skipped > 0;
        if outcome.deadline_exceeded {
            warn!(
                "Deadline reached, {} expired export batch(es) left for the next run",
                outcome.skipped
            );
        }

        Ok(outcome)
    }

    async fn clean_batch(&self, batch: ExportBatch) -> BatchResult {
        for key in &batch.files {
            match self.blobstore.delete(key).await {
                Ok(()) => debug!("Deleted blob {key} of export batch {}", batch.id),
                Err(BlobError::NotFound(_)) => {
                    debug!("Blob {key} of export batch {} is already absent", batch.id)
                }
                Err(e) => {
                    error!(
                        "Failed to delete blob {key} of export batch {}, keeping its metadata: {e}",
                        batch.id
                    );

                    return BatchResult::Failed(BatchFailure {
                        batch_id: batch.id,
                        stage: FailureStage::Blob,
                        error: e.to_string(),
                    });
                }
            }
        }

        match self.repository.delete_batch_metadata(batch.id).await {
            Ok(()) => {
                debug!(
                    "Cleaned export batch {} ({} file(s))",
                    batch.id,
                    batch.files.len()
                );

                BatchResult::Cleaned
            }
            Err(RepoError::NotFound(_)) => {
                debug!("Metadata of export batch {} is already gone", batch.id);

                BatchResult::Cleaned
            }
            Err(e) => {
                error!(
                    "Blobs of export batch {} are deleted but its metadata remains (orphaned metadata): {e}",
                    batch.id
                );

                BatchResult::Failed(BatchFailure {
                    batch_id: batch.id,
                    stage: FailureStage::Metadata,
                    error: e.to_string(),
                })
            }
        }
    }
}

pub fn log_outcome(run_id: &str, outcome: &CleanupOutcome) {
    if outcome.examined == 0 {
        debug!("[{run_id}] No expired export batches");
    } else if outcome.has_failures() {
        warn!(
            "[{run_id}] Cleaned {} of {} expired export batch(es), {} failed, {} skipped",
            outcome.cleaned,
            outcome.examined,
            outcome.failures.len(),
            outcome.skipped
        );
    } else {
        info!(
            "[{run_id}] Cleaned {} of {} expired export batch(es), {} skipped",
            outcome.cleaned, outcome.examined, outcome.skipped
        );
    }
}
