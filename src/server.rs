use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use chrono::Utc;
use log::{error, info};
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};
use uuid::Uuid;

use crate::{
    config::Config,
    environment::ServerEnv,
    errors::{Error, Result},
    janitor::{self, CleanupOrchestrator},
    models::payload::CleanupSummary,
    routes,
};

// 截止时间之后留给在途批次收尾的余量上限
const MAX_DRAIN_MARGIN: Duration = Duration::from_secs(30);

/// 清理器停止开始新批次的时刻：超时前预留五分之一（至多 30 秒）。
fn soft_deadline(timeout: Duration) -> Duration {
    timeout - (timeout / 5).min(MAX_DRAIN_MARGIN)
}

/// 以 HTTP 调用暴露过期导出的清理。
pub struct ExportServer {
    config: Config,
    env: Arc<ServerEnv>,
    orchestrator: Arc<CleanupOrchestrator>,
    // 同一时刻只允许一次清理
    running: Arc<Mutex<()>>,
    last_run: Arc<RwLock<Option<CleanupSummary>>>,
}

impl ExportServer {
    pub fn new(config: Config, env: Arc<ServerEnv>) -> Result<Self> {
        let database = env.database().ok_or(Error::MissingDatabase)?.clone();
        let blobstore = env.blobstore().ok_or(Error::MissingBlobstore)?.clone();

        let orchestrator = Arc::new(CleanupOrchestrator::new(
            database,
            blobstore,
            config.ttl,
            config.workers,
        ));

        Ok(ExportServer {
            config,
            env,
            orchestrator,
            running: Arc::new(Mutex::new(())),
            last_run: Arc::new(RwLock::new(None)),
        })
    }

    pub fn env(&self) -> &Arc<ServerEnv> {
        &self.env
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn last_run(&self) -> Option<CleanupSummary> {
        self.last_run.read().await.clone()
    }

    /// 在超时限制内执行一次清理。
    ///
    /// 清理器在 `soft_deadline` 之后不再开始新批次并返回部分结果；若仍有批次拖过
    /// 超时则立即返回错误，后台的清理继续运行至完成并记录结果，
    /// 在此之前新的调用会得到 `CleanupInProgress`。
    pub async fn invoke(&self) -> Result<CleanupSummary> {
        let guard = self
            .running
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::CleanupInProgress)?;

        let run_id = Uuid::new_v4();
        let reference_time = Utc::now();
        let timeout = self.config.timeout;
        let deadline = Instant::now() + soft_deadline(timeout);
        info!(
            "[{run_id}] Starting export cleanup at {reference_time} (TTL: {}, timeout: {})",
            humantime::format_duration(self.config.ttl),
            humantime::format_duration(timeout)
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let last_run = Arc::clone(&self.last_run);
        let task = tokio::spawn(async move {
            let outcome = orchestrator.run(reference_time, deadline).await?;
            janitor::log_outcome(&run_id.to_string(), &outcome);

            let summary = CleanupSummary {
                run_id,
                reference_time,
                outcome,
            };
            // 即使调用方已超时放弃，结果仍然记录下来
            *last_run.write().await = Some(summary.clone());
            drop(guard);

            Ok::<_, Error>(summary)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                error!(
                    "[{run_id}] Export cleanup did not finish within {timeout:?}, abandoning it"
                );

                Err(Error::Timeout(timeout))
            }
        }
    }

    pub fn routes(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(routes::cleanup::run).post(routes::cleanup::run))
            .route("/status", get(routes::cleanup::status))
            .with_state(self)
    }
}
