use std::sync::Arc;

use crate::{errors::Result, server::ExportServer};
use log::{error, info};
use tokio_cron_scheduler::{Job, JobScheduler};

/// 按 cron 表达式定期触发清理，与 HTTP 调用共用同一个服务实例。
pub async fn start(schedule: &str, server: Arc<ExportServer>) -> Result<JobScheduler> {
    let mut sched = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_, _| {
        let server = Arc::clone(&server);
        Box::pin(async move {
            // 成功的运行已由服务记录日志
            if let Err(e) = server.invoke().await {
                error!("Scheduled export cleanup failed: {e}");
            }
        })
    })?;
    sched.add(job).await?;
    info!("Export cleanup scheduled with '{schedule}'");

    sched.set_shutdown_handler(Box::new(|| {
        Box::pin(async move {
            info!("Job scheduler is shutting down");
        })
    }));

    sched.start().await?;

    Ok(sched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blobstore::ObjectBlobStore, config::Config, environment::ServerEnv,
        testing::MemoryRepository,
    };

    fn server() -> Arc<ExportServer> {
        let env = ServerEnv::new()
            .with_database(Arc::new(MemoryRepository::default()))
            .with_blobstore(Arc::new(ObjectBlobStore::in_memory()));

        Arc::new(ExportServer::new(Config::default(), Arc::new(env)).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_schedule() {
        assert!(start("every now and then", server()).await.is_err());
    }

    #[tokio::test]
    async fn test_scheduled_cleanup_runs() {
        let server = server();
        let mut sched = start("* * * * * *", server.clone()).await.unwrap();

        // 每秒触发一次，等待第一次运行完成
        let mut ran = false;
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if server.last_run().await.is_some() {
                ran = true;
                break;
            }
        }
        sched.shutdown().await.unwrap();

        assert!(ran);
    }
}
