use std::sync::Arc;

use crate::{
    config::Config,
    environment::ServerEnv,
    errors::Result,
    server::ExportServer,
    vars::{CLEANUP_BLOBSTORE_URL, CLEANUP_DATABASE_URL},
};

/// 执行一次清理并输出结果，有批次失败时以非零状态退出。
pub async fn run() -> Result<()> {
    println!("Running export cleanup...");
    let config = Config::from_env()?;
    let env = ServerEnv::connect(*CLEANUP_DATABASE_URL, *CLEANUP_BLOBSTORE_URL).await?;
    let server = ExportServer::new(config, Arc::new(env))?;

    let summary = server.invoke().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).unwrap_or_else(|e| e.to_string())
    );

    if summary.outcome.has_failures() {
        eprintln!(
            "Cleanup completed with {} failed batch(es)",
            summary.outcome.failures.len()
        );
        std::process::exit(1);
    }
    println!(
        "Cleanup completed. Total batches cleaned: {}",
        summary.outcome.cleaned
    );

    Ok(())
}
