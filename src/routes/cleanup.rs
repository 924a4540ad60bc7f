use std::sync::Arc;

use crate::{
    errors::Result,
    models::payload::{CleanupSummary, Status},
    server::ExportServer,
    vars::STARTED_AT,
};
use axum::{Json, extract::State};

pub async fn run(State(server): State<Arc<ExportServer>>) -> Result<Json<CleanupSummary>> {
    Ok(Json(server.invoke().await?))
}

pub async fn status(State(server): State<Arc<ExportServer>>) -> Json<Status> {
    let config = server.config();

    Json(Status {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: STARTED_AT.get().cloned(),
        ttl: humantime::format_duration(config.ttl).to_string(),
        timeout: humantime::format_duration(config.timeout).to_string(),
        last_run: server.last_run().await,
    })
}
