use crate::janitor::CleanupOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct CleanupSummary {
    pub run_id: Uuid,
    pub reference_time: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: CleanupOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub version: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ttl: String,
    pub timeout: String,
    pub last_run: Option<CleanupSummary>,
}
