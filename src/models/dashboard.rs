use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::PoolRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardStatus {
    /// Aggregation in progress; `progress` is in `[0, 1]`.
    Loading { progress: f64 },
    Ready,
    Failed { message: String },
}

/// What the dashboard shows at one instant. Records are shared, so cloning a
/// snapshot for a reader is cheap.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub status: DashboardStatus,
    #[serde(skip)]
    pub records: Arc<Vec<PoolRecord>>,
    pub updated_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    pub fn loading(progress: f64, records: Arc<Vec<PoolRecord>>) -> Self {
        Self {
            status: DashboardStatus::Loading { progress },
            records,
            updated_at: Utc::now(),
        }
    }

    pub fn ready(records: Arc<Vec<PoolRecord>>) -> Self {
        Self {
            status: DashboardStatus::Ready,
            records,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(message: String, records: Arc<Vec<PoolRecord>>) -> Self {
        Self {
            status: DashboardStatus::Failed { message },
            records,
            updated_at: Utc::now(),
        }
    }

    pub fn progress(&self) -> f64 {
        match self.status {
            DashboardStatus::Loading { progress } => progress,
            DashboardStatus::Ready => 1.0,
            DashboardStatus::Failed { .. } => 0.0,
        }
    }

    /// JSON body for `/status` and WebSocket pushes.
    pub fn status_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "progress": self.progress(),
            "pools": self.records.len(),
            "updated_at": self.updated_at,
        })
    }
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self::loading(0.0, Arc::new(Vec::new()))
    }
}
