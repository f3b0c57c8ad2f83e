//! Records exchanged with the control plane

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ETL job definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlJob {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Lifecycle state of a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobRunState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Succeeded,
    Failed,
    Timeout,
    Error,
    Waiting,
    Expired,
    #[serde(other)]
    Unknown,
}

impl JobRunState {
    /// States that count as a failed run
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            JobRunState::Failed | JobRunState::Timeout | JobRunState::Error | JobRunState::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobRunState::Starting => "STARTING",
            JobRunState::Running => "RUNNING",
            JobRunState::Stopping => "STOPPING",
            JobRunState::Stopped => "STOPPED",
            JobRunState::Succeeded => "SUCCEEDED",
            JobRunState::Failed => "FAILED",
            JobRunState::Timeout => "TIMEOUT",
            JobRunState::Error => "ERROR",
            JobRunState::Waiting => "WAITING",
            JobRunState::Expired => "EXPIRED",
            JobRunState::Unknown => "UNKNOWN",
        }
    }
}

/// One execution of an ETL job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub id: String,
    pub job_name: String,
    #[serde(default)]
    pub started_on: Option<DateTime<Utc>>,
    pub job_run_state: JobRunState,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Execution time in seconds
    #[serde(default)]
    pub execution_time: Option<u64>,
}

/// How a dataset's data is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMode {
    /// Imported into the in-memory engine, refreshed by ingestions
    Spice,
    /// Queried live, never ingested
    DirectQuery,
    #[serde(other)]
    Unknown,
}

/// A dashboard dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub data_set_id: String,
    pub name: String,
    pub import_mode: ImportMode,
}

/// Status of a dataset ingestion (refresh)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestionStatus {
    Initialized,
    Queued,
    Running,
    Failed,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl IngestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionStatus::Initialized => "INITIALIZED",
            IngestionStatus::Queued => "QUEUED",
            IngestionStatus::Running => "RUNNING",
            IngestionStatus::Failed => "FAILED",
            IngestionStatus::Completed => "COMPLETED",
            IngestionStatus::Cancelled => "CANCELLED",
            IngestionStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionErrorInfo {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One refresh of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingestion {
    pub ingestion_id: String,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    pub ingestion_status: IngestionStatus,
    #[serde(default)]
    pub error_info: Option<IngestionErrorInfo>,
}

/// Account-wide subscription rule for error log lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRouteRequest {
    pub policy_name: String,
    pub filter_pattern: String,
    /// Selector naming the log groups the policy skips
    pub selection_criteria: String,
    pub destination: String,
}

/// Per-log-group subscription filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub route_name: String,
    pub log_group: String,
    pub filter_pattern: String,
    pub destination: String,
}

/// Identifier the platform assigns to a created route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteId(pub String);

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
