//! Scheduled audits and event formatters
//!
//! Scheduled audits scan the control plane over a trailing window and
//! publish one summary when they find something. Event formatters turn a
//! single platform event into a notification without scanning.

pub mod datasets;
pub mod etl;
pub mod events;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use datasets::{DatasetFinding, DatasetRefreshAudit};
pub use etl::{EtlFailureAudit, FailedRun};
pub use events::{
    AlarmStateChangeEvent, JobStateChangeEvent, LogErrorEvent, LogGroupCreatedEvent, LogLine,
};

use crate::scan::{ScanError, TimeWindow, WindowError};

/// Default number of resources audited at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Audit errors that prevent the audit from running at all
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Invalid window: {0}")]
    Window(#[from] WindowError),

    #[error("Listing failed: {0}")]
    Listing(#[from] ScanError),
}

/// A single resource that could not be audited
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceFailure {
    pub resource: String,
    pub error: String,
    pub retries_exhausted: bool,
}

impl ResourceFailure {
    pub fn from_scan(resource: &str, error: &ScanError) -> Self {
        Self {
            resource: resource.to_string(),
            error: error.to_string(),
            retries_exhausted: matches!(error, ScanError::RetriesExhausted { .. }),
        }
    }
}

/// Result of one audit invocation
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport<F> {
    pub audit: &'static str,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub resources_scanned: usize,
    pub findings: Vec<F>,
    pub failures: Vec<ResourceFailure>,
    /// Whether a summary was published and accepted by the sink
    pub notified: bool,
}

impl<F> AuditReport<F> {
    fn new(audit: &'static str, window: &TimeWindow) -> Self {
        Self {
            audit,
            window_start: window.start(),
            window_end: window.reference(),
            resources_scanned: 0,
            findings: Vec::new(),
            failures: Vec::new(),
            notified: false,
        }
    }
}
