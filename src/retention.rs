//! Default retention for newly created log groups

use std::sync::Arc;

use crate::audits::LogGroupCreatedEvent;
use crate::backoff::{BackoffError, BackoffExecutor};
use crate::control_plane::{ControlPlaneError, LogGroupAdmin};

/// Retention periods the log platform accepts, in days
pub const ALLOWED_RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    #[error("{0} days is not an accepted retention period")]
    UnsupportedDays(u32),

    #[error("Log group name is empty")]
    EmptyLogGroup,

    #[error("Setting retention on {log_group} failed: {source}")]
    Apply {
        log_group: String,
        source: BackoffError<ControlPlaneError>,
    },
}

/// A validated retention period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionDays(u32);

impl RetentionDays {
    pub fn new(days: u32) -> Result<Self, RetentionError> {
        if ALLOWED_RETENTION_DAYS.contains(&days) {
            Ok(Self(days))
        } else {
            Err(RetentionError::UnsupportedDays(days))
        }
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

/// Applies the configured retention to log groups as they appear
pub struct RetentionApplier {
    admin: Arc<dyn LogGroupAdmin>,
    executor: BackoffExecutor,
    retention: RetentionDays,
}

impl RetentionApplier {
    pub fn new(admin: Arc<dyn LogGroupAdmin>, executor: BackoffExecutor, retention: RetentionDays) -> Self {
        Self {
            admin,
            executor,
            retention,
        }
    }

    pub async fn on_created(&self, event: &LogGroupCreatedEvent) -> Result<RetentionDays, RetentionError> {
        self.apply(&event.log_group_name).await
    }

    pub async fn apply(&self, log_group: &str) -> Result<RetentionDays, RetentionError> {
        if log_group.trim().is_empty() {
            return Err(RetentionError::EmptyLogGroup);
        }

        let admin = self.admin.as_ref();
        let days = self.retention.days();
        tracing::debug!(log_group = %log_group, days, "Setting log retention");

        self.executor
            .execute("put retention policy", move || admin.put_retention_policy(log_group, days))
            .await
            .map_err(|source| RetentionError::Apply {
                log_group: log_group.to_string(),
                source,
            })?;

        tracing::info!(log_group = %log_group, days, "Log retention set");
        Ok(self.retention)
    }
}
