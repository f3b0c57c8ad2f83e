//! Single-event formatters
//!
//! Each platform event is decoded from its JSON payload and turned into at
//! most one notification. No scanning happens here.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::alerts::Notification;
use crate::control_plane::JobRunState;
use crate::links::console_link;

/// An ETL job run changed state
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStateChangeEvent {
    pub job_name: String,
    pub job_run_id: String,
    pub state: JobRunState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl JobStateChangeEvent {
    /// Only failure states produce a notification
    pub fn notification(&self) -> Option<Notification> {
        if !self.state.is_failure() {
            return None;
        }

        let subject = format!("ETL job {} {}", self.job_name, self.state.as_str());
        let mut message = format!(
            "Job: {}\nRun: {}\nState: {}\n",
            self.job_name,
            self.job_run_id,
            self.state.as_str()
        );
        if let Some(time) = self.time {
            let _ = writeln!(message, "Time: {}", time.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        if let Some(error) = &self.message {
            let _ = writeln!(message, "Error: {error}");
        }
        Some(Notification::new(subject, message))
    }
}

/// A metric alarm moved between states
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmStateChangeEvent {
    pub alarm_name: String,
    pub old_state: String,
    pub new_state: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl AlarmStateChangeEvent {
    pub fn notification(&self) -> Notification {
        let subject = format!("Alarm {}: {} -> {}", self.alarm_name, self.old_state, self.new_state);
        let mut message = format!(
            "Alarm: {}\nPrevious state: {}\nCurrent state: {}\n",
            self.alarm_name, self.old_state, self.new_state
        );
        if let Some(time) = self.time {
            let _ = writeln!(message, "Time: {}", time.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        if let Some(reason) = &self.reason {
            let _ = writeln!(message, "Reason: {reason}");
        }
        Notification::new(subject, message)
    }
}

/// One log line delivered by a route
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogLine {
    pub id: String,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    pub message: String,
}

/// A batch of matching log lines from one log stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogErrorEvent {
    pub log_group: String,
    pub log_stream: String,
    #[serde(default)]
    pub log_events: Vec<LogLine>,
}

impl LogErrorEvent {
    pub fn console_link(&self, region: &str) -> String {
        console_link(region, &self.log_group, &self.log_stream)
    }

    /// `None` for an empty batch
    pub fn notification(&self, region: &str) -> Option<Notification> {
        if self.log_events.is_empty() {
            return None;
        }

        let subject = format!("{} error(s) in {}", self.log_events.len(), self.log_group);
        let mut message = format!(
            "Log group: {}\nLog stream: {}\nView: {}\n\n",
            self.log_group,
            self.log_stream,
            self.console_link(region)
        );
        for line in &self.log_events {
            let at = DateTime::<Utc>::from_timestamp_millis(line.timestamp)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
                .unwrap_or_else(|| line.timestamp.to_string());
            let _ = writeln!(message, "[{}] {}", at, line.message.trim_end());
        }
        Some(Notification::new(subject, message))
    }
}

/// A new log group was created
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroupCreatedEvent {
    pub log_group_name: String,
}
