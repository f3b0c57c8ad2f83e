//! Process configuration read from `EWS_*` environment variables

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::retention::{RetentionDays, RetentionError};
use crate::routing::{RoutingConfig, RoutingError, RoutingTable};
use crate::scan::{TimeWindow, DEFAULT_MAX_PAGES};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("Cannot read routing table {path}: {source}")]
    RoutingTableIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Routing table {path}: {source}")]
    RoutingTable { path: PathBuf, source: RoutingError },

    #[error("EWS_LOG_RETENTION_DAYS: {0}")]
    Retention(#[from] RetentionError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Label prefixed to every alert subject
    pub environment: String,
    pub region: String,
    pub account_id: String,
    pub control_plane_url: String,
    pub request_timeout: Duration,
    /// Alerts are only logged when unset
    pub notify_webhook_url: Option<String>,
    /// Sent as a bearer token to the webhook
    pub notify_webhook_token: Option<String>,
    pub etl_hours_back: u32,
    pub dataset_hours_back: u32,
    pub backoff: BackoffPolicy,
    pub max_pages: usize,
    pub job_runs_page_size: u32,
    pub routing: RoutingConfig,
    pub routing_table_path: Option<PathBuf>,
    pub log_retention: RetentionDays,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backoff_defaults = BackoffPolicy::default();
        let backoff = BackoffPolicy {
            max_attempts: parse_or(&get, "EWS_BACKOFF_MAX_ATTEMPTS", backoff_defaults.max_attempts)?,
            base_delay_ms: parse_or(&get, "EWS_BACKOFF_BASE_MS", backoff_defaults.base_delay_ms)?,
            max_delay_ms: parse_or(&get, "EWS_BACKOFF_MAX_MS", backoff_defaults.max_delay_ms)?,
            jitter_ms: parse_or(&get, "EWS_BACKOFF_JITTER_MS", backoff_defaults.jitter_ms)?,
        };
        if backoff.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "EWS_BACKOFF_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        let routing_defaults = RoutingConfig::default();
        let routing = RoutingConfig {
            own_log_group: get("EWS_OWN_LOG_GROUP").unwrap_or(routing_defaults.own_log_group),
            destination: get("EWS_ROUTE_DESTINATION").unwrap_or(routing_defaults.destination),
            default_pattern: get("EWS_DEFAULT_ROUTE_PATTERN")
                .unwrap_or(routing_defaults.default_pattern),
            policy_name: get("EWS_DEFAULT_ROUTE_POLICY").unwrap_or(routing_defaults.policy_name),
        };

        let retention_days: u32 = parse_or(&get, "EWS_LOG_RETENTION_DAYS", 30)?;

        Ok(Self {
            host: get("EWS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "EWS_PORT", 8080)?,
            environment: get("EWS_ACCOUNT_ENVIRONMENT").unwrap_or_else(|| "dev".to_string()),
            region: get("EWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            account_id: get("EWS_ACCOUNT_ID").unwrap_or_default(),
            control_plane_url: get("EWS_CONTROL_PLANE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:9000".to_string()),
            request_timeout: Duration::from_secs(parse_or(&get, "EWS_REQUEST_TIMEOUT_SECS", 30)?),
            notify_webhook_url: get("EWS_NOTIFY_WEBHOOK_URL"),
            notify_webhook_token: get("EWS_NOTIFY_WEBHOOK_TOKEN"),
            etl_hours_back: window_hours(&get, "EWS_ETL_HOURS_BACK")?,
            dataset_hours_back: window_hours(&get, "EWS_DATASET_HOURS_BACK")?,
            backoff,
            max_pages: positive(&get, "EWS_MAX_PAGES", DEFAULT_MAX_PAGES)?,
            job_runs_page_size: positive(&get, "EWS_JOB_RUNS_PAGE_SIZE", 25)?,
            routing,
            routing_table_path: get("EWS_ROUTING_TABLE").map(PathBuf::from),
            log_retention: RetentionDays::new(retention_days)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Account id, required by the dataset listing
    pub fn require_account_id(&self) -> Result<&str, ConfigError> {
        if self.account_id.is_empty() {
            return Err(ConfigError::Missing { var: "EWS_ACCOUNT_ID" });
        }
        Ok(&self.account_id)
    }

    /// Load the routing table file; no file means no custom routes
    pub fn load_routing_table(&self) -> Result<RoutingTable, ConfigError> {
        let Some(path) = &self.routing_table_path else {
            return Ok(RoutingTable::new());
        };

        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::RoutingTableIo {
            path: path.clone(),
            source,
        })?;
        RoutingTable::from_json(&json).map_err(|source| ConfigError::RoutingTable {
            path: path.clone(),
            source,
        })
    }
}

fn parse_or<G, T>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn positive<G, T>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = parse_or(get, var, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Audit window length; must fit a window ending now
fn window_hours<G>(get: &G, var: &'static str) -> Result<u32, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let hours = positive(get, var, 24)?;
    TimeWindow::trailing_hours(hours).map_err(|e| ConfigError::Invalid {
        var,
        value: hours.to_string(),
        reason: e.to_string(),
    })?;
    Ok(hours)
}
