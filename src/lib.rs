//! Early Warning: operational audits for a cloud account
//!
//! Scans the account's ETL jobs and dashboard datasets for failures over a
//! trailing window, turns platform events into alerts, and keeps log-error
//! routing in place for every monitored log group.
//!
//! # Features
//!
//! - **Backoff**: every control-plane call retries throttling with bounded exponential delays
//! - **Paginated scans**: cursor-driven listings, filtered to a time window page by page
//! - **Audits**: failed ETL runs and datasets without a completed refresh, one summary each
//! - **Events**: job, alarm and log-error events formatted into notifications
//! - **Log routing**: one default route plus up to two custom routes per log group,
//!   created one at a time
//! - **Retention**: default retention applied to newly created log groups
//!
//! # Example
//!
//! ```no_run
//! use early_warning::routing::{ErrorLogPattern, RoutingTable};
//!
//! let mut table = RoutingTable::new();
//! table
//!     .insert("/aws/lambda/etl", vec![ErrorLogPattern::new("oom", "OutOfMemory")])
//!     .unwrap();
//! assert_eq!(table.route_count(), 1);
//! ```

pub mod alerts;
pub mod api;
pub mod audits;
pub mod backoff;
pub mod config;
pub mod control_plane;
pub mod links;
pub mod retention;
pub mod routing;
pub mod scan;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use backoff::{BackoffError, BackoffExecutor, BackoffPolicy};
pub use config::{AppConfig, ConfigError};
pub use routing::{RoutingOrchestrator, RoutingTable};
pub use scan::{PaginatedScanner, TimeWindow};
