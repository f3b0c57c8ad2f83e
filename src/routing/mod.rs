//! Log-error routing across monitored log groups
//!
//! One account-wide default route covers every log group except the ones
//! listed in the [`RoutingTable`] and the alerting system's own group. Each
//! listed group gets up to [`MAX_CUSTOM_ROUTES`] routes of its own, created
//! one at a time.

pub mod default_route;
pub mod ledger;
pub mod orchestrator;
pub mod pattern;

pub use default_route::{excluded_log_groups, DefaultRoute};
pub use ledger::{RouteLedger, RouteRecord, RouteState};
pub use orchestrator::{
    route_name, sanitize_log_group_name, IncompleteProvisioning, PlannedRoute, ProvisionReport,
    RoutePlan, RoutingConfig, RoutingOrchestrator,
};
pub use pattern::{
    CardinalityError, ErrorLogPattern, ErrorLogPatternSet, RoutingEntry, RoutingTable,
    MAX_CUSTOM_ROUTES,
};

/// Routing configuration errors
///
/// All of these are raised before any remote call is made.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("Log group {log_group}: {source}")]
    Cardinality {
        log_group: String,
        source: CardinalityError,
    },

    #[error("Log group listed twice: {0}")]
    DuplicateLogGroup(String),

    #[error("Log group name is empty")]
    EmptyLogGroupName,

    #[error("Log group {log_group}: pattern {error_type:?} has an empty label or expression")]
    EmptyPattern { log_group: String, error_type: String },

    #[error("Log group {log_group:?} has no characters usable in a route name")]
    EmptyRouteName { log_group: String },

    #[error("Log group {0} is the alerting system's own log group and cannot be routed")]
    SelfRouted(String),

    #[error("Route name {route_name} is produced by both {first} and {second}")]
    RouteNameCollision {
        route_name: String,
        first: String,
        second: String,
    },

    #[error("Invalid routing table: {0}")]
    Parse(String),
}
