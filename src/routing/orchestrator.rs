//! Plans and applies log routes
//!
//! Planning is pure and validates the whole table. Applying registers the
//! default route, then creates custom routes strictly one after another:
//! the platform rejects bursts of subscription changes, so route N+1 is
//! not started until route N has been acknowledged.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;

use super::default_route::DefaultRoute;
use super::ledger::{RouteLedger, RouteRecord, RouteState};
use super::pattern::{RoutingEntry, RoutingTable};
use super::RoutingError;
use crate::backoff::BackoffExecutor;
use crate::control_plane::{DefaultRouteRequest, LogRoutingPlatform, RouteRequest};

/// Fixed settings for one deployment's routes
#[derive(Debug, Clone, Serialize)]
pub struct RoutingConfig {
    /// Log group of the function that delivers alerts
    pub own_log_group: String,
    /// Where matching log lines are delivered
    pub destination: String,
    /// Filter expression of the default route
    pub default_pattern: String,
    /// Name of the account-wide policy
    pub policy_name: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            own_log_group: "/aws/lambda/alert-for-log-group-error-function".to_string(),
            destination: String::new(),
            default_pattern: "?ERROR ?Error ?Exception".to_string(),
            policy_name: "error-log-default-route".to_string(),
        }
    }
}

fn illegal_route_chars() -> &'static Regex {
    static ILLEGAL: OnceLock<Regex> = OnceLock::new();
    ILLEGAL.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("static pattern compiles"))
}

/// Drop characters that may not appear in a route identifier
pub fn sanitize_log_group_name(log_group: &str) -> String {
    illegal_route_chars().replace_all(log_group, "").into_owned()
}

/// `{error_type}-{sanitized log group}`
pub fn route_name(error_type: &str, log_group: &str) -> String {
    format!("{}-{}", error_type, sanitize_log_group_name(log_group))
}

/// One custom route to create
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRoute {
    pub route_name: String,
    pub log_group: String,
    pub error_type: String,
    pub log_pattern: String,
}

/// Complete, validated set of routes for a deployment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub default_route: DefaultRoute,
    /// Custom routes in table order
    pub routes: Vec<PlannedRoute>,
}

impl RoutePlan {
    pub fn build(table: &RoutingTable, config: &RoutingConfig) -> Result<Self, RoutingError> {
        if table.contains(&config.own_log_group) {
            return Err(RoutingError::SelfRouted(config.own_log_group.clone()));
        }

        let mut routes = Vec::with_capacity(table.route_count());
        let mut owners: HashMap<String, String> = HashMap::new();
        owners.insert(config.policy_name.clone(), "the default route".to_string());

        for (log_group, patterns) in table.iter() {
            if !patterns.is_empty() && sanitize_log_group_name(log_group).is_empty() {
                return Err(RoutingError::EmptyRouteName {
                    log_group: log_group.to_string(),
                });
            }
            for pattern in patterns.iter() {
                let name = route_name(&pattern.error_type, log_group);

                if let Some(first) = owners.insert(name.clone(), log_group.to_string()) {
                    return Err(RoutingError::RouteNameCollision {
                        route_name: name,
                        first,
                        second: log_group.to_string(),
                    });
                }

                routes.push(PlannedRoute {
                    route_name: name,
                    log_group: log_group.to_string(),
                    error_type: pattern.error_type.clone(),
                    log_pattern: pattern.log_pattern.clone(),
                });
            }
        }

        Ok(Self {
            default_route: DefaultRoute::for_table(
                table,
                &config.own_log_group,
                config.default_pattern.clone(),
            ),
            routes,
        })
    }
}

/// Routes left failed by a provisioning run
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} route(s) failed: {}", failed.len(), failed.join(", "))]
pub struct IncompleteProvisioning {
    pub failed: Vec<String>,
}

/// Outcome of one provisioning run
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub default_route: RouteRecord,
    pub routes: Vec<RouteRecord>,
}

impl ProvisionReport {
    pub fn failed(&self) -> impl Iterator<Item = &RouteRecord> {
        std::iter::once(&self.default_route)
            .chain(self.routes.iter())
            .filter(|r| r.state.is_failed())
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn ensure_complete(&self) -> Result<(), IncompleteProvisioning> {
        let failed: Vec<String> = self.failed().map(|r| r.route_name.clone()).collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(IncompleteProvisioning { failed })
        }
    }
}

/// Applies a [`RoutePlan`] against the routing platform
pub struct RoutingOrchestrator {
    platform: Arc<dyn LogRoutingPlatform>,
    executor: BackoffExecutor,
    config: RoutingConfig,
    ledger: RouteLedger,
}

impl RoutingOrchestrator {
    pub fn new(
        platform: Arc<dyn LogRoutingPlatform>,
        executor: BackoffExecutor,
        config: RoutingConfig,
    ) -> Self {
        Self {
            platform,
            executor,
            config,
            ledger: RouteLedger::new(),
        }
    }

    /// Share an existing ledger, e.g. with the HTTP status endpoint
    pub fn with_ledger(mut self, ledger: RouteLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &RouteLedger {
        &self.ledger
    }

    /// Validate raw configuration entries, then provision them
    pub async fn provision_entries(
        &self,
        entries: Vec<RoutingEntry>,
    ) -> Result<ProvisionReport, RoutingError> {
        let table = RoutingTable::from_entries(entries)?;
        self.provision(&table).await
    }

    /// Register the default route and every custom route of `table`
    ///
    /// Configuration errors are returned before any remote call. Remote
    /// failures mark the affected route `Failed` and are reported, not
    /// returned.
    pub async fn provision(&self, table: &RoutingTable) -> Result<ProvisionReport, RoutingError> {
        let plan = RoutePlan::build(table, &self.config)?;

        tracing::info!(
            log_groups = table.len(),
            routes = plan.routes.len(),
            excluded = plan.default_route.excluded.len(),
            "Provisioning log routes"
        );

        self.ledger.reset(
            std::iter::once((self.config.policy_name.clone(), None)).chain(
                plan.routes
                    .iter()
                    .map(|r| (r.route_name.clone(), Some(r.log_group.clone()))),
            ),
        );

        self.apply_default_route(&plan.default_route).await;

        for route in &plan.routes {
            self.create_route(route).await;
        }

        let snapshot = self.ledger.snapshot();
        let mut records = snapshot.routes.into_iter();
        let default_route = records.next().unwrap_or(RouteRecord {
            route_name: self.config.policy_name.clone(),
            log_group: None,
            state: RouteState::Pending,
        });
        let report = ProvisionReport {
            default_route,
            routes: records.collect(),
        };

        let failed = report.failed().count();
        if failed > 0 {
            tracing::error!(failed, "Log route provisioning finished with failures");
        } else {
            tracing::info!("Log route provisioning complete");
        }
        Ok(report)
    }

    async fn apply_default_route(&self, default_route: &DefaultRoute) {
        let name = self.config.policy_name.as_str();
        let request = DefaultRouteRequest {
            policy_name: name.to_string(),
            filter_pattern: default_route.pattern.clone(),
            selection_criteria: default_route.selection_criteria(),
            destination: self.config.destination.clone(),
        };

        self.ledger.transition(name, RouteState::Creating);

        let platform = &self.platform;
        let request = &request;
        let result = self
            .executor
            .execute(name, move || platform.put_default_route(request))
            .await;

        match result {
            Ok(()) => {
                tracing::info!(route = %name, "Default route registered");
                self.ledger
                    .transition(name, RouteState::Active { route_id: None });
            }
            Err(e) => {
                tracing::error!(route = %name, error = %e, "Default route registration failed");
                self.ledger.transition(
                    name,
                    RouteState::Failed {
                        error: e.to_string(),
                    },
                );
            }
        }
    }

    /// Create one route and wait for its acknowledgment
    async fn create_route(&self, route: &PlannedRoute) {
        let request = RouteRequest {
            route_name: route.route_name.clone(),
            log_group: route.log_group.clone(),
            filter_pattern: route.log_pattern.clone(),
            destination: self.config.destination.clone(),
        };

        self.ledger.transition(&route.route_name, RouteState::Creating);

        let platform = &self.platform;
        let request = &request;
        let result = self
            .executor
            .execute(&route.route_name, move || platform.create_route(request))
            .await;

        match result {
            Ok(route_id) => {
                tracing::info!(
                    route = %route.route_name,
                    log_group = %route.log_group,
                    route_id = %route_id,
                    "Route created"
                );
                self.ledger.transition(
                    &route.route_name,
                    RouteState::Active {
                        route_id: Some(route_id.0),
                    },
                );
            }
            Err(e) => {
                tracing::error!(
                    route = %route.route_name,
                    log_group = %route.log_group,
                    error = %e,
                    "Route creation failed"
                );
                self.ledger.transition(
                    &route.route_name,
                    RouteState::Failed {
                        error: e.to_string(),
                    },
                );
            }
        }
    }
}
