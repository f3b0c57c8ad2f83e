//! Latest provisioning outcome, per route

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Lifecycle of a single route
///
/// `Pending → Creating → Active | Failed`. `Failed` is terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RouteState {
    Pending,
    Creating,
    Active { route_id: Option<String> },
    Failed { error: String },
}

impl RouteState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteState::Active { .. } | RouteState::Failed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RouteState::Failed { .. })
    }

    /// Whether moving to `next` follows the lifecycle
    fn allows(&self, next: &RouteState) -> bool {
        matches!(
            (self, next),
            (RouteState::Pending, RouteState::Creating)
                | (RouteState::Creating, RouteState::Active { .. })
                | (RouteState::Creating, RouteState::Failed { .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRecord {
    pub route_name: String,
    /// `None` for the account-wide default route
    pub log_group: Option<String>,
    pub state: RouteState,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerSnapshot {
    pub provisioned_at: Option<DateTime<Utc>>,
    pub routes: Vec<RouteRecord>,
}

/// Shared record of the most recent provisioning run
///
/// A new run replaces the whole ledger.
#[derive(Debug, Clone, Default)]
pub struct RouteLedger {
    inner: Arc<RwLock<LedgerSnapshot>>,
}

impl RouteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run with every route pending
    pub fn reset(&self, routes: impl IntoIterator<Item = (String, Option<String>)>) {
        let mut snapshot = self.inner.write();
        snapshot.provisioned_at = Some(Utc::now());
        snapshot.routes = routes
            .into_iter()
            .map(|(route_name, log_group)| RouteRecord {
                route_name,
                log_group,
                state: RouteState::Pending,
            })
            .collect();
    }

    /// Move a route to its next state; out-of-order transitions are ignored
    pub fn transition(&self, route_name: &str, next: RouteState) -> bool {
        let mut snapshot = self.inner.write();
        let Some(record) = snapshot.routes.iter_mut().find(|r| r.route_name == route_name) else {
            return false;
        };

        if !record.state.allows(&next) {
            tracing::warn!(
                route = %route_name,
                from = ?record.state,
                to = ?next,
                "Ignoring invalid route transition"
            );
            return false;
        }

        tracing::debug!(route = %route_name, state = ?next, "Route state changed");
        record.state = next;
        true
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.read().clone()
    }
}
