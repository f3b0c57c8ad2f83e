//! The account-wide fallback route and its exclusion set

use std::collections::BTreeSet;

use serde::Serialize;

use super::pattern::RoutingTable;

/// Log groups the default route must skip: every custom-routed group plus
/// the alerting system's own log group
pub fn excluded_log_groups(table: &RoutingTable, own_log_group: &str) -> BTreeSet<String> {
    table
        .log_groups()
        .chain(std::iter::once(own_log_group))
        .map(str::to_string)
        .collect()
}

/// Account-wide routing rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefaultRoute {
    pub pattern: String,
    pub excluded: BTreeSet<String>,
}

impl DefaultRoute {
    pub fn for_table(table: &RoutingTable, own_log_group: &str, pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            excluded: excluded_log_groups(table, own_log_group),
        }
    }

    /// Selector in the platform's policy language, e.g.
    /// `LogGroupName NOT IN ["a", "b"]`
    ///
    /// Names are emitted as JSON string literals so quotes and backslashes
    /// in a log group name stay inside their literal.
    pub fn selection_criteria(&self) -> String {
        let names: Vec<String> = self
            .excluded
            .iter()
            .map(|name| serde_json::Value::String(name.clone()).to_string())
            .collect();
        format!("LogGroupName NOT IN [{}]", names.join(", "))
    }
}
