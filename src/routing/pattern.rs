//! Error log patterns and the per-log-group routing table

use serde::{Deserialize, Serialize};

use super::RoutingError;

/// The platform accepts at most two subscription filters per log group
pub const MAX_CUSTOM_ROUTES: usize = 2;

/// A labelled log filter expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogPattern {
    /// Short label used in the route name, e.g. `oom`
    pub error_type: String,
    /// Filter expression matched against log lines
    pub log_pattern: String,
}

impl ErrorLogPattern {
    pub fn new(error_type: impl Into<String>, log_pattern: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            log_pattern: log_pattern.into(),
        }
    }
}

/// Pattern set that exceeds the per-group route limit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{count} patterns given, at most {max} routes fit on one log group", max = MAX_CUSTOM_ROUTES)]
pub struct CardinalityError {
    pub count: usize,
}

/// Zero, one or two patterns routed from one log group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorLogPatternSet(Vec<ErrorLogPattern>);

impl ErrorLogPatternSet {
    pub fn new(patterns: Vec<ErrorLogPattern>) -> Result<Self, CardinalityError> {
        if patterns.len() > MAX_CUSTOM_ROUTES {
            return Err(CardinalityError {
                count: patterns.len(),
            });
        }
        Ok(Self(patterns))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorLogPattern> {
        self.0.iter()
    }
}

/// One routing table entry as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub log_group: String,
    #[serde(default)]
    pub patterns: Vec<ErrorLogPattern>,
}

/// Log groups that get custom routes, in insertion order
///
/// Every key is excluded from the default route.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutingTable {
    entries: Vec<(String, ErrorLogPatternSet)>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a log group
    pub fn insert(
        &mut self,
        log_group: impl Into<String>,
        patterns: Vec<ErrorLogPattern>,
    ) -> Result<(), RoutingError> {
        let log_group = log_group.into();

        if log_group.trim().is_empty() {
            return Err(RoutingError::EmptyLogGroupName);
        }
        if self.contains(&log_group) {
            return Err(RoutingError::DuplicateLogGroup(log_group));
        }
        if let Some(pattern) = patterns
            .iter()
            .find(|p| p.error_type.trim().is_empty() || p.log_pattern.trim().is_empty())
        {
            return Err(RoutingError::EmptyPattern {
                log_group,
                error_type: pattern.error_type.clone(),
            });
        }

        let set = ErrorLogPatternSet::new(patterns).map_err(|source| RoutingError::Cardinality {
            log_group: log_group.clone(),
            source,
        })?;
        self.entries.push((log_group, set));
        Ok(())
    }

    /// Build a table from configuration entries, failing on the first invalid one
    pub fn from_entries(entries: Vec<RoutingEntry>) -> Result<Self, RoutingError> {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry.log_group, entry.patterns)?;
        }
        Ok(table)
    }

    /// Parse the JSON list form `[{"log_group": .., "patterns": [..]}]`
    pub fn from_json(json: &str) -> Result<Self, RoutingError> {
        let entries: Vec<RoutingEntry> =
            serde_json::from_str(json).map_err(|e| RoutingError::Parse(e.to_string()))?;
        Self::from_entries(entries)
    }

    pub fn contains(&self, log_group: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == log_group)
    }

    pub fn log_groups(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorLogPatternSet)> {
        self.entries.iter().map(|(name, set)| (name.as_str(), set))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of custom routes the table asks for
    pub fn route_count(&self) -> usize {
        self.entries.iter().map(|(_, set)| set.len()).sum()
    }
}
