use serde::{Deserialize, Serialize};

/// Opaque continuation token issued by a listing API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanCursor(String);

impl ScanCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<ScanCursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<ScanCursor>) -> Self {
        Self { items, next_cursor }
    }

    /// Continuation cursor, treating an empty token as absent
    pub fn continuation(&self) -> Option<&ScanCursor> {
        self.next_cursor.as_ref().filter(|c| !c.0.is_empty())
    }
}
