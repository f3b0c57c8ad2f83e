//! Cursor-driven full scans of listing APIs

use std::future::Future;

use super::cursor::{Page, ScanCursor};
use super::window::{filter_window, TimeWindow, TimestampedRecord};
use crate::backoff::{BackoffError, BackoffExecutor};
use crate::control_plane::ControlPlaneError;

/// Default bound on pages fetched by one scan
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Scan errors
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("{listing}: still throttled after {attempts} attempts: {source}")]
    RetriesExhausted {
        listing: String,
        attempts: u32,
        source: ControlPlaneError,
    },

    #[error("{listing}: {source}")]
    ControlPlane {
        listing: String,
        source: ControlPlaneError,
    },

    #[error("{listing}: gave up after {max_pages} pages without reaching the end")]
    PageLimitExceeded { listing: String, max_pages: usize },
}

impl ScanError {
    fn from_backoff(listing: &str, err: BackoffError<ControlPlaneError>) -> Self {
        match err {
            BackoffError::Exhausted { attempts, last } => ScanError::RetriesExhausted {
                listing: listing.to_string(),
                attempts,
                source: last,
            },
            BackoffError::Failed(source) => ScanError::ControlPlane {
                listing: listing.to_string(),
                source,
            },
        }
    }
}

/// Drains paginated listings, one throttling-aware call per page
#[derive(Debug, Clone)]
pub struct PaginatedScanner {
    executor: BackoffExecutor,
    max_pages: usize,
}

impl PaginatedScanner {
    pub fn new(executor: BackoffExecutor) -> Self {
        Self {
            executor,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Collect every item of the listing in server order
    pub async fn scan<T, F, Fut>(&self, listing: &str, list_page: F) -> Result<Vec<T>, ScanError>
    where
        F: FnMut(Option<ScanCursor>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ControlPlaneError>>,
    {
        self.scan_with(listing, list_page, |items| items).await
    }

    /// Collect the items that fall inside `window`, filtering each page as it arrives
    pub async fn scan_window<T, F, Fut>(
        &self,
        listing: &str,
        window: &TimeWindow,
        list_page: F,
    ) -> Result<Vec<T>, ScanError>
    where
        T: TimestampedRecord,
        F: FnMut(Option<ScanCursor>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ControlPlaneError>>,
    {
        self.scan_with(listing, list_page, |items| filter_window(items, window))
            .await
    }

    async fn scan_with<T, F, Fut, P>(
        &self,
        listing: &str,
        mut list_page: F,
        mut keep: P,
    ) -> Result<Vec<T>, ScanError>
    where
        F: FnMut(Option<ScanCursor>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ControlPlaneError>>,
        P: FnMut(Vec<T>) -> Vec<T>,
    {
        let mut collected = Vec::new();
        // `None` is both the first-page request and the end marker, so the
        // first request is issued before the cursor is ever inspected.
        let mut cursor: Option<ScanCursor> = None;
        let mut pages = 0usize;

        loop {
            if pages == self.max_pages {
                tracing::error!(
                    listing = %listing,
                    max_pages = self.max_pages,
                    "Listing did not terminate within the page limit"
                );
                return Err(ScanError::PageLimitExceeded {
                    listing: listing.to_string(),
                    max_pages: self.max_pages,
                });
            }

            let page = self
                .executor
                .execute(listing, || list_page(cursor.clone()))
                .await
                .map_err(|e| ScanError::from_backoff(listing, e))?;
            pages += 1;

            let next = page.continuation().cloned();
            collected.extend(keep(page.items));

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            listing = %listing,
            pages,
            items = collected.len(),
            "Scan complete"
        );
        Ok(collected)
    }
}
