//! Paginated scans with trailing time-window filtering
//!
//! A scan walks a listing API page by page, retrying throttled pages through
//! the backoff executor, and keeps only the records that fall inside a
//! window fixed at the start of the scan.

pub mod cursor;
pub mod scanner;
pub mod window;

pub use cursor::{Page, ScanCursor};
pub use scanner::{PaginatedScanner, ScanError, DEFAULT_MAX_PAGES};
pub use window::{filter_window, TimeWindow, TimestampedRecord, WindowError};
