//! Trailing time-window filtering of scanned records

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::control_plane::{Ingestion, JobRun};

/// Anything the scanner can place on the time axis
pub trait TimestampedRecord {
    /// Start or creation instant, if the remote side reported one
    fn instant(&self) -> Option<DateTime<Utc>>;
}

impl TimestampedRecord for JobRun {
    fn instant(&self) -> Option<DateTime<Utc>> {
        self.started_on
    }
}

impl TimestampedRecord for Ingestion {
    fn instant(&self) -> Option<DateTime<Utc>> {
        self.created_time
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WindowError {
    #[error("Window length must be at least one hour")]
    ZeroHours,

    #[error("A {0} hour window reaches outside the representable time range")]
    OutOfRange(u32),
}

/// The interval `(reference - hours, reference]`
///
/// Built once per scan so every page is filtered against the same boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    reference: DateTime<Utc>,
    start: DateTime<Utc>,
    hours: u32,
}

impl TimeWindow {
    pub fn new(reference: DateTime<Utc>, hours: u32) -> Result<Self, WindowError> {
        if hours == 0 {
            return Err(WindowError::ZeroHours);
        }
        let start = Duration::try_hours(i64::from(hours))
            .and_then(|length| reference.checked_sub_signed(length))
            .ok_or(WindowError::OutOfRange(hours))?;
        Ok(Self {
            reference,
            start,
            hours,
        })
    }

    /// Window ending now
    pub fn trailing_hours(hours: u32) -> Result<Self, WindowError> {
        Self::new(Utc::now(), hours)
    }

    pub fn reference(&self) -> DateTime<Utc> {
        self.reference
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Exclusive lower bound
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant > self.start && instant <= self.reference
    }

    /// Records without an instant are outside every window
    pub fn contains_record<R: TimestampedRecord>(&self, record: &R) -> bool {
        record.instant().map(|t| self.contains(t)).unwrap_or(false)
    }
}

/// Keep the records that fall inside `window`, in their original order
pub fn filter_window<R: TimestampedRecord>(records: Vec<R>, window: &TimeWindow) -> Vec<R> {
    records
        .into_iter()
        .filter(|r| window.contains_record(r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::JobRunState;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn run(id: &str, started_on: Option<&str>) -> JobRun {
        JobRun {
            id: id.to_string(),
            job_name: "job".to_string(),
            started_on: started_on.map(at),
            job_run_state: JobRunState::Succeeded,
            error_message: None,
            execution_time: None,
        }
    }

    #[test]
    fn test_zero_hours_rejected() {
        assert_eq!(
            TimeWindow::new(at("2024-01-02T00:00:00Z"), 0),
            Err(WindowError::ZeroHours)
        );
    }

    #[test]
    fn test_oversized_window_rejected() {
        let reference = at("2024-01-02T00:00:00Z");
        assert_eq!(
            TimeWindow::new(reference, u32::MAX),
            Err(WindowError::OutOfRange(u32::MAX))
        );
        assert_eq!(
            TimeWindow::trailing_hours(u32::MAX),
            Err(WindowError::OutOfRange(u32::MAX))
        );

        let oldest = DateTime::<Utc>::MIN_UTC + Duration::hours(1);
        let window = TimeWindow::new(oldest, 1).unwrap();
        assert_eq!(window.start(), DateTime::<Utc>::MIN_UTC);
        assert_eq!(TimeWindow::new(oldest, 2), Err(WindowError::OutOfRange(2)));
    }

    #[test]
    fn test_boundaries() {
        let window = TimeWindow::new(at("2024-01-02T00:00:00Z"), 24).unwrap();

        assert_eq!(window.start(), at("2024-01-01T00:00:00Z"));
        assert!(!window.contains(at("2024-01-01T00:00:00Z")));
        assert!(window.contains(at("2024-01-01T00:00:01Z")));
        assert!(window.contains(at("2024-01-02T00:00:00Z")));
        assert!(!window.contains(at("2024-01-02T00:00:01Z")));
    }

    #[test]
    fn test_filter_keeps_order_and_drops_missing_instants() {
        let window = TimeWindow::new(at("2024-01-02T00:00:00Z"), 24).unwrap();
        let runs = vec![
            run("a", Some("2024-01-01T23:00:00Z")),
            run("b", Some("2024-01-01T00:00:00Z")),
            run("c", None),
            run("d", Some("2024-01-01T12:00:00Z")),
        ];

        let kept: Vec<String> = filter_window(runs, &window)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(kept, vec!["a", "d"]);
    }

    #[test]
    fn test_ingestion_uses_created_time() {
        let window = TimeWindow::new(at("2024-01-02T00:00:00Z"), 1).unwrap();
        let ingestion = Ingestion {
            ingestion_id: "i-1".to_string(),
            created_time: Some(at("2024-01-01T23:30:00Z")),
            ingestion_status: crate::control_plane::IngestionStatus::Completed,
            error_info: None,
        };
        assert!(window.contains_record(&ingestion));
    }
}
