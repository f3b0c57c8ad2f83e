//! Failed ETL job runs over a trailing window

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use super::{AuditError, AuditReport, ResourceFailure, DEFAULT_CONCURRENCY};
use crate::alerts::{AlertChannel, Notification};
use crate::control_plane::{EtlCatalog, JobRun, JobRunState};
use crate::scan::{PaginatedScanner, ScanError, TimeWindow};

/// Page size used when listing job runs
pub const JOB_RUNS_PAGE_SIZE: u32 = 25;

/// A job run that ended in a failure state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRun {
    pub job_name: String,
    pub run_id: String,
    pub state: JobRunState,
    pub started_on: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl From<JobRun> for FailedRun {
    fn from(run: JobRun) -> Self {
        Self {
            job_name: run.job_name,
            run_id: run.id,
            state: run.job_run_state,
            started_on: run.started_on,
            error_message: run.error_message,
        }
    }
}

/// Summarizes failed ETL runs across every job in the account
pub struct EtlFailureAudit {
    catalog: Arc<dyn EtlCatalog>,
    scanner: PaginatedScanner,
    channel: AlertChannel,
    hours_back: u32,
    page_size: u32,
    concurrency: usize,
}

impl EtlFailureAudit {
    pub fn new(
        catalog: Arc<dyn EtlCatalog>,
        scanner: PaginatedScanner,
        channel: AlertChannel,
        hours_back: u32,
    ) -> Self {
        Self {
            catalog,
            scanner,
            channel,
            hours_back,
            page_size: JOB_RUNS_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Jobs whose runs are fetched at the same time
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Audit the window ending at `reference` and publish a summary if any run failed
    pub async fn run(&self, reference: DateTime<Utc>) -> Result<AuditReport<FailedRun>, AuditError> {
        let window = TimeWindow::new(reference, self.hours_back)?;
        let mut report = AuditReport::new("etl-failures", &window);

        let catalog = self.catalog.as_ref();
        let jobs = self
            .scanner
            .scan("etl jobs", move |cursor| catalog.list_jobs(cursor))
            .await?;
        report.resources_scanned = jobs.len();

        let window = &window;
        let outcomes: Vec<(String, Result<Vec<JobRun>, ScanError>)> =
            stream::iter(jobs.into_iter().map(|job| job.name))
                .map(|name| async move {
                    let runs = self.job_runs(&name, window).await;
                    (name, runs)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        for (job_name, outcome) in outcomes {
            match outcome {
                Ok(runs) => report.findings.extend(
                    runs.into_iter()
                        .filter(|r| r.job_run_state.is_failure())
                        .map(FailedRun::from),
                ),
                Err(e) => {
                    tracing::error!(job = %job_name, error = %e, "Could not audit ETL job");
                    report.failures.push(ResourceFailure::from_scan(&job_name, &e));
                }
            }
        }

        tracing::info!(
            jobs = report.resources_scanned,
            failed_runs = report.findings.len(),
            unaudited = report.failures.len(),
            "ETL failure audit complete"
        );

        if !report.findings.is_empty() {
            let notification = self.format(&report, window);
            report.notified = self.channel.send(&notification).await;
        }
        Ok(report)
    }

    async fn job_runs(&self, job_name: &str, window: &TimeWindow) -> Result<Vec<JobRun>, ScanError> {
        let catalog = self.catalog.as_ref();
        let page_size = self.page_size;
        self.scanner
            .scan_window(&format!("runs of {job_name}"), window, move |cursor| {
                catalog.list_job_runs(job_name, cursor, page_size)
            })
            .await
    }

    fn format(&self, report: &AuditReport<FailedRun>, window: &TimeWindow) -> Notification {
        let subject = format!(
            "{} failed ETL run(s) in the last {} hours",
            report.findings.len(),
            window.hours()
        );

        let mut message = format!(
            "ETL job runs that failed between {} and {} (UTC):\n",
            window.start().format("%Y-%m-%d %H:%M:%S"),
            window.reference().format("%Y-%m-%d %H:%M:%S"),
        );

        let mut current_job: Option<&str> = None;
        for run in &report.findings {
            if current_job != Some(run.job_name.as_str()) {
                let _ = write!(message, "\n{}\n", run.job_name);
                current_job = Some(run.job_name.as_str());
            }
            let started = run
                .started_on
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let _ = write!(message, "  - {} {} (started {})", run.run_id, run.state.as_str(), started);
            if let Some(error) = &run.error_message {
                let _ = write!(message, ": {}", error);
            }
            message.push('\n');
        }

        if !report.failures.is_empty() {
            message.push_str("\nJobs that could not be audited:\n");
            for failure in &report.failures {
                let _ = writeln!(message, "  - {}: {}", failure.resource, failure.error);
            }
        }

        Notification::new(subject, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::{BackoffExecutor, BackoffPolicy};
    use crate::control_plane::ControlPlaneError;
    use crate::test_support::{job_run, FakeEtlCatalog, RecordingNotifier};
    use std::time::Duration;

    fn reference() -> DateTime<Utc> {
        "2024-01-02T00:00:00Z".parse().unwrap()
    }

    fn scanner() -> PaginatedScanner {
        PaginatedScanner::new(BackoffExecutor::new(BackoffPolicy::new(
            2,
            Duration::from_millis(1),
            Duration::from_millis(2),
        )))
    }

    fn audit(catalog: FakeEtlCatalog, notifier: Arc<RecordingNotifier>) -> EtlFailureAudit {
        EtlFailureAudit::new(
            Arc::new(catalog),
            scanner(),
            AlertChannel::new(notifier, "prod"),
            24,
        )
    }

    #[tokio::test]
    async fn test_reports_failed_runs_inside_window() {
        let catalog = FakeEtlCatalog::new()
            .with_job(
                "nightly",
                vec![
                    vec![
                        job_run("jr_1", "nightly", "2024-01-01T23:00:00Z", JobRunState::Failed),
                        job_run("jr_2", "nightly", "2024-01-01T22:00:00Z", JobRunState::Succeeded),
                    ],
                    vec![job_run("jr_3", "nightly", "2024-01-01T00:00:00Z", JobRunState::Failed)],
                ],
            )
            .with_job(
                "hourly",
                vec![vec![job_run("jr_4", "hourly", "2024-01-01T12:00:00Z", JobRunState::Timeout)]],
            );
        let notifier = Arc::new(RecordingNotifier::new());

        let report = audit(catalog, Arc::clone(&notifier)).run(reference()).await.unwrap();

        assert_eq!(report.resources_scanned, 2);
        let ids: Vec<&str> = report.findings.iter().map(|f| f.run_id.as_str()).collect();
        assert_eq!(ids, vec!["jr_1", "jr_4"]);
        assert!(report.failures.is_empty());
        assert!(report.notified);

        let published = notifier.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "[PROD] 2 failed ETL run(s) in the last 24 hours");
        assert!(published[0].1.contains("jr_1 FAILED"));
        assert!(published[0].1.contains("jr_4 TIMEOUT"));
        assert!(!published[0].1.contains("jr_3"));
    }

    #[tokio::test]
    async fn test_missing_job_does_not_abort_siblings() {
        let catalog = FakeEtlCatalog::new()
            .with_failing_job("deleted", ControlPlaneError::NotFound("deleted".into()))
            .with_job(
                "nightly",
                vec![vec![job_run("jr_1", "nightly", "2024-01-01T23:00:00Z", JobRunState::Error)]],
            );
        let notifier = Arc::new(RecordingNotifier::new());

        let report = audit(catalog, Arc::clone(&notifier)).run(reference()).await.unwrap();

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].resource, "deleted");
        assert!(!report.failures[0].retries_exhausted);
        assert!(notifier.published()[0].1.contains("could not be audited"));
    }

    #[tokio::test]
    async fn test_no_failures_publishes_nothing() {
        let catalog = FakeEtlCatalog::new().with_job(
            "nightly",
            vec![vec![job_run("jr_1", "nightly", "2024-01-01T23:00:00Z", JobRunState::Succeeded)]],
        );
        let notifier = Arc::new(RecordingNotifier::new());

        let report = audit(catalog, Arc::clone(&notifier)).run(reference()).await.unwrap();

        assert!(report.findings.is_empty());
        assert!(!report.notified);
        assert!(notifier.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_audit() {
        let catalog = FakeEtlCatalog::new().with_job(
            "nightly",
            vec![vec![job_run("jr_1", "nightly", "2024-01-01T23:00:00Z", JobRunState::Failed)]],
        );
        let notifier = Arc::new(RecordingNotifier::failing());

        let report = audit(catalog, Arc::clone(&notifier)).run(reference()).await.unwrap();

        assert_eq!(report.findings.len(), 1);
        assert!(!report.notified);
    }

    #[tokio::test]
    async fn test_runs_are_listed_with_page_size() {
        let catalog = Arc::new(FakeEtlCatalog::new().with_job("nightly", vec![vec![], vec![]]));
        let audit = EtlFailureAudit::new(
            Arc::clone(&catalog) as Arc<dyn EtlCatalog>,
            scanner(),
            AlertChannel::new(Arc::new(RecordingNotifier::new()), "dev"),
            24,
        )
        .with_page_size(25);

        audit.run(reference()).await.unwrap();

        let requests = catalog.run_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|(job, _, size)| job == "nightly" && *size == 25));
        assert_eq!(requests[0].1, None);
    }
}
