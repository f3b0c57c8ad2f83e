//! Dataset refresh audit

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use super::{AuditError, AuditReport, ResourceFailure, DEFAULT_CONCURRENCY};
use crate::alerts::{AlertChannel, Notification};
use crate::control_plane::{DatasetCatalog, DatasetSummary, ImportMode, Ingestion, IngestionStatus};
use crate::scan::{PaginatedScanner, ScanError, TimeWindow};

/// A dataset with no completed refresh in the window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetFinding {
    pub data_set_id: String,
    pub name: String,
    pub ingestions_in_window: usize,
    /// Status of the most recent ingestion in the window
    pub last_status: Option<IngestionStatus>,
    pub last_error: Option<String>,
}

impl DatasetFinding {
    /// `None` when some ingestion in the window completed
    fn evaluate(dataset: &DatasetSummary, ingestions: &[Ingestion]) -> Option<Self> {
        if ingestions
            .iter()
            .any(|i| i.ingestion_status == IngestionStatus::Completed)
        {
            return None;
        }

        let latest = ingestions.iter().max_by_key(|i| i.created_time);
        let last_error = latest
            .and_then(|i| i.error_info.as_ref())
            .map(|info| match (&info.kind, &info.message) {
                (Some(kind), Some(message)) => format!("{kind}: {message}"),
                (Some(kind), None) => kind.clone(),
                (None, Some(message)) => message.clone(),
                (None, None) => "unknown error".to_string(),
            });

        Some(Self {
            data_set_id: dataset.data_set_id.clone(),
            name: dataset.name.clone(),
            ingestions_in_window: ingestions.len(),
            last_status: latest.map(|i| i.ingestion_status),
            last_error,
        })
    }
}

/// Flags imported datasets that did not refresh successfully in the window
pub struct DatasetRefreshAudit {
    catalog: Arc<dyn DatasetCatalog>,
    scanner: PaginatedScanner,
    channel: AlertChannel,
    hours_back: u32,
    concurrency: usize,
}

impl DatasetRefreshAudit {
    pub fn new(
        catalog: Arc<dyn DatasetCatalog>,
        scanner: PaginatedScanner,
        channel: AlertChannel,
        hours_back: u32,
    ) -> Self {
        Self {
            catalog,
            scanner,
            channel,
            hours_back,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self, reference: DateTime<Utc>) -> Result<AuditReport<DatasetFinding>, AuditError> {
        let window = TimeWindow::new(reference, self.hours_back)?;
        let mut report = AuditReport::new("dataset-refreshes", &window);

        let catalog = self.catalog.as_ref();
        let datasets: Vec<DatasetSummary> = self
            .scanner
            .scan("datasets", move |cursor| catalog.list_datasets(cursor))
            .await?
            .into_iter()
            .filter(|d| {
                let imported = d.import_mode == ImportMode::Spice;
                if !imported {
                    tracing::debug!(data_set_id = %d.data_set_id, "Skipping dataset that is not imported");
                }
                imported
            })
            .collect();
        report.resources_scanned = datasets.len();

        let window = &window;
        let outcomes: Vec<(DatasetSummary, Result<Vec<Ingestion>, ScanError>)> =
            stream::iter(datasets)
                .map(|dataset| async move {
                    let ingestions = self.ingestions(&dataset.data_set_id, window).await;
                    (dataset, ingestions)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        for (dataset, outcome) in outcomes {
            match outcome {
                Ok(ingestions) => {
                    if let Some(finding) = DatasetFinding::evaluate(&dataset, &ingestions) {
                        report.findings.push(finding);
                    }
                }
                Err(e) => {
                    tracing::error!(data_set_id = %dataset.data_set_id, error = %e, "Could not audit dataset");
                    report
                        .failures
                        .push(ResourceFailure::from_scan(&dataset.data_set_id, &e));
                }
            }
        }

        tracing::info!(
            datasets = report.resources_scanned,
            flagged = report.findings.len(),
            unaudited = report.failures.len(),
            "Dataset refresh audit complete"
        );

        if !report.findings.is_empty() {
            let notification = format_summary(&report, window);
            report.notified = self.channel.send(&notification).await;
        }
        Ok(report)
    }

    async fn ingestions(&self, data_set_id: &str, window: &TimeWindow) -> Result<Vec<Ingestion>, ScanError> {
        let catalog = self.catalog.as_ref();
        self.scanner
            .scan_window(&format!("ingestions of {data_set_id}"), window, move |cursor| {
                catalog.list_ingestions(data_set_id, cursor)
            })
            .await
    }
}

fn format_summary(report: &AuditReport<DatasetFinding>, window: &TimeWindow) -> Notification {
    let subject = format!(
        "{} dataset(s) not refreshed in the last {} hours",
        report.findings.len(),
        window.hours()
    );

    let mut message = format!(
        "Datasets without a completed refresh between {} and {} (UTC):\n\n",
        window.start().format("%Y-%m-%d %H:%M:%S"),
        window.reference().format("%Y-%m-%d %H:%M:%S"),
    );
    for finding in &report.findings {
        let _ = write!(message, "  - {} ({})", finding.name, finding.data_set_id);
        match finding.last_status {
            None => message.push_str(": no refresh in window"),
            Some(status) => {
                let _ = write!(
                    message,
                    ": {} refresh(es), last {}",
                    finding.ingestions_in_window,
                    status.as_str()
                );
            }
        }
        if let Some(error) = &finding.last_error {
            let _ = write!(message, " ({error})");
        }
        message.push('\n');
    }

    if !report.failures.is_empty() {
        message.push_str("\nDatasets that could not be audited:\n");
        for failure in &report.failures {
            let _ = writeln!(message, "  - {}: {}", failure.resource, failure.error);
        }
    }

    Notification::new(subject, message)
}
