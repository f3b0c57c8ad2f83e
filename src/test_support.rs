//! In-memory stand-ins for the control plane and the alert channel

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::alerts::{Notifier, NotifierError};
use crate::control_plane::{
    ControlPlaneError, DatasetCatalog, DatasetSummary, DefaultRouteRequest, EtlCatalog, EtlJob,
    ImportMode, Ingestion, IngestionStatus, JobRun, JobRunState, LogGroupAdmin,
    LogRoutingPlatform, RouteId, RouteRequest,
};
use crate::scan::{Page, ScanCursor};

/// Serve `pages` by index, using the index of the next page as its cursor
fn serve<T: Clone>(pages: &[Vec<T>], cursor: Option<ScanCursor>) -> Page<T> {
    let index = cursor
        .map(|c| c.as_str().parse::<usize>().unwrap_or(0))
        .unwrap_or(0);
    let items = pages.get(index).cloned().unwrap_or_default();
    let next = (index + 1 < pages.len()).then(|| ScanCursor::new((index + 1).to_string()));
    Page::new(items, next)
}

pub fn job_run(id: &str, job_name: &str, started_on: &str, state: JobRunState) -> JobRun {
    JobRun {
        id: id.to_string(),
        job_name: job_name.to_string(),
        started_on: Some(started_on.parse().expect("RFC 3339 timestamp")),
        job_run_state: state,
        error_message: state.is_failure().then(|| format!("{id} failed")),
        execution_time: Some(60),
    }
}

pub fn ingestion(id: &str, created_time: &str, status: IngestionStatus) -> Ingestion {
    Ingestion {
        ingestion_id: id.to_string(),
        created_time: Some(created_time.parse().expect("RFC 3339 timestamp")),
        ingestion_status: status,
        error_info: None,
    }
}

pub fn dataset(id: &str, import_mode: ImportMode) -> DatasetSummary {
    DatasetSummary {
        data_set_id: id.to_string(),
        name: format!("{id} dataset"),
        import_mode,
    }
}

#[derive(Default)]
pub struct FakeEtlCatalog {
    jobs: Vec<Vec<EtlJob>>,
    runs: HashMap<String, Vec<Vec<JobRun>>>,
    errors: HashMap<String, ControlPlaneError>,
    requests: Mutex<Vec<(String, Option<ScanCursor>, u32)>>,
}

impl FakeEtlCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job whose runs are served in the given pages
    pub fn with_job(mut self, name: &str, run_pages: Vec<Vec<JobRun>>) -> Self {
        let job = EtlJob {
            name: name.to_string(),
            description: None,
        };
        match self.jobs.last_mut() {
            Some(page) if page.len() < 2 => page.push(job),
            _ => self.jobs.push(vec![job]),
        }
        self.runs.insert(name.to_string(), run_pages);
        self
    }

    /// Make listing a job's runs fail
    pub fn with_failing_job(mut self, name: &str, error: ControlPlaneError) -> Self {
        self = self.with_job(name, vec![]);
        self.errors.insert(name.to_string(), error);
        self
    }

    pub fn run_requests(&self) -> Vec<(String, Option<ScanCursor>, u32)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl EtlCatalog for FakeEtlCatalog {
    async fn list_jobs(&self, cursor: Option<ScanCursor>) -> Result<Page<EtlJob>, ControlPlaneError> {
        Ok(serve(&self.jobs, cursor))
    }

    async fn list_job_runs(
        &self,
        job_name: &str,
        cursor: Option<ScanCursor>,
        page_size: u32,
    ) -> Result<Page<JobRun>, ControlPlaneError> {
        self.requests
            .lock()
            .push((job_name.to_string(), cursor.clone(), page_size));

        if let Some(error) = self.errors.get(job_name) {
            return Err(error.clone());
        }
        let pages = self
            .runs
            .get(job_name)
            .ok_or_else(|| ControlPlaneError::NotFound(job_name.to_string()))?;
        Ok(serve(pages, cursor))
    }
}

#[derive(Default)]
pub struct FakeDatasetCatalog {
    datasets: Vec<Vec<DatasetSummary>>,
    ingestions: HashMap<String, Vec<Vec<Ingestion>>>,
    errors: HashMap<String, ControlPlaneError>,
    requested: Mutex<Vec<String>>,
}

impl FakeDatasetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, summary: DatasetSummary, pages: Vec<Vec<Ingestion>>) -> Self {
        self.ingestions.insert(summary.data_set_id.clone(), pages);
        match self.datasets.last_mut() {
            Some(page) if page.len() < 2 => page.push(summary),
            _ => self.datasets.push(vec![summary]),
        }
        self
    }

    pub fn with_failing_dataset(mut self, summary: DatasetSummary, error: ControlPlaneError) -> Self {
        self.errors.insert(summary.data_set_id.clone(), error);
        self.with_dataset(summary, vec![])
    }

    /// Dataset ids whose ingestions were listed
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl DatasetCatalog for FakeDatasetCatalog {
    async fn list_datasets(
        &self,
        cursor: Option<ScanCursor>,
    ) -> Result<Page<DatasetSummary>, ControlPlaneError> {
        Ok(serve(&self.datasets, cursor))
    }

    async fn list_ingestions(
        &self,
        data_set_id: &str,
        cursor: Option<ScanCursor>,
    ) -> Result<Page<Ingestion>, ControlPlaneError> {
        self.requested.lock().push(data_set_id.to_string());

        if let Some(error) = self.errors.get(data_set_id) {
            return Err(error.clone());
        }
        let pages = self
            .ingestions
            .get(data_set_id)
            .ok_or_else(|| ControlPlaneError::NotFound(data_set_id.to_string()))?;
        Ok(serve(pages, cursor))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    DefaultRoute(DefaultRouteRequest),
    Route(RouteRequest),
}

/// Routing platform that records every call and tracks overlap
#[derive(Default)]
pub struct FakeRoutingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    route_failures: Mutex<HashMap<String, ControlPlaneError>>,
    route_throttles: Mutex<HashMap<String, u32>>,
    default_failure: Mutex<Option<ControlPlaneError>>,
}

impl FakeRoutingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_route(&self, route_name: &str, error: ControlPlaneError) {
        self.route_failures
            .lock()
            .insert(route_name.to_string(), error);
    }

    /// Throttle the next `times` attempts to create `route_name`
    pub fn throttle_route(&self, route_name: &str, times: u32) {
        self.route_throttles
            .lock()
            .insert(route_name.to_string(), times);
    }

    pub fn fail_default_route(&self, error: ControlPlaneError) {
        *self.default_failure.lock() = Some(error);
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: PlatformCall) {
        self.calls.lock().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogRoutingPlatform for FakeRoutingPlatform {
    async fn put_default_route(&self, request: &DefaultRouteRequest) -> Result<(), ControlPlaneError> {
        self.enter(PlatformCall::DefaultRoute(request.clone())).await;
        let result = match self.default_failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        };
        self.leave();
        result
    }

    async fn create_route(&self, request: &RouteRequest) -> Result<RouteId, ControlPlaneError> {
        self.enter(PlatformCall::Route(request.clone())).await;

        let throttled = {
            let mut throttles = self.route_throttles.lock();
            match throttles.get_mut(&request.route_name) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        let failure = self.route_failures.lock().get(&request.route_name).cloned();

        let result = if throttled {
            Err(ControlPlaneError::Throttled("Rate exceeded".to_string()))
        } else if let Some(error) = failure {
            Err(error)
        } else {
            Ok(RouteId(format!("route-{}", request.route_name)))
        };
        self.leave();
        result
    }
}

#[derive(Default)]
pub struct FakeLogGroupAdmin {
    pub retention: Mutex<Vec<(String, u32)>>,
    failure: Mutex<Option<ControlPlaneError>>,
}

impl FakeLogGroupAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: ControlPlaneError) {
        *self.failure.lock() = Some(error);
    }
}

#[async_trait]
impl LogGroupAdmin for FakeLogGroupAdmin {
    async fn put_retention_policy(&self, log_group: &str, retention_days: u32) -> Result<(), ControlPlaneError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.retention
            .lock()
            .push((log_group.to_string(), retention_days));
        Ok(())
    }
}

/// Notifier that keeps every published message
#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<(String, String)>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// `(subject, message)` pairs
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifierError> {
        self.published
            .lock()
            .push((subject.to_string(), message.to_string()));
        if self.failing {
            return Err(NotifierError::Webhook("sink unavailable".to_string()));
        }
        Ok(())
    }
}
