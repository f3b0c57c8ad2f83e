//! Boundary to the cloud control plane
//!
//! Each consumed API is a trait so audits and the routing orchestrator can
//! run against fakes. [`HttpControlPlane`] implements all of them over a JSON
//! gateway.

pub mod error;
pub mod http;
pub mod model;

use async_trait::async_trait;

pub use error::ControlPlaneError;
pub use http::HttpControlPlane;
pub use model::{
    DatasetSummary, DefaultRouteRequest, EtlJob, ImportMode, Ingestion, IngestionErrorInfo,
    IngestionStatus, JobRun, JobRunState, RouteId, RouteRequest,
};

use crate::scan::{Page, ScanCursor};

/// ETL job listings
#[async_trait]
pub trait EtlCatalog: Send + Sync {
    async fn list_jobs(&self, cursor: Option<ScanCursor>) -> Result<Page<EtlJob>, ControlPlaneError>;

    async fn list_job_runs(
        &self,
        job_name: &str,
        cursor: Option<ScanCursor>,
        page_size: u32,
    ) -> Result<Page<JobRun>, ControlPlaneError>;
}

/// Dashboard dataset listings
#[async_trait]
pub trait DatasetCatalog: Send + Sync {
    async fn list_datasets(
        &self,
        cursor: Option<ScanCursor>,
    ) -> Result<Page<DatasetSummary>, ControlPlaneError>;

    async fn list_ingestions(
        &self,
        data_set_id: &str,
        cursor: Option<ScanCursor>,
    ) -> Result<Page<Ingestion>, ControlPlaneError>;
}

/// Log subscription management
#[async_trait]
pub trait LogRoutingPlatform: Send + Sync {
    /// Replace the account-wide subscription policy
    async fn put_default_route(&self, request: &DefaultRouteRequest) -> Result<(), ControlPlaneError>;

    /// Create one subscription filter on a log group
    async fn create_route(&self, request: &RouteRequest) -> Result<RouteId, ControlPlaneError>;
}

/// Log group administration
#[async_trait]
pub trait LogGroupAdmin: Send + Sync {
    async fn put_retention_policy(&self, log_group: &str, retention_days: u32) -> Result<(), ControlPlaneError>;
}
