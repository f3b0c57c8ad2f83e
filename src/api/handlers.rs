use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::{AlertChannel, Notification};
use crate::audits::{
    AlarmStateChangeEvent, AuditError, AuditReport, DatasetFinding, DatasetRefreshAudit,
    EtlFailureAudit, FailedRun, JobStateChangeEvent, LogErrorEvent, LogGroupCreatedEvent,
};
use crate::retention::{RetentionApplier, RetentionError};
use crate::routing::ledger::LedgerSnapshot;
use crate::routing::RouteLedger;

/// Application state shared across handlers
pub struct AppState {
    pub etl_audit: EtlFailureAudit,
    pub dataset_audit: DatasetRefreshAudit,
    pub retention: RetentionApplier,
    pub channel: AlertChannel,
    pub ledger: RouteLedger,
    /// Region used in console links
    pub region: String,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.channel.environment().to_string(),
    })
}

// ============================================================================
// Scheduled audits
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AuditRequest {
    /// End of the audited window; defaults to now
    #[serde(default)]
    pub reference: Option<DateTime<Utc>>,
}

impl AuditRequest {
    /// An empty body is the same as `{}`
    fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
    }

    fn reference(&self) -> DateTime<Utc> {
        self.reference.unwrap_or_else(Utc::now)
    }
}

pub async fn etl_failures(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AuditReport<FailedRun>>, ApiError> {
    let request = AuditRequest::from_body(&body)?;
    let report = state.etl_audit.run(request.reference()).await?;
    Ok(Json(report))
}

pub async fn dataset_refreshes(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AuditReport<DatasetFinding>>, ApiError> {
    let request = AuditRequest::from_body(&body)?;
    let report = state.dataset_audit.run(request.reference()).await?;
    Ok(Json(report))
}

// ============================================================================
// Events
// ============================================================================

#[derive(Serialize)]
pub struct EventResponse {
    /// Subject of the notification, if the event warranted one
    pub subject: Option<String>,
    pub notified: bool,
}

async fn deliver(channel: &AlertChannel, notification: Option<Notification>) -> Json<EventResponse> {
    match notification {
        Some(notification) => {
            let notified = channel.send(&notification).await;
            Json(EventResponse {
                subject: Some(channel.subject_for(&notification.subject)),
                notified,
            })
        }
        None => Json(EventResponse {
            subject: None,
            notified: false,
        }),
    }
}

pub async fn job_state_change(
    State(state): State<Arc<AppState>>,
    Json(event): Json<JobStateChangeEvent>,
) -> Json<EventResponse> {
    tracing::debug!(job = %event.job_name, state = event.state.as_str(), "Job state change");
    deliver(&state.channel, event.notification()).await
}

pub async fn alarm_state_change(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AlarmStateChangeEvent>,
) -> Json<EventResponse> {
    deliver(&state.channel, Some(event.notification())).await
}

pub async fn log_errors(
    State(state): State<Arc<AppState>>,
    Json(event): Json<LogErrorEvent>,
) -> Json<EventResponse> {
    deliver(&state.channel, event.notification(&state.region)).await
}

#[derive(Serialize)]
pub struct RetentionResponse {
    pub log_group: String,
    pub retention_days: u32,
}

pub async fn log_group_created(
    State(state): State<Arc<AppState>>,
    Json(event): Json<LogGroupCreatedEvent>,
) -> Result<Json<RetentionResponse>, ApiError> {
    let days = state.retention.on_created(&event).await?;
    Ok(Json(RetentionResponse {
        log_group: event.log_group_name,
        retention_days: days.days(),
    }))
}

// ============================================================================
// Routes
// ============================================================================

pub async fn routes(State(state): State<Arc<AppState>>) -> Json<LedgerSnapshot> {
    Json(state.ledger.snapshot())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// The control plane failed or stayed throttled
    Upstream(String),
    Internal(String),
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::Window(e) => ApiError::BadRequest(e.to_string()),
            AuditError::Listing(e) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl From<RetentionError> for ApiError {
    fn from(err: RetentionError) -> Self {
        match err {
            RetentionError::EmptyLogGroup => ApiError::BadRequest(err.to_string()),
            RetentionError::Apply { .. } => ApiError::Upstream(err.to_string()),
            RetentionError::UnsupportedDays(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        }

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
