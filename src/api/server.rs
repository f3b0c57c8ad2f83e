use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    alarm_state_change, dataset_refreshes, etl_failures, health_check, job_state_change,
    log_errors, log_group_created, routes, AppState,
};
use crate::alerts::{AlertChannel, LogNotifier, Notifier, WebhookNotifier};
use crate::audits::{DatasetRefreshAudit, EtlFailureAudit};
use crate::backoff::BackoffExecutor;
use crate::config::AppConfig;
use crate::control_plane::{ControlPlaneError, HttpControlPlane};
use crate::retention::RetentionApplier;
use crate::routing::{RouteLedger, RoutingOrchestrator};
use crate::scan::PaginatedScanner;

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Scheduled audits
        .route("/audits/etl-failures", post(etl_failures))
        .route("/audits/dataset-refreshes", post(dataset_refreshes))
        // Platform events
        .route("/events/job-state-change", post(job_state_change))
        .route("/events/alarm-state-change", post(alarm_state_change))
        .route("/events/log-errors", post(log_errors))
        .route("/events/log-group-created", post(log_group_created))
        // Routing status
        .route("/routes", get(routes))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub fn build_control_plane(config: &AppConfig) -> Result<Arc<HttpControlPlane>, ControlPlaneError> {
    HttpControlPlane::new(
        config.control_plane_url.clone(),
        config.account_id.clone(),
        config.request_timeout,
    )
    .map(Arc::new)
}

/// Webhook sink when configured, otherwise alerts only go to the log
pub fn build_channel(config: &AppConfig) -> AlertChannel {
    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            let mut webhook = WebhookNotifier::new(url.clone());
            if let Some(token) = &config.notify_webhook_token {
                webhook = webhook.with_header("Authorization", format!("Bearer {}", token));
            }
            Arc::new(webhook)
        }
        None => {
            tracing::warn!("EWS_NOTIFY_WEBHOOK_URL not set, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    AlertChannel::new(notifier, &config.environment)
}

pub fn build_state(
    config: &AppConfig,
    control_plane: Arc<HttpControlPlane>,
    ledger: RouteLedger,
) -> AppState {
    let executor = BackoffExecutor::new(config.backoff.clone());
    let scanner = PaginatedScanner::new(executor.clone()).with_max_pages(config.max_pages);
    let channel = build_channel(config);

    AppState {
        etl_audit: EtlFailureAudit::new(
            control_plane.clone(),
            scanner.clone(),
            channel.clone(),
            config.etl_hours_back,
        )
        .with_page_size(config.job_runs_page_size),
        dataset_audit: DatasetRefreshAudit::new(
            control_plane.clone(),
            scanner,
            channel.clone(),
            config.dataset_hours_back,
        ),
        retention: RetentionApplier::new(control_plane, executor, config.log_retention),
        channel,
        ledger,
        region: config.region.clone(),
    }
}

/// Run the HTTP server
///
/// When a routing table is configured the routes are provisioned once in
/// the background and their progress is served on `/routes`.
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.require_account_id()?;
    let table = config.load_routing_table()?;

    let control_plane = build_control_plane(&config)?;
    let ledger = RouteLedger::new();
    let state = Arc::new(build_state(&config, Arc::clone(&control_plane), ledger.clone()));

    let provisioning = if config.routing_table_path.is_some() {
        let orchestrator = RoutingOrchestrator::new(
            control_plane,
            BackoffExecutor::new(config.backoff.clone()),
            config.routing.clone(),
        )
        .with_ledger(ledger);

        Some(tokio::spawn(async move {
            if let Err(e) = orchestrator.provision(&table).await {
                tracing::error!(error = %e, "Log route provisioning rejected");
            }
        }))
    } else {
        tracing::info!("No routing table configured, skipping route provisioning");
        None
    };

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr().parse()?;
    tracing::info!(
        "Starting early warning server on {} (environment {})",
        addr,
        config.environment
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = provisioning {
        handle.abort();
    }

    tracing::info!("Early warning server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
