//! Early Warning Server
//!
//! Run with: cargo run
//!
//! Subcommands:
//! - (none): run the trigger server
//! - provision-routes: provision log-error routes once and exit
//!
//! Environment variables:
//! - EWS_HOST: Bind address (default: 0.0.0.0)
//! - EWS_PORT: Port number (default: 8080)
//! - EWS_ACCOUNT_ENVIRONMENT: Label prefixed to alert subjects (default: dev)
//! - EWS_REGION: Region used in console links (default: us-east-1)
//! - EWS_ACCOUNT_ID: Account whose datasets are audited (required by the server)
//! - EWS_CONTROL_PLANE_URL: Control-plane gateway (default: http://127.0.0.1:9000)
//! - EWS_NOTIFY_WEBHOOK_URL: Alert webhook; alerts are only logged when unset
//! - EWS_ETL_HOURS_BACK / EWS_DATASET_HOURS_BACK: Audit windows (default: 24)
//! - EWS_BACKOFF_MAX_ATTEMPTS / EWS_BACKOFF_BASE_MS / EWS_BACKOFF_MAX_MS: Retry policy
//! - EWS_MAX_PAGES: Page limit per scan (default: 1000)
//! - EWS_ROUTING_TABLE: JSON file listing log groups and their error patterns
//! - EWS_OWN_LOG_GROUP / EWS_ROUTE_DESTINATION: Default route settings
//! - EWS_LOG_RETENTION_DAYS: Retention for new log groups (default: 30)
//! - RUST_LOG: Log level (default: info)

use early_warning::api::{build_control_plane, run_server};
use early_warning::routing::{RouteState, RoutingOrchestrator};
use early_warning::{AppConfig, BackoffExecutor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "early_warning=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;

    let command = std::env::args().nth(1);
    match command.as_deref() {
        None | Some("serve") => {
            tracing::info!("Early warning configuration:");
            tracing::info!("  Listen: {}", config.bind_addr());
            tracing::info!("  Environment: {}", config.environment);
            tracing::info!("  Control plane: {}", config.control_plane_url);
            tracing::info!(
                "  Windows: ETL {}h, datasets {}h",
                config.etl_hours_back,
                config.dataset_hours_back
            );
            tracing::info!(
                "  Backoff: {} attempts, {}ms base, {}ms cap",
                config.backoff.max_attempts,
                config.backoff.base_delay_ms,
                config.backoff.max_delay_ms
            );
            run_server(config).await?;
        }
        Some("provision-routes") => provision_routes(config).await?,
        Some(other) => {
            return Err(format!(
                "unknown command: {other}; usage: early-warning [serve | provision-routes]"
            )
            .into());
        }
    }

    Ok(())
}

/// Fails when the run completed but some routes were left failed
async fn provision_routes(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let table = config.load_routing_table()?;
    let control_plane = build_control_plane(&config)?;
    let orchestrator = RoutingOrchestrator::new(
        control_plane,
        BackoffExecutor::new(config.backoff.clone()),
        config.routing.clone(),
    );

    let report = orchestrator.provision(&table).await?;

    for record in std::iter::once(&report.default_route).chain(report.routes.iter()) {
        let target = record.log_group.as_deref().unwrap_or("(default)");
        match &record.state {
            RouteState::Active { route_id } => println!(
                "{:<40} {:<40} active {}",
                record.route_name,
                target,
                route_id.as_deref().unwrap_or("")
            ),
            RouteState::Failed { error } => {
                println!("{:<40} {:<40} FAILED {}", record.route_name, target, error)
            }
            state => println!("{:<40} {:<40} {:?}", record.route_name, target, state),
        }
    }

    report.ensure_complete()?;
    Ok(())
}
