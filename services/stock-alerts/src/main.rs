//! SupplyChainX stock alerts service.
//!
//! Runs three cron tasks against the shared database: the stock check, email
//! dispatch of pending alerts and retention cleanup of resolved alerts. A
//! small HTTP endpoint reports liveness and the outcome of the latest runs.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, serve, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use supplychainx_database::{
    initialize_database, postgres_health_check, DatabaseConfig, PostgresPool, StockAlertRepository,
    StockLevelRepository,
};
use supplychainx_utils::{init_logging, AppConfig};
use tokio::{net::TcpListener, sync::RwLock};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

mod job;
mod notifier;
mod ports;
mod scheduler;

use job::{JobSettings, StockAlertJob};
use notifier::{LogNotifier, SmtpNotifier};
use ports::AlertNotifier;
use scheduler::{parse_schedule, spawn_cron};

/// Outcome of the most recent run of each task.
#[derive(Debug, Clone, Default, Serialize)]
struct LastRuns {
    stock_check: Option<TaskRun>,
    email_dispatch: Option<TaskRun>,
    cleanup: Option<TaskRun>,
}

#[derive(Debug, Clone, Serialize)]
struct TaskRun {
    at: DateTime<Utc>,
    succeeded: bool,
    outcome: Value,
}

impl TaskRun {
    fn from_result<T: Serialize>(at: DateTime<Utc>, result: &Result<T>) -> Self {
        match result {
            Ok(report) => Self {
                at,
                succeeded: true,
                outcome: serde_json::to_value(report).unwrap_or(Value::Null),
            },
            Err(e) => Self {
                at,
                succeeded: false,
                outcome: Value::String(format!("{:#}", e)),
            },
        }
    }
}

#[derive(Clone)]
struct ServiceState {
    pool: PostgresPool,
    last_runs: Arc<RwLock<LastRuns>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting SupplyChainX stock alerts service");

    let stock_check = parse_schedule(&config.scheduler.stock_check_cron)?;
    let email_dispatch = parse_schedule(&config.scheduler.email_dispatch_cron)?;
    let cleanup = parse_schedule(&config.scheduler.cleanup_cron)?;

    let notifier: Arc<dyn AlertNotifier> = if config.email.enabled {
        Arc::new(SmtpNotifier::new(&config.email)?)
    } else {
        tracing::warn!("Email notifications disabled, alerts will only be logged");
        Arc::new(LogNotifier)
    };

    let pool = initialize_database(&DatabaseConfig::from(&config.database)).await?;
    info!("Database connection established");

    let job = Arc::new(StockAlertJob::new(
        Arc::new(StockLevelRepository::new(pool.clone())),
        Arc::new(StockAlertRepository::new(pool.clone())),
        notifier,
        JobSettings::from(&config.scheduler),
    ));
    let state = ServiceState {
        pool,
        last_runs: Arc::new(RwLock::new(LastRuns::default())),
    };
    let cancel = CancellationToken::new();

    let tasks = vec![
        {
            let (job, last_runs) = (job.clone(), state.last_runs.clone());
            spawn_cron("stock-check", stock_check, cancel.clone(), move || {
                let (job, last_runs) = (job.clone(), last_runs.clone());
                async move {
                    let now = Utc::now();
                    let result = job.check_stock_levels(now).await;
                    last_runs.write().await.stock_check = Some(TaskRun::from_result(now, &result));
                    let report = result?;
                    info!(?report, "Stock check finished");
                    Ok::<_, anyhow::Error>(())
                }
            })
        },
        {
            let (job, last_runs) = (job.clone(), state.last_runs.clone());
            spawn_cron("email-dispatch", email_dispatch, cancel.clone(), move || {
                let (job, last_runs) = (job.clone(), last_runs.clone());
                async move {
                    let now = Utc::now();
                    let result = job.dispatch_pending_emails(now).await;
                    last_runs.write().await.email_dispatch = Some(TaskRun::from_result(now, &result));
                    let report = result?;
                    if report.pending > 0 {
                        info!(?report, "Alert emails dispatched");
                    }
                    Ok::<_, anyhow::Error>(())
                }
            })
        },
        {
            let (job, last_runs) = (job.clone(), state.last_runs.clone());
            spawn_cron("alert-cleanup", cleanup, cancel.clone(), move || {
                let (job, last_runs) = (job.clone(), last_runs.clone());
                async move {
                    let now = Utc::now();
                    let result = job.cleanup_resolved_alerts(now).await;
                    last_runs.write().await.cleanup = Some(TaskRun::from_result(now, &result));
                    let report = result?;
                    info!(deleted = report.deleted, cutoff = %report.cutoff, "Resolved alerts cleaned up");
                    Ok::<_, anyhow::Error>(())
                }
            })
        },
    ];

    let addr = SocketAddr::from(([0, 0, 0, 0], config.scheduler.health_port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind health endpoint on {}", addr))?;
    info!("Stock alerts health endpoint listening on {}", addr);

    let shutdown = cancel.clone();
    serve(listener, create_app(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Scheduled task panicked");
        }
    }

    info!("Stock alerts service stopped");
    Ok(())
}

fn create_app(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Probes PostgreSQL and reports the latest task runs; 503 when the
/// database is unreachable.
async fn health_check(State(state): State<ServiceState>) -> (StatusCode, Json<Value>) {
    let postgres = postgres_health_check(&state.pool).await;
    let healthy = postgres.is_ok();
    let last_runs = state.last_runs.read().await.clone();

    let body = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "supplychainx-stock-alerts",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "postgres": match &postgres {
                Ok(()) => json!({"status": "healthy", "message": "Connected"}),
                Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
            }
        },
        "last_runs": last_runs,
    });

    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}
