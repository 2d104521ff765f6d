//! Deployment health registry, aggregation engine and probe endpoint.

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;

pub use crate::config::{AppConfig, HealthConfig, ServerConfig};
pub use error::{AppError, RegistrationError, Result};
pub use handlers::routes::create_routes;
pub use health::{
    AggregateReport, Category, CategoryRegistry, CheckResult, DataValue, DeploymentDescriptor, DeploymentId,
    DeploymentRegistration, FnProcedure, HealthProcedure, HealthReporter, HealthStatus, LifecycleAdapter,
    ProcedureDiscovery, SharedProcedure, StaticDiscovery,
};

use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub reporter: Arc<HealthReporter>,
    pub lifecycle: LifecycleAdapter,
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        let reporter = Arc::new(HealthReporter::from_config(&config.health));
        let lifecycle = LifecycleAdapter::from_config(Arc::clone(&reporter), &config.health);

        Self {
            app_name: "Deployment Health Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            reporter,
            lifecycle,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let router = Router::new().merge(create_routes());

    middleware::logging::with_request_tracing(router).with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting health endpoint on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
