//! Health probe handlers

use crate::{
    error::{AppError, Result},
    health::{AggregateReport, Category, HealthStatus},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

/// All procedures of every category.
pub async fn handle_health(State(state): State<AppState>) -> Response {
    info!("GET /health - Running all health procedures");

    let report = state.reporter.get_overall_health().await;
    report_response(report)
}

pub async fn handle_category_health(
    State(state): State<AppState>,
    Path(requested): Path<String>,
) -> Result<Response> {
    let category: Category = requested
        .parse()
        .map_err(|e: crate::health::UnknownCategory| AppError::NotFound(e.to_string()))?;

    info!("GET /health/{} - Running {} procedures", requested, category);

    let report = state.reporter.get_health(category).await;
    Ok(report_response(report))
}

fn report_response(report: AggregateReport) -> Response {
    let status_code = match report.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => {
            let failing: Vec<&str> = report
                .checks
                .iter()
                .filter(|check| !check.is_up())
                .map(|check| check.name.as_str())
                .collect();
            warn!("Health is DOWN, failing procedures: {}", failing.join(", "));
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status_code, Json(report)).into_response()
}
