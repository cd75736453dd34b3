use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use tunecast_core::{
    scheduler::SchedulerStatus, CycleReport, DispatcherStatus, SanitizedConfig, Slot,
};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerStatus>,
    pub dispatcher: DispatcherStatus,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Next planned push, last catalog refresh, history size.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let scheduler = match state.scheduler() {
        Some(scheduler) => Some(scheduler.status().await),
        None => None,
    };
    let dispatcher = state.dispatcher().lock().await.status().await;
    Json(StatusResponse {
        scheduler,
        dispatcher,
    })
}

/// Run a push cycle for `slot` now. Waits for any cycle already in progress.
pub async fn trigger_push(
    State(state): State<Arc<AppState>>,
    Path(slot): Path<String>,
) -> Result<Json<CycleReport>, (StatusCode, Json<ErrorResponse>)> {
    let slot: Slot = slot.parse().map_err(|e: tunecast_core::scheduler::ParseSlotError| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    info!(slot = %slot, "Manual push requested");
    let report = state.dispatcher().lock().await.run_cycle(slot, false).await;
    Ok(Json(report))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    collect_dynamic_metrics(&state).await;
    match encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
