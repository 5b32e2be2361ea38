//! Local control API with JSON endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::controller::Controller;
use crate::PollerError;

/// Control API application state
#[derive(Clone)]
pub struct ControlState {
    pub controller: Arc<Controller>,
}

/// Build the control API router
pub fn build_router(controller: Arc<Controller>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/history", get(history_handler))
        .route("/api/monitoring/start", post(start_handler))
        .route("/api/monitoring/stop", post(stop_handler))
        .route("/api/test-connection", post(test_connection_handler))
        .with_state(ControlState { controller })
}

/// Serve the control API on localhost until `cancel` fires
pub async fn serve(
    controller: Arc<Controller>,
    port: u16,
    cancel: CancellationToken,
) -> crate::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PollerError::Control(format!("Failed to bind port {}: {}", port, e)))?;
    tracing::info!("Control API listening on http://{}", addr);

    axum::serve(listener, build_router(controller))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::debug!("Control API stopped");
    Ok(())
}

fn error_response(error: PollerError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match error {
        PollerError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() })))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn status_handler(State(control): State<ControlState>) -> impl IntoResponse {
    let state = control.controller.state();
    let status = state.read().await.status.clone();
    Json(status)
}

async fn history_handler(State(control): State<ControlState>) -> impl IntoResponse {
    let state = control.controller.state();
    let history: Vec<_> = state.read().await.history.iter().cloned().collect();
    Json(history)
}

async fn start_handler(State(control): State<ControlState>) -> impl IntoResponse {
    match control.controller.start().await {
        Ok(_) => Ok(Json(json!({ "monitoring": true }))),
        Err(e) => {
            tracing::warn!("Start request rejected: {}", e);
            Err(error_response(e))
        }
    }
}

async fn stop_handler(State(control): State<ControlState>) -> impl IntoResponse {
    match control.controller.stop().await {
        Ok(_) => Ok(Json(json!({ "monitoring": false }))),
        Err(e) => Err(error_response(e)),
    }
}

async fn test_connection_handler(State(control): State<ControlState>) -> impl IntoResponse {
    let (success, message) = match control.controller.test_connection().await {
        Ok(_) => (true, "API connection OK".to_string()),
        Err(e) => (false, e.to_string()),
    };
    Json(json!({ "success": success, "message": message }))
}
