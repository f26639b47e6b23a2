use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use events::TriggerSource;
use log::*;
use realtime::manager::BroadcastReport;
use realtime::RefreshOutcome;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    status: String,
    message: String,
    /// Connections that received the refreshed payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    delivered: Option<usize>,
    /// Connections that were gone by the time their payload was ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<usize>,
}

impl TriggerResponse {
    fn success(report: BroadcastReport) -> Self {
        Self {
            status: "success".to_string(),
            message: "Broadcast triggered".to_string(),
            delivered: Some(report.delivered),
            skipped: Some(report.skipped),
        }
    }

    fn error(message: &str) -> Self {
        Self {
            status: "error".to_string(),
            message: message.to_string(),
            delivered: None,
            skipped: None,
        }
    }
}

/// POST request a debounced refresh and broadcast to every connection
///
/// Responds once the refresh that absorbed this trigger has finished, so the
/// response reflects a broadcast that may also cover other recent triggers.
#[utoipa::path(
    post,
    path = "/db-trigger-hook",
    responses(
        (status = 200, description = "Readings were refetched and broadcast", body = TriggerResponse),
        (status = 500, description = "The readings store could not be queried", body = TriggerResponse),
        (status = 503, description = "The server is shutting down", body = TriggerResponse),
    )
)]
pub async fn trigger(State(app_state): State<AppState>) -> impl IntoResponse {
    info!("Refresh requested ({})", TriggerSource::Webhook);

    match app_state.debouncer.trigger().await {
        Ok(RefreshOutcome::Broadcast(report)) => {
            (StatusCode::OK, Json(TriggerResponse::success(report)))
        }
        Ok(RefreshOutcome::Failed { reason }) => {
            error!("Error in trigger hook: {reason}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse::error("Internal server error")),
            )
        }
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(TriggerResponse::error("Service shutting down")),
        ),
    }
}
