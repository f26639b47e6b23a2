use crate::controller::{health_check_controller, trigger_controller};
use crate::ws::handler as ws_handler;
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// The global OpenAPI document. To be a part of the rendered
// document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Telemetry Relay API"
        ),
        paths(
            health_check_controller::health_check,
            trigger_controller::trigger,
            ws_handler::ws_handler,
        ),
        components(
            schemas(
                trigger_controller::TriggerResponse,
            )
        ),
        tags(
            (name = "telemetry_relay", description = "Live room telemetry broadcast")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(trigger_routes(app_state.clone()))
        .merge(ws_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Administrative refresh trigger, also the target of database webhooks
fn trigger_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/db-trigger-hook", post(trigger_controller::trigger))
        .with_state(app_state)
}

fn ws_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler::ws_handler))
        .with_state(app_state)
}
