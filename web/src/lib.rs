//! HTTP and WebSocket surface of the telemetry relay.
//!
//! The core fan-out machinery (registry, debouncer, dispatcher) lives in the
//! `realtime` crate; this crate owns the sockets and the routes.

use log::*;
use realtime::{DebouncerHandle, Dispatcher};
use service::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use axum::http::{header, HeaderValue, Method};

mod controller;
mod router;
mod ws;

#[cfg(test)]
mod test_support;

// Web-level state shared by every handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dispatcher: Arc<Dispatcher>,
    pub debouncer: DebouncerHandle,
    /// Cancelled on process shutdown; open sockets close when it fires.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        dispatcher: Arc<Dispatcher>,
        debouncer: DebouncerHandle,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            dispatcher,
            debouncer,
            shutdown,
        }
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let address = app_state.config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Server starting... listening for connections on http://{address}");

    serve(listener, app_state).await
}

/// Serves every route on an already bound listener until the shutdown token fires.
pub async fn serve(listener: TcpListener, app_state: AppState) -> std::io::Result<()> {
    let shutdown = app_state.shutdown.clone();
    let cors_layer = cors_layer(&app_state.config);

    axum::serve(listener, router::define_routes(app_state).layer(cors_layer))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Shutdown requested, draining connections");
        })
        .await
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {origin}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
