//! Telemetry relay: pushes the latest room readings to WebSocket subscribers
//! whenever the readings store changes.

use domain::reading::DatabaseReadingSource;
use events::EventPublisher;
use log::*;
use migration::{Migrator, MigratorTrait};
use realtime::domain_event_handler::RefreshTriggerHandler;
use realtime::{Debouncer, Dispatcher, Manager};
use service::config::{Config, DEFAULT_CHANGE_CHANNEL};
use service::logging::Logger;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    info!(
        "Starting up telemetry relay ({} environment)...",
        config.runtime_env()
    );

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        info!("Applying pending migrations");
        if let Err(e) = Migrator::up(db.as_ref(), None).await {
            error!("Failed to apply migrations: {e}");
            std::process::exit(1);
        }
    }

    let shutdown = CancellationToken::new();

    let manager = Arc::new(Manager::new());
    let source = Arc::new(DatabaseReadingSource::new(&db));
    let dispatcher = Arc::new(Dispatcher::new(source, manager));
    let (debouncer, debouncer_task) = Debouncer::spawn(dispatcher.clone(), shutdown.clone());

    let publisher = EventPublisher::new()
        .with_handler(Arc::new(RefreshTriggerHandler::new(debouncer.clone())));

    let listener_task = if config.disable_change_listener {
        info!("Change listener disabled; refreshes only run from the trigger endpoint");
        None
    } else {
        let db = db.clone();
        let channel = config.change_channel().to_string();
        if channel != DEFAULT_CHANGE_CHANNEL {
            warn!(
                "Listening on {channel}; the migrated trigger only notifies {DEFAULT_CHANGE_CHANNEL}"
            );
        }
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) =
                domain::change_feed::listen(db.as_ref(), &channel, publisher, shutdown).await
            {
                error!("Change listener stopped: {e}");
            }
        }))
    };

    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

    let app_state = web::AppState::new(config, dispatcher, debouncer, shutdown.clone());
    if let Err(e) = web::init_server(app_state).await {
        error!("Server failed: {e}");
    }
    // Stops the debouncer and listener if the server ended on its own.
    shutdown.cancel();

    if let Some(listener_task) = listener_task {
        let _ = listener_task.await;
    }
    let _ = debouncer_task.await;
    info!("Telemetry relay stopped");
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, shutting down");
            shutdown.cancel();
        }
        Err(e) => error!("Unable to listen for Ctrl-C: {e}"),
    }
}
