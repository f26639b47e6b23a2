//! Postgres `LISTEN` bridge from the readings store to the event system.

use crate::error::Error;
use events::{DomainEvent, EventPublisher, TriggerSource};
use log::*;
use sea_orm::DatabaseConnection;
use sqlx::postgres::PgListener;
use tokio_util::sync::CancellationToken;

/// Listens on `channel` and publishes a `ReadingsChanged` event for every
/// notification until `shutdown` is cancelled.
///
/// Notification payloads are ignored. Errors end the listener and are returned
/// to the caller; there is no reconnect loop beyond what `PgListener` does
/// internally.
pub async fn listen(
    db: &DatabaseConnection,
    channel: &str,
    publisher: EventPublisher,
    shutdown: CancellationToken,
) -> Result<(), Error> {
    let mut listener = PgListener::connect_with(db.get_postgres_connection_pool()).await?;
    listener.listen(channel).await?;

    info!("Listening for reading changes on channel \"{channel}\"");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Change listener on \"{channel}\" shutting down");
                return Ok(());
            }
            notification = listener.recv() => {
                let notification = notification?;
                debug!(
                    "Change notification on \"{}\" (payload: {:?})",
                    notification.channel(),
                    notification.payload()
                );
                publisher
                    .publish(DomainEvent::ReadingsChanged {
                        source: TriggerSource::ChangeNotification,
                    })
                    .await;
            }
        }
    }
}
