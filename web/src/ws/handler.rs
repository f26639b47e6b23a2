use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use log::*;
use realtime::connection::ConnectionId;
use realtime::message::{ClientMessage, Event, EventType};
use realtime::Dispatcher;
use std::future::Future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// GET upgrade to a live `table:topN` subscription
#[utoipa::path(
    get,
    path = "/ws",
    responses(
        (status = 101, description = "Switching to the WebSocket protocol"),
        (status = 400, description = "The request was not a WebSocket upgrade"),
    )
)]
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Owns one socket for its whole life: registers it, sends the initial
/// payload, applies inbound limit changes and unregisters on close.
async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let dispatcher = app_state.dispatcher.clone();
    let shutdown = &app_state.shutdown;
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = dispatcher.connect(tx);
    let (sink, mut stream) = socket.split();

    let writer = tokio::spawn(write_events(sink, rx, connection_id.clone()));

    // Fetch failures are logged by the dispatcher; the socket stays open for
    // the next broadcast.
    let mut open = unless_shutdown(shutdown, dispatcher.send_current(&connection_id))
        .await
        .is_some();

    while open {
        open = tokio::select! {
            _ = shutdown.cancelled() => false,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let update = handle_text(&dispatcher, &connection_id, text.as_str());
                    unless_shutdown(shutdown, update).await.is_some()
                }
                Some(Ok(Message::Close(_))) | None => false,
                // Pings are answered by axum; binary frames carry nothing we accept.
                Some(Ok(_)) => true,
                Some(Err(e)) => {
                    warn!("WebSocket error on connection {connection_id}: {e}");
                    false
                }
            }
        };
    }

    if shutdown.is_cancelled() {
        debug!("Closing connection {connection_id} for shutdown");
    }

    // Dropping the registry entry drops its sender, which ends the writer.
    dispatcher.disconnect(&connection_id);
    if let Err(e) = writer.await {
        warn!("Writer task for connection {connection_id} failed: {e}");
    }
}

/// Runs `work` to completion unless shutdown fires first.
async fn unless_shutdown<F: Future>(shutdown: &CancellationToken, work: F) -> Option<F::Output> {
    tokio::select! {
        _ = shutdown.cancelled() => None,
        output = work => Some(output),
    }
}

async fn write_events(
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Event>,
    connection_id: ConnectionId,
) {
    while let Some(event) = rx.recv().await {
        trace!("Sending {} to connection {connection_id}", event.event_type());
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize event for connection {connection_id}: {e}");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            debug!("Connection {connection_id} stopped accepting frames: {e}");
            return;
        }
    }
    let _ = sink.close().await;
}

/// Apply one inbound text frame. Anything other than a well-formed
/// `set-row-limit` is logged and ignored.
async fn handle_text(dispatcher: &Dispatcher, connection_id: &ConnectionId, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SetRowLimit(requested)) => {
            let _ = dispatcher.update_limit(connection_id, requested).await;
        }
        Err(e) => warn!("Ignoring malformed message from connection {connection_id}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_state, reading, StaticSource};
    use domain::limit::{MAX_LIMIT, MIN_LIMIT};
    use serde_json::Value;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::{sleep, timeout};
    use tokio_tungstenite::tungstenite::Message as ClientFrame;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const WAIT: Duration = Duration::from_secs(2);

    fn source() -> StaticSource {
        StaticSource {
            readings: (0..200).map(|i| reading(1, f64::from(i))).collect(),
            ..Default::default()
        }
    }

    async fn start_server(state: &AppState) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(crate::serve(listener, state.clone()));
        address
    }

    async fn connect(address: SocketAddr) -> Client {
        let (client, _response) = connect_async(format!("ws://{address}/ws")).await.unwrap();
        client
    }

    async fn next_payload(client: &mut Client) -> Value {
        loop {
            let frame = timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
            if let ClientFrame::Text(text) = frame {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// True once the server's Close frame arrives, false if the stream ends without one.
    async fn server_closed(client: &mut Client) -> bool {
        loop {
            match timeout(WAIT, client.next()).await.unwrap() {
                Some(Ok(ClientFrame::Close(_))) => return true,
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return false,
            }
        }
    }

    async fn wait_for_connections(state: &AppState, expected: usize) {
        timeout(WAIT, async {
            while state.dispatcher.manager().connection_count() != expected {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn socket_receives_initial_payload_and_unregisters_on_close() {
        let (state, _task) = app_state(source());
        let mut client = connect(start_server(&state).await).await;

        let payload = next_payload(&mut client).await;
        assert_eq!(payload["event"], "table:topN");
        assert_eq!(payload["data"]["limit"], MIN_LIMIT);
        assert_eq!(
            payload["data"]["rows"][0]["temperature_c"]
                .as_array()
                .unwrap()
                .len(),
            MIN_LIMIT as usize
        );
        assert_eq!(state.dispatcher.manager().connection_count(), 1);

        client
            .send(ClientFrame::text(
                r#"{"event":"set-row-limit","data":99999999999999999999}"#.to_string(),
            ))
            .await
            .unwrap();
        let payload = next_payload(&mut client).await;
        assert_eq!(payload["data"]["limit"], MAX_LIMIT);

        client.close(None).await.unwrap();
        wait_for_connections(&state, 0).await;

        let report = state.dispatcher.refresh_all().await.unwrap();
        assert_eq!(report.delivered, 0);
        state.shutdown.cancel();
    }

    #[tokio::test]
    async fn shutdown_closes_open_sockets() {
        let (state, _task) = app_state(source());
        let mut client = connect(start_server(&state).await).await;
        next_payload(&mut client).await;

        state.shutdown.cancel();

        assert!(server_closed(&mut client).await);
        wait_for_connections(&state, 0).await;
    }

    #[tokio::test]
    async fn shutdown_does_not_wait_for_a_slow_initial_fetch() {
        let (state, _task) = app_state(StaticSource {
            delay: Some(Duration::from_secs(60)),
            ..source()
        });
        let mut client = connect(start_server(&state).await).await;
        wait_for_connections(&state, 1).await;

        state.shutdown.cancel();

        assert!(server_closed(&mut client).await);
        wait_for_connections(&state, 0).await;
    }

    #[tokio::test]
    async fn set_row_limit_updates_the_limit_and_resends() {
        let (state, _task) = app_state(source());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = state.dispatcher.connect(tx);

        handle_text(&state.dispatcher, &id, r#"{"event":"set-row-limit","data":150}"#).await;

        assert_eq!(state.dispatcher.manager().limit(&id), Some(150));
        let Event::TableTopN { rows, limit } = rx.try_recv().unwrap();
        assert_eq!(limit, 150);
        assert_eq!(rows[0].len(), 150);
    }

    #[tokio::test]
    async fn out_of_range_limits_are_clamped_not_rejected() {
        let (state, _task) = app_state(source());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = state.dispatcher.connect(tx);

        handle_text(&state.dispatcher, &id, r#"{"event":"set-row-limit","data":1}"#).await;

        assert_eq!(state.dispatcher.manager().limit(&id), Some(MIN_LIMIT));
        let Event::TableTopN { limit, .. } = rx.try_recv().unwrap();
        assert_eq!(limit, MIN_LIMIT);
    }

    #[tokio::test]
    async fn limits_beyond_i64_clamp_to_max_limit() {
        let (state, _task) = app_state(source());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = state.dispatcher.connect(tx);

        for text in [
            r#"{"event":"set-row-limit","data":99999999999999999999}"#,
            r#"{"event":"set-row-limit","data":5000.0}"#,
        ] {
            handle_text(&state.dispatcher, &id, text).await;

            assert_eq!(state.dispatcher.manager().limit(&id), Some(MAX_LIMIT), "{text}");
            let Event::TableTopN { limit, .. } = rx.try_recv().unwrap();
            assert_eq!(limit, MAX_LIMIT);
        }
    }

    #[tokio::test]
    async fn malformed_messages_are_ignored() {
        let (state, _task) = app_state(source());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = state.dispatcher.connect(tx);
        state.dispatcher.manager().set_limit(&id, 120);

        for text in [
            "not json",
            r#"{"event":"set-row-limit","data":"lots"}"#,
            r#"{"event":"unsubscribe"}"#,
        ] {
            handle_text(&state.dispatcher, &id, text).await;
        }

        assert_eq!(state.dispatcher.manager().limit(&id), Some(120));
        assert!(rx.try_recv().is_err());
    }
}
