//! `WebSocket` session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::{ClientConnection, Outbound};
use super::handler::handle_message;
use super::registry::ConnectionRegistry;
use super::supervisor::LivenessSupervisor;
use super::transport::{Connection, ConnectionEvent};

/// Everything a session needs besides its socket.
#[derive(Clone)]
pub struct SessionContext {
    /// Starts the per-connection probe timer.
    pub supervisor: Arc<LivenessSupervisor>,
    /// Live connection tracking.
    pub registry: Arc<ConnectionRegistry>,
    /// Server-wide shutdown signal.
    pub shutdown: CancellationToken,
}

/// Run a `WebSocket` session for a connected client.
///
/// 1. Registers the connection and attaches the liveness supervisor
/// 2. Forwards queued frames (replies, probes) to the socket
/// 3. Dispatches inbound frames as [`ConnectionEvent`]s
/// 4. On close, error, or server shutdown: marks the connection closed,
///    detaches the supervisor, and deregisters
#[instrument(skip_all, fields(conn_id = %connection.id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection: Arc<ClientConnection>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    ctx: SessionContext,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let session_token = ctx.shutdown.child_token();

    counter!("ws_connections_total").increment(1);
    ctx.registry.add(connection.clone()).await;

    let supervision = match ctx.supervisor.attach(connection.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "failed to attach liveness supervisor");
            None
        }
    };
    dispatch_event(&connection, ConnectionEvent::Opened);

    let writer_token = session_token.clone();
    let writer = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                frame = outbound_rx.recv() => frame,
                () = writer_token.cancelled() => break,
            };
            let Some(frame) = frame else { break };
            let msg = match frame {
                Outbound::Text(text) => Message::Text(text.as_str().into()),
                Outbound::Probe => Message::Ping(Bytes::new()),
            };
            if let Err(e) = ws_tx.send(msg).await {
                debug!(error = %e, "socket write failed");
                break;
            }
        }
        // Peer may already be gone
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = session_token.cancelled() => {
                info!("server shutting down, closing connection");
                break;
            }
        };
        let Some(frame) = frame else { break };

        let event = match frame {
            Ok(Message::Text(text)) => ConnectionEvent::Message(text.as_str().to_owned()),
            Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                Ok(text) => ConnectionEvent::Message(text.to_owned()),
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Ok(Message::Pong(_)) => ConnectionEvent::Pong,
            // Answered by the protocol layer
            Ok(Message::Ping(_)) => continue,
            Ok(Message::Close(_)) => {
                debug!("client sent close frame");
                break;
            }
            Err(e) => ConnectionEvent::Error(e.to_string()),
        };

        let fatal = matches!(event, ConnectionEvent::Error(_));
        dispatch_event(&connection, event);
        if fatal {
            break;
        }
    }

    let _ = connection.mark_closed();
    if let Some(handle) = &supervision {
        let _ = handle.detach();
    }
    dispatch_event(&connection, ConnectionEvent::Closed);

    session_token.cancel();
    let _ = writer.await;
    let _ = ctx.registry.remove(&connection.id).await;

    if let Some(handle) = supervision {
        let conn_id = handle.connection_id().clone();
        let probes_sent = handle.probes_sent();
        let reason = handle.join().await;
        debug!(%conn_id, probes_sent, ?reason, "liveness timer released");
    }
}

/// React to one connection event.
pub fn dispatch_event(connection: &ClientConnection, event: ConnectionEvent) {
    match event {
        ConnectionEvent::Opened => info!(conn_id = %connection.id, "client connected"),
        ConnectionEvent::Message(text) => {
            let json = match handle_message(&text) {
                Ok(json) => json,
                Err(e) => {
                    warn!(conn_id = %connection.id, error = %e, "failed to serialize reply");
                    return;
                }
            };
            if let Err(e) = connection.send(Arc::new(json)) {
                warn!(conn_id = %connection.id, error = %e, "failed to enqueue reply");
            }
        }
        ConnectionEvent::Pong => {
            connection.mark_pong();
            info!(conn_id = %connection.id, "received pong from client");
        }
        ConnectionEvent::Error(error) => {
            warn!(conn_id = %connection.id, error, "websocket error");
        }
        ConnectionEvent::Closed => {
            counter!("ws_disconnections_total").increment(1);
            info!(
                conn_id = %connection.id,
                age_ms = connection.age().as_millis() as u64,
                dropped_frames = connection.drop_count(),
                "client disconnected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    // Full socket sessions are covered by tests/integration.rs; these
    // exercise event dispatch against a bare connection.
    use super::*;
    use pingwire_core::ConnectionId;
    use pingwire_core::logging::capture_logs;
    use tracing::Level;

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientConnection::new(ConnectionId::from("conn_s"), tx), rx)
    }

    #[tokio::test]
    async fn message_event_queues_fixed_reply() {
        let (conn, mut rx) = make_connection(4);
        dispatch_event(&conn, ConnectionEvent::Message("World".into()));

        let Some(Outbound::Text(json)) = rx.recv().await else {
            panic!("expected a text frame");
        };
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "Hello");
        assert_eq!(parsed["message"], "hi");
    }

    #[test]
    fn pong_event_is_recorded_and_logged() {
        let (logs, _guard) = capture_logs();
        let (conn, _rx) = make_connection(4);
        dispatch_event(&conn, ConnectionEvent::Pong);
        assert!(conn.last_pong_elapsed().is_some());
        assert!(logs.has_event(Level::INFO, "received pong from client"));
    }

    #[test]
    fn reply_on_closed_connection_is_logged_not_fatal() {
        let (logs, _guard) = capture_logs();
        let (conn, _rx) = make_connection(4);
        let _ = conn.mark_closed();
        dispatch_event(&conn, ConnectionEvent::Message("World".into()));
        assert!(logs.has_event(Level::WARN, "failed to enqueue reply"));
    }

    #[test]
    fn error_event_is_logged() {
        let (logs, _guard) = capture_logs();
        let (conn, _rx) = make_connection(4);
        dispatch_event(&conn, ConnectionEvent::Error("reset by peer".into()));
        let events = logs.events();
        let warning = events
            .iter()
            .find(|e| e.message == "websocket error")
            .unwrap();
        assert_eq!(warning.field("error"), Some("reset by peer"));
    }

    #[test]
    fn lifecycle_events_are_logged() {
        let (logs, _guard) = capture_logs();
        let (conn, _rx) = make_connection(4);
        dispatch_event(&conn, ConnectionEvent::Opened);
        dispatch_event(&conn, ConnectionEvent::Closed);
        assert!(logs.has_message("client connected"));
        assert!(logs.has_message("client disconnected"));
    }

    #[test]
    fn disconnect_log_reports_dropped_frames() {
        let (logs, _guard) = capture_logs();
        let (conn, rx) = make_connection(4);
        drop(rx);
        dispatch_event(&conn, ConnectionEvent::Message("World".into()));
        dispatch_event(&conn, ConnectionEvent::Closed);

        let events = logs.events();
        let closed = events
            .iter()
            .find(|e| e.message == "client disconnected")
            .unwrap();
        assert_eq!(closed.field("dropped_frames"), Some("1"));
    }
}
