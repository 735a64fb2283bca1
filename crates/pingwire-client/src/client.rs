//! Echo client: connect, greet, and report what the server sends back.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::errors::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Something observed on the client's connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// The handshake completed.
    Opened,
    /// A text frame (or UTF-8 binary frame) from the server.
    Message(String),
    /// A liveness probe from the server. The pong is sent automatically.
    Probe,
    /// The connection ended. Always the last event.
    Closed,
    /// A transport error. Followed by [`ClientEvent::Closed`].
    Error(String),
}

enum Command {
    Text(String),
    Close,
}

/// Entry point for opening client sessions.
pub struct EchoClient;

impl EchoClient {
    /// Connect to `config.url` and send `config.greeting`.
    ///
    /// Events start flowing immediately; the first is always
    /// [`ClientEvent::Opened`].
    #[instrument(skip_all, fields(url = %config.url))]
    pub async fn connect(config: &ClientConfig) -> Result<ClientSession, ClientError> {
        let (ws, _) = connect_async(config.url.as_str())
            .await
            .map_err(|e| ClientError::Connect {
                url: config.url.clone(),
                source: Box::new(e),
            })?;
        info!(url = %config.url, "connected to server");

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = event_tx.send(ClientEvent::Opened);

        let handler = tokio::spawn(client_loop(ws, cmd_rx, event_tx));
        let session = ClientSession {
            cmd_tx,
            events: event_rx,
            handler: Some(handler),
        };
        session.send_text(&config.greeting).await?;
        debug!(greeting = %config.greeting, "sent greeting");
        Ok(session)
    }
}

/// A live client connection.
///
/// Dropping the session closes the connection.
pub struct ClientSession {
    cmd_tx: mpsc::Sender<Command>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    handler: Option<JoinHandle<()>>,
}

impl ClientSession {
    /// Next event, or `None` once [`ClientEvent::Closed`] has been taken.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    /// Send a text frame.
    pub async fn send_text(&self, text: &str) -> Result<(), ClientError> {
        self.cmd_tx
            .send(Command::Text(text.to_owned()))
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Send a close frame and wait for the connection to wind down.
    ///
    /// Remaining events (ending with [`ClientEvent::Closed`]) are still
    /// readable afterwards.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        let sent = self.cmd_tx.send(Command::Close).await;
        if let Some(handler) = self.handler.take() {
            let _ = handler.await;
        }
        sent.map_err(|_| ClientError::Closed)
    }
}

/// Map an inbound frame to the event it surfaces, if any.
fn inbound_event(msg: Message) -> Option<ClientEvent> {
    match msg {
        Message::Text(text) => Some(ClientEvent::Message(text.as_str().to_owned())),
        Message::Binary(data) => match String::from_utf8(data.to_vec()) {
            Ok(text) => Some(ClientEvent::Message(text)),
            Err(_) => {
                debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                None
            }
        },
        Message::Ping(_) => Some(ClientEvent::Probe),
        Message::Pong(_) | Message::Frame(_) => None,
        Message::Close(_) => Some(ClientEvent::Closed),
    }
}

async fn client_loop(
    ws: WsStream,
    mut cmd_rx: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Text(text)) => {
                        if let Err(e) = ws_tx.send(Message::text(text)).await {
                            warn!(error = %e, "failed to send to server");
                            let _ = events.send(ClientEvent::Error(e.to_string()));
                            break;
                        }
                    }
                    // Explicit close or session dropped
                    Some(Command::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        drain_until_closed(&mut ws_rx, &events).await;
                        break;
                    }
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(msg)) => match inbound_event(msg) {
                        Some(ClientEvent::Closed) => break,
                        Some(event) => report(&events, event),
                        None => {}
                    },
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error");
                        let _ = events.send(ClientEvent::Error(e.to_string()));
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!("disconnected from server");
    let _ = events.send(ClientEvent::Closed);
}

/// Keep reading after our close frame until the server acknowledges it.
async fn drain_until_closed(
    ws_rx: &mut futures::stream::SplitStream<WsStream>,
    events: &mpsc::UnboundedSender<ClientEvent>,
) {
    while let Some(Ok(msg)) = ws_rx.next().await {
        match inbound_event(msg) {
            Some(ClientEvent::Closed) => break,
            Some(event) => report(events, event),
            None => {}
        }
    }
}

fn report(events: &mpsc::UnboundedSender<ClientEvent>, event: ClientEvent) {
    match &event {
        ClientEvent::Message(text) => info!(text = %text, "received from server"),
        ClientEvent::Probe => debug!("received probe from server"),
        _ => {}
    }
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn text_frame_is_message() {
        assert_eq!(
            inbound_event(Message::text(r#"{"type":"Hello","message":"hi"}"#)),
            Some(ClientEvent::Message(r#"{"type":"Hello","message":"hi"}"#.into()))
        );
    }

    #[test]
    fn utf8_binary_frame_is_message() {
        assert_eq!(
            inbound_event(Message::binary(b"hi".to_vec())),
            Some(ClientEvent::Message("hi".into()))
        );
    }

    #[test]
    fn invalid_binary_frame_is_skipped() {
        assert_eq!(inbound_event(Message::binary(vec![0xff, 0xfe])), None);
    }

    #[test]
    fn ping_is_probe() {
        assert_eq!(
            inbound_event(Message::Ping(Vec::new().into())),
            Some(ClientEvent::Probe)
        );
    }

    #[test]
    fn pong_is_ignored() {
        assert_eq!(inbound_event(Message::Pong(Vec::new().into())), None);
    }

    #[test]
    fn close_frame_ends_session() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        };
        assert_eq!(
            inbound_event(Message::Close(Some(frame))),
            Some(ClientEvent::Closed)
        );
    }

    #[tokio::test]
    async fn connect_to_nothing_fails() {
        let config = ClientConfig {
            url: "ws://127.0.0.1:1".into(),
            ..ClientConfig::default()
        };
        let err = EchoClient::connect(&config).await.err().unwrap();
        assert_matches!(err, ClientError::Connect { ref url, .. } if url == "ws://127.0.0.1:1");
    }
}
