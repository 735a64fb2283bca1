//! Client against a real echo server.

use std::time::Duration;

use tokio::time::timeout;

use pingwire_client::{ClientConfig, ClientEvent, ClientSession, EchoClient};
use pingwire_server::{EchoServer, ServerConfig};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn boot_server(probe_interval_ms: u64) -> (EchoServer, ClientConfig) {
    let server = EchoServer::new(ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        probe_interval_ms,
        shutdown_timeout_ms: 1_000,
        ..ServerConfig::default()
    });
    let addr = server.start().await.unwrap();
    let config = ClientConfig {
        url: format!("ws://{addr}"),
        ..ClientConfig::default()
    };
    (server, config)
}

async fn next(session: &mut ClientSession) -> ClientEvent {
    timeout(TIMEOUT, session.next_event())
        .await
        .expect("no event within timeout")
        .expect("event stream ended")
}

#[tokio::test]
async fn greeting_gets_reply() {
    let (server, config) = boot_server(30_000).await;
    let mut session = EchoClient::connect(&config).await.unwrap();

    assert_eq!(next(&mut session).await, ClientEvent::Opened);
    let ClientEvent::Message(text) = next(&mut session).await else {
        panic!("expected the echo reply");
    };
    let reply: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reply["type"], "Hello");
    assert_eq!(reply["message"], "hi");

    session.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn extra_messages_get_replies() {
    let (server, config) = boot_server(30_000).await;
    let mut session = EchoClient::connect(&config).await.unwrap();
    session.send_text("again").await.unwrap();

    let mut replies = 0;
    while replies < 2 {
        if let ClientEvent::Message(_) = next(&mut session).await {
            replies += 1;
        }
    }

    session.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn probes_surface_as_events() {
    let (server, config) = boot_server(100).await;
    let mut session = EchoClient::connect(&config).await.unwrap();

    loop {
        if next(&mut session).await == ClientEvent::Probe {
            break;
        }
    }

    session.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn close_ends_with_closed_event() {
    let (server, config) = boot_server(30_000).await;
    let mut session = EchoClient::connect(&config).await.unwrap();
    session.close().await.unwrap();

    let mut last = None;
    while let Ok(Some(event)) = timeout(TIMEOUT, session.next_event()).await {
        last = Some(event);
    }
    assert_eq!(last, Some(ClientEvent::Closed));
    assert!(session.send_text("late").await.is_err());

    server.stop().await;
}

#[tokio::test]
async fn server_stop_closes_session() {
    let (server, config) = boot_server(30_000).await;
    let mut session = EchoClient::connect(&config).await.unwrap();
    assert_eq!(next(&mut session).await, ClientEvent::Opened);

    server.stop().await;

    loop {
        if next(&mut session).await == ClientEvent::Closed {
            break;
        }
    }
}

#[tokio::test]
async fn server_sees_client_disconnect() {
    let (server, config) = boot_server(30_000).await;
    let session = EchoClient::connect(&config).await.unwrap();

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while server.registry().connection_count().await != 1 {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    drop(session);
    while server.registry().connection_count().await != 0 {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    server.stop().await;
}
