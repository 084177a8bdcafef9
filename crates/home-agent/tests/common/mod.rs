//! In-process control-server harness for integration tests.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use home_agent::AgentConfig;
use serde_json::Value;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub type ServerWs = WebSocketStream<TcpStream>;

/// Bind a listener on an ephemeral port and return it with its http URL.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

/// Accept the next connection as a websocket.
pub async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Read the agent's handshake frame and reply with a welcome.
pub async fn complete_handshake(ws: &mut ServerWs) -> Value {
    let frame = recv_text(ws).await;
    assert_eq!(frame["type"], "handshake");
    assert_eq!(frame["ha_url"], "local");
    send_json(ws, serde_json::json!({"type": "welcome"})).await;
    frame
}

pub async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

pub async fn send_raw(ws: &mut ServerWs, raw: &str) {
    ws.send(Message::text(raw.to_string())).await.unwrap();
}

/// Next text frame as JSON, skipping transport frames.
pub async fn recv_text(ws: &mut ServerWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Next text frame that is not a heartbeat ping.
pub async fn recv_non_ping(ws: &mut ServerWs) -> Value {
    loop {
        let frame = recv_text(ws).await;
        if frame["type"] != "ping" {
            return frame;
        }
    }
}

/// Config with timings shrunk for tests.
pub fn test_config(server_url: &str, ha_url: &str) -> AgentConfig {
    let mut config = AgentConfig::new(server_url, "test-token", ha_url, "ha-token");
    config.reconnect_delay = Duration::from_millis(100);
    config.heartbeat_interval = Duration::from_millis(50);
    config.handshake_timeout = Duration::from_secs(5);
    config.read_timeout = Duration::from_secs(5);
    config.startup_probe_pause = Duration::from_millis(50);
    config
}
