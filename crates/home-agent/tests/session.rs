//! Session lifecycle tests against an in-process control server.

mod common;

use common::{accept, bind, complete_handshake, recv_non_ping, recv_text, send_json, send_raw, test_config};
use futures_util::StreamExt;
use ha_client::HaClient;
use home_agent::error::AgentError;
use home_agent::session::Session;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

fn session_for(server_url: &str, ha_url: &str) -> Session {
    let config = test_config(server_url, ha_url);
    let ha = HaClient::new(ha_url, "ha-token");
    Session::new(config, ha, CancellationToken::new())
}

#[tokio::test]
async fn command_gets_exactly_one_correlated_response() {
    let (listener, url) = bind().await;
    let mut session = session_for(&url, "http://127.0.0.1:1");
    let agent = tokio::spawn(async move { session.run().await });

    let mut ws = accept(&listener).await;
    complete_handshake(&mut ws).await;

    send_json(
        &mut ws,
        json!({
            "type": "ha_command",
            "request_id": "req-42",
            "command": {"action": "definitely_not_an_action"}
        }),
    )
    .await;

    let reply = recv_non_ping(&mut ws).await;
    assert_eq!(reply["type"], "ha_response");
    assert_eq!(reply["request_id"], "req-42");
    assert_eq!(reply["result"]["success"], false);
    assert_eq!(
        reply["result"]["error"],
        "Unknown action: definitely_not_an_action"
    );

    ws.close(None).await.unwrap();
    agent.await.unwrap().unwrap();
}

#[tokio::test]
async fn non_welcome_reply_aborts_before_the_concurrent_phase() {
    let (listener, url) = bind().await;
    let mut session = session_for(&url, "http://127.0.0.1:1");
    let agent = tokio::spawn(async move { session.run().await });

    let mut ws = accept(&listener).await;
    let frame = recv_text(&mut ws).await;
    assert_eq!(frame["type"], "handshake");
    send_json(&mut ws, json!({"type": "error", "error": "nope"})).await;

    let err = agent.await.unwrap().unwrap_err();
    assert!(matches!(err, AgentError::Handshake(_)));

    // No heartbeat or dispatch activity started: the connection just ends,
    // with no ping ever sent. Heartbeat interval in tests is 50ms, so 300ms
    // is plenty to catch a stray one.
    let saw = tokio::time::timeout(Duration::from_millis(300), async {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let v: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                if v["type"] == "ping" {
                    return true;
                }
            }
        }
        false
    })
    .await;
    assert!(!matches!(saw, Ok(true)), "no ping expected after rejected handshake");
}

#[tokio::test]
async fn malformed_frame_does_not_kill_the_session() {
    let (listener, url) = bind().await;
    let mut session = session_for(&url, "http://127.0.0.1:1");
    let agent = tokio::spawn(async move { session.run().await });

    let mut ws = accept(&listener).await;
    complete_handshake(&mut ws).await;

    send_raw(&mut ws, "{{{ this is not json").await;
    send_json(
        &mut ws,
        json!({"type": "ha_command", "request_id": 7, "command": {"action": "bogus"}}),
    )
    .await;

    let reply = recv_non_ping(&mut ws).await;
    assert_eq!(reply["type"], "ha_response");
    assert_eq!(reply["request_id"], 7);

    ws.close(None).await.unwrap();
    agent.await.unwrap().unwrap();
}

#[tokio::test]
async fn heartbeat_keeps_flowing_during_a_slow_command() {
    let ha_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/states/light.kitchen"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(json!({"entity_id": "light.kitchen", "state": "on"}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&ha_server)
        .await;

    let (listener, url) = bind().await;
    let mut session = session_for(&url, &ha_server.uri());
    let agent = tokio::spawn(async move { session.run().await });

    let mut ws = accept(&listener).await;
    complete_handshake(&mut ws).await;

    send_json(
        &mut ws,
        json!({
            "type": "ha_command",
            "request_id": "slow-1",
            "command": {"action": "get_state", "entity_id": "light.kitchen"}
        }),
    )
    .await;

    // With a 50ms heartbeat and a 400ms command, pings must arrive while the
    // command is still executing.
    let mut pings = 0;
    loop {
        let frame = recv_text(&mut ws).await;
        if frame["type"] == "ping" {
            pings += 1;
            continue;
        }
        assert_eq!(frame["type"], "ha_response");
        assert_eq!(frame["request_id"], "slow-1");
        assert_eq!(frame["result"]["success"], true);
        break;
    }
    assert!(pings >= 2, "expected heartbeats during the slow command, saw {pings}");

    ws.close(None).await.unwrap();
    agent.await.unwrap().unwrap();
}

#[tokio::test]
async fn http_401_upgrade_is_reported_as_unauthorized() {
    let (listener, url) = bind().await;
    let mut session = session_for(&url, "http://127.0.0.1:1");
    let agent = tokio::spawn(async move { session.run().await });

    let (stream, _) = listener.accept().await.unwrap();
    let rejected = tokio_tungstenite::accept_hdr_async(
        stream,
        |_req: &Request, _resp: Response| -> Result<Response, ErrorResponse> {
            Err(Response::builder()
                .status(401)
                .body(Some("invalid token".to_string()))
                .unwrap())
        },
    )
    .await;
    assert!(rejected.is_err());

    let err = agent.await.unwrap().unwrap_err();
    assert!(matches!(err, AgentError::Unauthorized));
}

#[tokio::test]
async fn cancellation_ends_the_session_cleanly() {
    let (listener, url) = bind().await;
    let cancel = CancellationToken::new();
    let config = test_config(&url, "http://127.0.0.1:1");
    let ha = HaClient::new("http://127.0.0.1:1", "ha-token");
    let mut session = Session::new(config, ha, cancel.clone());
    let agent = tokio::spawn(async move { session.run().await });

    let mut ws = accept(&listener).await;
    complete_handshake(&mut ws).await;

    // Let the concurrent phase spin up, then request a stop.
    let _ = recv_text(&mut ws).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), agent)
        .await
        .expect("session should end after cancellation")
        .unwrap();
    assert!(result.is_ok());
}
