//! Heartbeat: periodic liveness pings over the active connection.

use crate::messages::OutboundMessage;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Send a ping frame every `interval` until cancelled or the writer is gone.
///
/// This is a side activity of the session, not a supervisor: on any send
/// failure it stops silently and lets the dispatch loop observe the severed
/// connection on its own.
pub async fn run_heartbeat(
    tx: mpsc::Sender<Message>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Ok(frame) = OutboundMessage::Ping.to_json() else {
                    break;
                };
                if tx.send(Message::text(frame)).await.is_err() {
                    debug!("heartbeat writer gone, stopping");
                    break;
                }
            }
            () = cancel.cancelled() => break,
        }
    }
}
