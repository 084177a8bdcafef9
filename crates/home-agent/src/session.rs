//! Connection session: one full connect → handshake → concurrent phase →
//! teardown lifecycle over a single WebSocket.

use crate::commands;
use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::heartbeat::run_heartbeat;
use crate::messages::{InboundMessage, OutboundMessage};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use ha_client::HaClient;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Lifecycle of the single connection a session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Handshaking,
    Active,
    Closing,
}

/// One connection attempt. The supervisor creates a fresh session per cycle;
/// the connection handle never leaves this value.
pub struct Session {
    config: AgentConfig,
    ha: HaClient,
    cancel: CancellationToken,
    state: ConnectionState,
}

impl Session {
    pub fn new(config: AgentConfig, ha: HaClient, cancel: CancellationToken) -> Self {
        Self {
            config,
            ha,
            cancel,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run the full session lifecycle. Returns once the connection has ended,
    /// for any reason; the state is back to `Disconnected` either way.
    pub async fn run(&mut self) -> AgentResult<()> {
        let result = self.connect_and_run().await;
        self.state = ConnectionState::Disconnected;
        result
    }

    async fn connect_and_run(&mut self) -> AgentResult<()> {
        self.state = ConnectionState::Handshaking;
        info!("Connecting to control server...");

        let ws = match connect_async(self.config.ws_url()).await {
            Ok((ws, _)) => ws,
            Err(e) => return Err(classify_connect_error(e)),
        };
        let (mut write, mut read) = ws.split();

        // Handshake: send ours, then require exactly one welcome back.
        let frame = OutboundMessage::handshake().to_json()?;
        write.send(Message::text(frame)).await?;
        self.await_welcome(&mut read).await?;

        self.state = ConnectionState::Active;
        info!("Connected to control server");

        // Single writer task; heartbeat and dispatch both feed it.
        let (tx, mut rx) = mpsc::channel::<Message>(32);
        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if write.send(frame).await.is_err() {
                    break;
                }
            }
        });

        let heartbeat_cancel = self.cancel.child_token();
        let heartbeat = tokio::spawn(run_heartbeat(
            tx.clone(),
            self.config.heartbeat_interval,
            heartbeat_cancel.clone(),
        ));

        let outcome = self.dispatch(&mut read, &tx).await;

        // Teardown: heartbeat first, then close and drain the writer.
        self.state = ConnectionState::Closing;
        heartbeat_cancel.cancel();
        let _ = heartbeat.await;
        let _ = tx.send(Message::Close(None)).await;
        drop(tx);
        let _ = writer.await;

        outcome
    }

    /// Await the single handshake reply. Anything but a `welcome` text frame
    /// within the timeout aborts the session.
    async fn await_welcome(&self, read: &mut WsRead) -> AgentResult<()> {
        let reply = match timeout(self.config.handshake_timeout, read.next()).await {
            Err(_) => {
                return Err(AgentError::Handshake(
                    "timed out waiting for welcome".to_string(),
                ))
            }
            Ok(None) => {
                return Err(AgentError::Handshake(
                    "connection closed before welcome".to_string(),
                ))
            }
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(Some(Ok(frame))) => frame,
        };

        let Message::Text(text) = reply else {
            return Err(AgentError::Handshake(
                "non-text handshake reply".to_string(),
            ));
        };
        match serde_json::from_str::<InboundMessage>(text.as_str()) {
            Ok(InboundMessage::Welcome) => Ok(()),
            Ok(_) | Err(_) => Err(AgentError::Handshake(format!(
                "unexpected reply: {text}"
            ))),
        }
    }

    /// Inbound dispatch loop: process frames in arrival order until the
    /// connection ends or a stop is requested.
    async fn dispatch(&self, read: &mut WsRead, tx: &mpsc::Sender<Message>) -> AgentResult<()> {
        loop {
            let frame = tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("stop requested");
                    return Ok(());
                }
                next = timeout(self.config.read_timeout, read.next()) => match next {
                    Err(_) => {
                        warn!("no frames within read timeout, dropping connection");
                        return Err(AgentError::ConnectionClosed);
                    }
                    Ok(None) => {
                        info!("connection closed by peer");
                        return Ok(());
                    }
                    Ok(Some(Err(e))) => {
                        error!(error = %e, "WebSocket error");
                        return Err(e.into());
                    }
                    Ok(Some(Ok(frame))) => frame,
                },
            };

            match frame {
                Message::Text(text) => match serde_json::from_str::<InboundMessage>(text.as_str()) {
                    Ok(msg) => self.handle_message(msg, tx).await?,
                    // One bad frame must not kill the session
                    Err(e) => debug!(error = %e, "dropping malformed frame"),
                },
                Message::Close(_) => {
                    info!("close frame received");
                    return Ok(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data)).await;
                }
                Message::Pong(_) | Message::Frame(_) => {}
                Message::Binary(_) => {
                    warn!("unexpected binary frame, dropping connection");
                    return Err(AgentError::ConnectionClosed);
                }
            }
        }
    }

    async fn handle_message(
        &self,
        msg: InboundMessage,
        tx: &mpsc::Sender<Message>,
    ) -> AgentResult<()> {
        match msg {
            InboundMessage::Pong => {}
            InboundMessage::Welcome => debug!("duplicate welcome ignored"),
            InboundMessage::Unknown => debug!("unknown message type ignored"),
            InboundMessage::HaCommand { request_id, command } => {
                info!(action = %command.action, "command received");
                let result = commands::execute(&self.ha, command).await;
                let reply = OutboundMessage::response(request_id, result).to_json()?;
                tx.send(Message::text(reply))
                    .await
                    .map_err(|_| AgentError::ConnectionClosed)?;
            }
        }
        Ok(())
    }
}

/// A rejected upgrade with a credential-related status is reported distinctly
/// so the operator can tell a bad token from an unreachable server.
fn classify_connect_error(e: tungstenite::Error) -> AgentError {
    if let tungstenite::Error::Http(ref resp) = e {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return AgentError::Unauthorized;
        }
    }
    AgentError::WebSocket(e)
}
