//! Wire messages for the control-server channel.
//!
//! Both directions are JSON text frames tagged on `"type"`. The tag sets are
//! closed enums so the protocol surface is statically auditable; inbound
//! frames with an unknown tag deserialize to [`InboundMessage::Unknown`] and
//! are ignored by the dispatch loop.

use ha_client::EntitySummary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Messages sent to the control server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Handshake {
        agent_version: String,
        ha_url: String,
    },
    Ping,
    HaResponse {
        request_id: Value,
        result: CommandResult,
    },
}

impl OutboundMessage {
    /// The opening handshake. The literal `"local"` is sent instead of the
    /// real local URL so internal topology never crosses the wire.
    pub fn handshake() -> Self {
        Self::Handshake {
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            ha_url: "local".to_string(),
        }
    }

    /// A command reply, echoing the peer's correlation token verbatim.
    pub fn response(request_id: Value, result: CommandResult) -> Self {
        Self::HaResponse { request_id, result }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages received from the control server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Welcome,
    Pong,
    HaCommand {
        #[serde(default)]
        request_id: Value,
        #[serde(default)]
        command: CommandPayload,
    },
    /// Any other tag. Consumed without action.
    #[serde(other)]
    Unknown,
}

/// Raw command fields as they appear on the wire. Converted into the closed
/// action enum in [`crate::commands`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandPayload {
    #[serde(default)]
    pub action: String,
    pub domain: Option<String>,
    pub service: Option<String>,
    pub entity_id: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// The `result` object of an `ha_response`. Absent fields are omitted from
/// the JSON so replies stay minimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<BTreeMap<String, Vec<EntitySummary>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn entities(entities: BTreeMap<String, Vec<EntitySummary>>) -> Self {
        Self {
            success: true,
            entities: Some(entities),
            state: None,
            message: None,
            error: None,
        }
    }

    pub fn state(state: Value) -> Self {
        Self {
            success: true,
            entities: None,
            state: Some(state),
            message: None,
            error: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            entities: None,
            state: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            entities: None,
            state: None,
            message: None,
            error: Some(error.into()),
        }
    }
}
