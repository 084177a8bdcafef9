//! Command execution against the local API.

use crate::messages::{CommandPayload, CommandResult};
use ha_client::{policy, HaClient};
use serde_json::{Map, Value};
use tracing::warn;

/// The closed set of actions the remote server may request.
#[derive(Debug, Clone, PartialEq)]
pub enum HaAction {
    GetEntities,
    GetState {
        entity_id: Option<String>,
    },
    CallService {
        domain: Option<String>,
        service: Option<String>,
        entity_id: Option<String>,
        data: Map<String, Value>,
    },
    /// Anything else, carrying the original action string for the error
    /// reply.
    Unknown(String),
}

impl From<CommandPayload> for HaAction {
    fn from(payload: CommandPayload) -> Self {
        match payload.action.as_str() {
            "get_entities" => Self::GetEntities,
            "get_state" => Self::GetState {
                entity_id: payload.entity_id,
            },
            "call_service" => Self::CallService {
                domain: payload.domain,
                service: payload.service,
                entity_id: payload.entity_id,
                data: payload.data,
            },
            _ => Self::Unknown(payload.action),
        }
    }
}

/// Execute one command. Never fails: every failure mode is folded into a
/// `success:false` result so the dispatch loop always has a reply to send.
pub async fn execute(ha: &HaClient, command: CommandPayload) -> CommandResult {
    match HaAction::from(command) {
        HaAction::GetEntities => match ha.list_entities().await {
            Ok(entities) => CommandResult::entities(entities),
            Err(e) => CommandResult::error(e.to_string()),
        },
        HaAction::GetState { entity_id } => {
            let Some(entity_id) = entity_id else {
                return CommandResult::error("get_state requires entity_id");
            };
            match ha.entity_state(&entity_id).await {
                Ok(state) => CommandResult::state(state),
                Err(e) => CommandResult::error(e.to_string()),
            }
        }
        HaAction::CallService {
            domain,
            service,
            entity_id,
            data,
        } => {
            let domain = domain.unwrap_or_default();
            if !policy::is_allowed(&domain) {
                warn!(domain = %domain, "service call blocked by policy");
                return CommandResult::error(format!("Domain '{domain}' not allowed"));
            }
            let Some(service) = service else {
                return CommandResult::error("call_service requires service");
            };
            match ha.call_service(&domain, &service, entity_id.as_deref(), data).await {
                Ok(()) => CommandResult::message(format!("Called {domain}.{service}")),
                Err(e) => CommandResult::error(e.to_string()),
            }
        }
        HaAction::Unknown(action) => CommandResult::error(format!("Unknown action: {action}")),
    }
}
