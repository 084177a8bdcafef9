//! HTTP client for the local Home Assistant API.

use crate::error::{HaError, HaResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Default bound for every request issued through the shared client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tighter bound for the one-shot startup probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// One entity in a `get_entities` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity_id: String,
    pub state: Value,
    pub name: String,
}

/// Raw entry from `GET /api/states`. Fields are defaulted so one sparse
/// entity cannot fail the whole snapshot.
#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    entity_id: String,
    #[serde(default)]
    state: Value,
    #[serde(default)]
    attributes: Map<String, Value>,
}

/// Client for the local Home Assistant REST API.
///
/// Holds one `reqwest::Client` for the process lifetime; all calls are
/// bearer-authenticated and bounded by [`REQUEST_TIMEOUT`].
#[derive(Clone, Debug)]
pub struct HaClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HaClient {
    /// Create a new client for the given base URL and bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    /// Best-effort connectivity probe against `GET /api/`.
    ///
    /// Failure is reported to the caller as `false`, never as an error:
    /// the local API commonly becomes reachable shortly after this agent
    /// starts, so startup proceeds either way.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/api/", self.base_url);
        let result = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                let version = resp
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|body| body.get("version").and_then(Value::as_str).map(String::from))
                    .unwrap_or_else(|| "connected".to_string());
                info!(version = %version, "Home Assistant reachable");
                true
            }
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "HA probe returned error status");
                false
            }
            Err(e) => {
                warn!(error = %e, "HA probe failed");
                false
            }
        }
    }

    /// Fetch the full state snapshot, grouped by the domain prefix of each
    /// entity id. Ids without a `.` separator are skipped.
    pub async fn list_entities(&self) -> HaResult<BTreeMap<String, Vec<EntitySummary>>> {
        let url = format!("{}/api/states", self.base_url);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        if !resp.status().is_success() {
            return Err(HaError::Status(resp.status().as_u16()));
        }

        let states: Vec<RawEntity> = resp.json().await?;
        let mut entities: BTreeMap<String, Vec<EntitySummary>> = BTreeMap::new();
        for entity in states {
            let Some((domain, _)) = entity.entity_id.split_once('.') else {
                continue;
            };
            let name = entity
                .attributes
                .get("friendly_name")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| entity.entity_id.clone());
            entities.entry(domain.to_string()).or_default().push(EntitySummary {
                entity_id: entity.entity_id,
                state: entity.state,
                name,
            });
        }
        Ok(entities)
    }

    /// Fetch the raw state object for a single entity.
    pub async fn entity_state(&self, entity_id: &str) -> HaResult<Value> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        if !resp.status().is_success() {
            return Err(HaError::Status(resp.status().as_u16()));
        }
        Ok(resp.json().await?)
    }

    /// Invoke a service on a domain.
    ///
    /// `entity_id` is merged into the body first so explicit `data` keys can
    /// override it.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: Option<&str>,
        data: Map<String, Value>,
    ) -> HaResult<()> {
        let url = format!("{}/api/services/{}/{}", self.base_url, domain, service);

        let mut body = Map::new();
        if let Some(entity_id) = entity_id {
            body.insert("entity_id".to_string(), Value::String(entity_id.to_string()));
        }
        body.extend(data);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(HaError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}
