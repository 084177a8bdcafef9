//! Agent configuration.

use std::time::Duration;

/// Configuration for the agent. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Control server base URL (http/https, converted to ws/wss)
    pub server_url: String,

    /// Bearer credential for the control server
    pub agent_token: String,

    /// Base URL of the local Home Assistant API
    pub ha_url: String,

    /// Bearer credential for the local API
    pub ha_token: String,

    /// Fixed delay between reconnection attempts
    pub reconnect_delay: Duration,

    /// Interval between heartbeat pings
    pub heartbeat_interval: Duration,

    /// How long to wait for the welcome reply
    pub handshake_timeout: Duration,

    /// Idle bound on each inbound frame read
    pub read_timeout: Duration,

    /// Pause after a failed startup probe before connecting anyway
    pub startup_probe_pause: Duration,
}

impl AgentConfig {
    /// Create a config with default timings.
    pub fn new(
        server_url: impl Into<String>,
        agent_token: impl Into<String>,
        ha_url: impl Into<String>,
        ha_token: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            agent_token: agent_token.into(),
            ha_url: ha_url.into().trim_end_matches('/').to_string(),
            ha_token: ha_token.into(),
            reconnect_delay: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(60),
            startup_probe_pause: Duration::from_secs(10),
        }
    }

    /// The WebSocket endpoint, with the agent token carried as a query
    /// parameter and the scheme mapped to the transport's variants.
    pub fn ws_url(&self) -> String {
        let base = if let Some(rest) = self.server_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.server_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.server_url.clone()
        };
        format!("{base}/api/v1/agent/ws?token={}", self.agent_token)
    }
}
