//! Reconnection supervisor: runs session lifecycles until stopped.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::session::Session;
use ha_client::HaClient;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Outer control loop. Owns the shared HTTP client and the stop token;
/// creates one [`Session`] per connection attempt and retries forever at a
/// fixed delay.
pub struct Supervisor {
    config: AgentConfig,
    ha: HaClient,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(config: AgentConfig, cancel: CancellationToken) -> Self {
        let ha = HaClient::new(&config.ha_url, &config.ha_token);
        Self { config, ha, cancel }
    }

    /// Run until the stop token is cancelled.
    pub async fn run(self) {
        info!(version = env!("CARGO_PKG_VERSION"), "Home agent starting");

        // One best-effort probe; a failure is logged but non-fatal since the
        // local API usually becomes reachable shortly after we start.
        if !self.ha.probe().await {
            error!("Cannot reach Home Assistant, continuing after a pause");
            if self.sleep_cancellable(self.config.startup_probe_pause).await {
                return;
            }
        }

        while !self.cancel.is_cancelled() {
            let mut session = Session::new(
                self.config.clone(),
                self.ha.clone(),
                self.cancel.clone(),
            );
            match session.run().await {
                Ok(()) => info!("session ended"),
                Err(AgentError::Unauthorized) => {
                    error!("connection rejected: check the agent token")
                }
                Err(e) => error!(error = %e, "connection error"),
            }

            if self.cancel.is_cancelled() {
                break;
            }
            info!(
                delay_secs = self.config.reconnect_delay.as_secs(),
                "reconnecting after delay"
            );
            if self.sleep_cancellable(self.config.reconnect_delay).await {
                break;
            }
        }

        info!("supervisor stopped");
    }

    /// Sleep that races the stop token. Returns true if cancelled.
    async fn sleep_cancellable(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => true,
            () = tokio::time::sleep(duration) => false,
        }
    }
}
