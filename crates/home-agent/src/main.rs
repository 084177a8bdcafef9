//! Home agent binary entry point.

use clap::Parser;
use home_agent::{AgentConfig, Supervisor};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bridge between a remote control server and a local Home Assistant API.
#[derive(Parser, Debug)]
#[command(name = "home-agent")]
#[command(about = "Persistent agent bridging a control server to Home Assistant")]
#[command(version)]
struct Args {
    /// Control server URL (http/https)
    #[arg(long, env = "AGENT_SERVER_URL")]
    server: String,

    /// Bearer token for the control server
    #[arg(long, env = "AGENT_TOKEN")]
    token: String,

    /// Base URL of the local Home Assistant API
    #[arg(long, env = "HA_URL")]
    ha_url: String,

    /// Bearer token for the local API
    #[arg(long, env = "HA_TOKEN")]
    ha_token: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = AgentConfig::new(args.server, args.token, args.ha_url, args.ha_token);

    let cancel = CancellationToken::new();
    let supervisor = Supervisor::new(config, cancel.clone());
    let mut run_task = tokio::spawn(supervisor.run());

    tokio::select! {
        _ = &mut run_task => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, exiting...");
            cancel.cancel();
            let _ = run_task.await;
        }
    }
}
