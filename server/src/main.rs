use clap::Parser;
use log::{error, info};
use server::liveness::{LivenessSignal, LocalLiveness, SdkLiveness, DEFAULT_SDK_PORT};
use server::network::UdpTransport;
use server::registry::PlayerRegistry;
use server::{ServerConfig, Session};
use shared::{DEFAULT_PORT, MAX_PLAYERS};
use std::sync::Arc;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Interface to listen on
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// The port to listen to udp traffic on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between two health reports
    #[arg(long, default_value_t = 2)]
    health_interval: u64,

    /// Port of the orchestrator sidecar HTTP gateway
    #[arg(long, env = "AGONES_SDK_HTTP_PORT", default_value_t = DEFAULT_SDK_PORT)]
    sdk_port: u16,

    /// Run without an orchestrator
    #[arg(long)]
    local: bool,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            health_interval: Duration::from_secs(args.health_interval),
            sdk_port: args.sdk_port,
            local: args.local,
            max_players: MAX_PLAYERS,
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let transport = UdpTransport::bind(&config.bind_addr()).await?;

    let signal: Arc<dyn LivenessSignal> = if config.local {
        info!("Running without orchestrator");
        Arc::new(LocalLiveness)
    } else {
        Arc::new(SdkLiveness::new(config.sdk_port)?)
    };

    let session = Session::new(
        transport,
        signal,
        PlayerRegistry::new(config.max_players),
        config.health_interval,
    );
    session.run().await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());

    if let Err(e) = run(config).await {
        error!("Could not run server. Err: {}", e);
        std::process::exit(1);
    }

    info!("Server stopped");
}
