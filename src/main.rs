use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use shopfront::config::load_config;
use shopfront::{telemetry, HostKind, Shutdown, WebHost};

#[derive(Debug, Parser)]
#[command(name = "shopfront", version, about = "E-commerce front-end web hosts")]
struct Args {
    /// Which host flavor to run.
    #[arg(long, value_enum, default_value = "mvc")]
    host: HostKind,

    /// Optional TOML settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref(), args.host)?;
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    telemetry::init(&config)?;

    tracing::info!(
        service = config.host.service_name(),
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.bind_address,
        "starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = shopfront::observability::init_metrics(addr) {
                    tracing::error!(error = %e, "metrics exporter failed to start");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.bind_address).await?;
    let host = WebHost::new(config)?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    shutdown.trigger_on_interrupt();

    host.run(listener, receiver).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
