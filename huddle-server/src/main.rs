use anyhow::{Context, Result};
use clap::Parser;
use huddle_logging::LogFormat;
use huddle_server::{HuddleServer, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "huddle-server")]
#[command(about = "OAuth2 authorization server for Huddle chat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(long, short, env = "HUDDLE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(long, env = "HUDDLE_BIND")]
    bind: Option<SocketAddr>,

    /// Log filter directive, e.g. `info` or `huddle_auth=debug`
    #[arg(long, env = "HUDDLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty, compact)
    #[arg(long, env = "HUDDLE_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    config
        .logging
        .initialize()
        .context("Failed to initialize logging")?;

    if config.users.is_empty() {
        tracing::warn!("No users configured; every authorization request will be rejected");
    }

    let server = HuddleServer::new(config).context("Failed to build authorization server")?;
    server.run().await.context("Server terminated with an error")?;
    Ok(())
}
