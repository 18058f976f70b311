//! chorale - melody harmonization and performance scoring over HTTP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use choraleconf::ChoraleConfig;

use chorale_server::{serve, telemetry};

#[derive(Parser)]
#[command(name = "chorale")]
#[command(about = "Harmonize melodies into MIDI and score performances")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./chorale.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port to bind (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// OTLP gRPC endpoint for OpenTelemetry (e.g., "localhost:4317")
    #[arg(long)]
    otlp_endpoint: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = ChoraleConfig::load_with_sources_from(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.bind.http_port = port;
    }
    if let Some(host) = cli.host {
        config.bind.host = host;
    }
    if let Some(endpoint) = cli.otlp_endpoint {
        config.telemetry.otlp_endpoint = Some(endpoint);
    }

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    telemetry::init(
        &config.telemetry.log_level,
        config.telemetry.otlp_endpoint.as_deref(),
    )?;

    for file in &sources.files {
        tracing::info!(path = %file.display(), "loaded config file");
    }
    if !sources.env_overrides.is_empty() {
        tracing::info!(vars = ?sources.env_overrides, "applied environment overrides");
    }

    serve::run(config).await
}
