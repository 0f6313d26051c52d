//! Maboroshi Mock Server - CLI Entry Point
//!
//! Loads a configuration and dispatches requests read from stdin, one per
//! line: `METHOD /path?query [Name: value ...]`.

use anyhow::Result;
use clap::Parser;
use maboroshi_mock_server::{MockHandler, MockRequest, MockServerAgent, MockServerConfig};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "maboroshi-mock-server",
    about = "HTTP mock server core - route templates, matching rules and templated stub responses",
    version
)]
struct Args {
    /// Path to configuration file (.json, .yaml or .yml)
    #[arg(short, long, default_value = "mock-server.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout only carries responses
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        let default_config = include_str!("../demos/default-config.json");
        println!("{}", default_config);
        return Ok(());
    }

    let config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        MockServerConfig::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration (no routes)");
        MockServerConfig::default()
    };

    if args.validate {
        config.validate()?;
        println!(
            "Configuration is valid ({} environments, {} active routes)",
            config.environments.len(),
            config.active_routes().len()
        );
        return Ok(());
    }

    let agent = MockServerAgent::new(config);
    info!(routes = agent.route_count(), "Reading requests from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let request = match MockRequest::parse_line(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Skipping malformed request line");
                continue;
            }
        };

        let response = agent.handle(&request).await;
        let mut out = format!("HTTP {}\n", response.status);
        for (name, value) in &response.headers {
            out.push_str(&format!("{}: {}\n", name, value));
        }
        out.push('\n');
        out.push_str(&response.body);
        out.push_str("\n\n");

        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!(
        total = agent.total_requests(),
        matched = agent.total_matched(),
        unmatched = agent.total_unmatched(),
        "Done"
    );
    Ok(())
}
