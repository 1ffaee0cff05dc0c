//! Client Stubs - CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use client_stubs::{ServiceModel, StubConfig, StubbedClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "client-stubs",
    about = "Resolve stubbed service responses from a service model and a stub configuration",
    version
)]
struct Args {
    /// Path to the service model
    #[arg(short, long, required_unless_present = "print_config")]
    model: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "stubs.yaml")]
    config: PathBuf,

    /// Operation to invoke (repeatable)
    #[arg(short, long = "operation")]
    operations: Vec<String>,

    /// Invocation params as JSON
    #[arg(short, long, default_value = "{}")]
    params: String,

    /// Number of times to invoke each operation
    #[arg(short, long, default_value_t = 1)]
    repeat: usize,

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

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        let default_config = include_str!("../demos/default-config.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    // clap enforces --model unless --print-config was given
    let model_path = args.model.as_deref().context("--model is required")?;
    info!(path = ?model_path, "Loading service model");
    let model = Arc::new(ServiceModel::from_file(model_path)?);

    // Load configuration
    let config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        StubConfig::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration (stubbing on, no stubs)");
        StubConfig {
            stub_responses: true,
            ..Default::default()
        }
    };
    config.validate_against(&model)?;

    // Validate and exit if requested
    if args.validate {
        let client = StubbedClient::new(Arc::clone(&model), &config)?;
        println!(
            "Configuration is valid ({} operations stubbed, protocol {})",
            config.stubs.len(),
            client.model().protocol()?
        );
        return Ok(());
    }

    let params: serde_json::Value = serde_json::from_str(&args.params)?;
    let client = StubbedClient::new(model, &config)?;

    for operation in &args.operations {
        for _ in 0..args.repeat {
            match client.send(operation, params.clone()).await {
                Ok(data) => println!("{}", serde_json::to_string_pretty(&data)?),
                Err(e) => println!("{}: error: {}", operation, e),
            }
        }
    }

    Ok(())
}
