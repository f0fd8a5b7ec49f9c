// Allow dead code for functions that are part of the API surface but not
// used in all code paths
#![allow(dead_code)]

mod cli;
mod config;
mod dns;
mod domain_utils;
mod export;
mod incident;
mod pipeline;
mod providers;
mod rate_limit;
mod region;
mod watermark;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{ApiCredentials, AppConfig, ConfigError, CONFIG_PATH};
use crate::pipeline::Orchestrator;
use crate::watermark::WatermarkStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        std::process::exit(2);
    }

    // RUST_LOG wins over the -v flags when set
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_directive())),
        )
        .init();

    // Credentials may live in a .env file next to the binary
    if dotenv::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }

    if cli.init {
        let path = AppConfig::create_default_config()
            .context("Failed to write the default configuration file")?;
        println!("Created default configuration at {}", path.display());
        println!("Set HIBP_API_KEY and APOLLO_API_KEY in the environment before running.");
        return Ok(());
    }

    let config_path = cli.config.as_deref().unwrap_or(CONFIG_PATH);
    let mut config = match AppConfig::load_from_path(Path::new(config_path)) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(path)) => {
            eprintln!("Error: configuration file not found at {}", path.display());
            eprintln!("   Run with --init to create a default configuration file.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(workers) = cli.workers {
        config.pipeline.max_workers = workers;
    }
    if let Some(output) = &cli.output {
        config.output.directory = output.clone();
    }

    let credentials = match ApiCredentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let watermark_store = WatermarkStore::new(&config.output.watermark_file);
    let watermark = watermark_store.load()?;
    match watermark {
        Some(date) => info!("Processing incidents newer than {}", date),
        None => info!("No watermark found, processing the full recent window"),
    }

    let output_dir = PathBuf::from(&config.output.directory);
    let orchestrator = Orchestrator::new(config, &credentials)?;

    let report = match orchestrator.run(watermark).await {
        Ok(report) => report,
        Err(e) => {
            error!("Pipeline run failed: {:#}", e);
            eprintln!("Error: pipeline run failed: {:#}", e);
            std::process::exit(1);
        }
    };

    export::print_run_summary(&report);

    if cli.dry_run {
        info!("Dry run: skipping export and watermark update");
        return Ok(());
    }

    let stamp = report.run_date.format("%Y-%m").to_string();
    let csv_path = output_dir.join(format!("breachscout_{}.csv", stamp));
    export::export_csv(&report.records, &csv_path)?;
    println!("Report written to {}", csv_path.display());

    if cli.json {
        let json_path = output_dir.join(format!("breachscout_{}.json", stamp));
        export::export_json(&report, &json_path)?;
        println!("JSON report written to {}", json_path.display());
    }

    if cli.no_watermark {
        warn!("--no-watermark set: the next run will reprocess this window");
    } else {
        watermark_store.save(report.run_date)?;
    }

    Ok(())
}
