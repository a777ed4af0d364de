//! `license-cache` — keep a diffable cache of dependency license data and check it.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and set up logging.
//! 2. Load the configuration and resolve applications ([`config`]).
//! 3. Pair each application with the built-in adapters ([`sources`]).
//! 4. Run the command ([`commands`]): `status`, `cache` or `list`.
//! 5. Render the requested report ([`report`]).
//! 6. Exit `0`, or `1` when status found problems or caching failed.

mod cache;
mod cli;
mod commands;
mod config;
mod error;
mod license;
mod models;
mod policy;
mod registry;
mod report;
mod sources;

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Command, ReportFormat};
use commands::cache::CacheOptions;
use commands::AppContext;
use config::load_config;

fn setup_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if quiet => EnvFilter::new("error"),
        Err(_) => match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        },
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(formatter)
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet)?;

    // Resolve project path
    let path = cli.command.path();
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let config = load_config(&path, cli.config.as_deref())?;
    let contexts = AppContext::for_apps(config.apps(&path)?);

    let success = match cli.command {
        Command::Status(_) => {
            let report = commands::status::run(contexts).await?;
            match cli.report {
                ReportFormat::Terminal => report::terminal::render_status(&report, cli.quiet),
                ReportFormat::Json => report::print_json(&json!({
                    "success": report.success(),
                    "apps": report.apps,
                }))?,
            }
            report.success()
        }
        Command::Cache { force, online, .. } => {
            let options = CacheOptions {
                force,
                online,
                progress: !cli.quiet && std::io::stderr().is_terminal(),
            };
            let report = commands::cache::run(contexts, options).await?;
            match cli.report {
                ReportFormat::Terminal => report::terminal::render_cache(&report, cli.quiet),
                ReportFormat::Json => report::print_json(&json!({
                    "success": report.success(),
                    "apps": report.apps,
                }))?,
            }
            report.success()
        }
        Command::List(_) => {
            let listings = commands::list::run(contexts).await?;
            match cli.report {
                ReportFormat::Terminal => report::terminal::render_list(&listings, cli.quiet),
                ReportFormat::Json => report::print_json(&listings)?,
            }
            listings.iter().all(|l| l.source_errors.is_empty())
        }
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}
