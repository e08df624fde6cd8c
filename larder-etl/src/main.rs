//! larder-etl - recipe pipeline command-line entry point
//!
//! Subcommands:
//! - `run`: execute one extract → transform → load run
//! - `status`: show the most recent run
//! - `history`: list recent runs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use larder_common::config::{load_toml_config_or_default, RootFolderInitializer, RootFolderResolver};
use larder_etl::config::{resolve_spoonacular_api_key, PipelineSettings};
use larder_etl::models::EtlRun;
use larder_etl::quality::QualityPolicy;
use larder_etl::Orchestrator;

/// Command-line arguments for larder-etl
#[derive(Parser, Debug)]
#[command(name = "larder-etl")]
#[command(about = "Recipe ETL pipeline with incremental warehouse loads")]
#[command(version)]
struct Args {
    /// Root folder holding the database and data directory
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config location)
    #[arg(short, long, global = true, env = "LARDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once
    Run {
        /// Ignore the raw cache and query every source again
        #[arg(long)]
        refresh: bool,

        /// Log quality gate failures instead of failing the run
        #[arg(long)]
        no_validate: bool,
    },
    /// Show the most recent run
    Status,
    /// List recent runs, newest first
    History {
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_toml_config_or_default(args.config.as_deref());

    let default_filter = format!(
        "larder_etl={level},larder_common={level}",
        level = toml_config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting larder-etl {}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new("larder-etl")
        .with_cli_arg(args.root_folder.clone())
        .with_config_path(args.config.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = larder_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let mut settings = PipelineSettings::from_table(&toml_config.pipeline)?;
    let policy = QualityPolicy::from_table(&toml_config.quality)?;

    if let Command::Run {
        refresh,
        no_validate,
    } = &args.command
    {
        settings.refresh |= *refresh;
        settings.validate_quality &= !*no_validate;
    }

    let orchestrator = Orchestrator::from_settings(
        db,
        &initializer.data_dir(),
        &settings,
        policy,
        resolve_spoonacular_api_key(&toml_config),
    )?;

    match args.command {
        Command::Run { .. } => {
            let summary = orchestrator.run_pipeline().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Status => match orchestrator.get_latest_run_status().await? {
            Some(run) => println!("{}", serde_json::to_string_pretty(&run)?),
            None => println!("No runs recorded yet"),
        },
        Command::History { limit } => {
            let runs = orchestrator.tracker().list_runs(limit).await?;
            for run in &runs {
                println!("{}", history_line(run));
            }
        }
    }

    Ok(())
}

fn history_line(run: &EtlRun) -> String {
    let loaded = run
        .loaded_record_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{}  {:<9}  {}  loaded={}",
        run.run_id,
        run.status,
        run.run_started_at.format("%Y-%m-%d %H:%M:%S"),
        loaded
    );
    if let Some(error) = &run.error_message {
        line.push_str(&format!("  error={}", error));
    }
    line
}
