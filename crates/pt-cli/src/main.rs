use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pt_cli::commands::{ingest, status, timeline};
use pt_cli::{Cli, Commands, Config};
use pt_core::TimelineService;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(pt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = pt_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open {}", config.database_path.display())
    })?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Ingest(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let service = TimelineService::new(&db);
            let tracked_guild = args.guild.or(config.guild_id);
            let summary = ingest::run(&service, io::stdin().lock(), tracked_guild)?;
            eprintln!(
                "Ingested {} presence snapshots ({} skipped)",
                summary.recorded, summary.skipped
            );
        }
        Some(Commands::Timeline(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let service = TimelineService::new(&db);
            let output = timeline::run(
                &service,
                args,
                config.guild_id,
                Utc::now().date_naive(),
            )?;
            print!("{output}");
            if args.json {
                println!();
            }
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut io::stdout().lock(), &db, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
