//! tabload - load delimited files into PostgreSQL

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tabload::{DbConfig, Manifest, TableLoader};
use tabload_common::logging::{init_logging, LogConfig, LogLevel};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tabload")]
#[command(author, version, about = "Load delimited files into PostgreSQL tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every table listed in a manifest
    Load {
        /// Run manifest (YAML)
        manifest: PathBuf,

        /// Connection URL; overrides the TABLOAD_DB_* variables
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },

    /// Print the CREATE TABLE statement for each manifest entry
    Plan {
        /// Run manifest (YAML)
        manifest: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(level)
        .log_file_prefix("tabload")
        .build();
    let log_config = log_config.clone().with_env_overrides().unwrap_or(log_config);

    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        },
    };

    match execute(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "Command failed");
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        },
    }
}

/// Returns whether every source succeeded.
async fn execute(command: Command) -> Result<bool> {
    match command {
        Command::Load {
            manifest,
            database_url,
        } => {
            let manifest = Manifest::load(&manifest)
                .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;

            let mut config = DbConfig::from_env()?;
            if database_url.is_some() {
                config.url = database_url;
            }

            let report = TableLoader::run_manifest(&config, &manifest).await?;
            for (table, e) in report.failed() {
                eprintln!("{}: {}", table, e);
            }
            Ok(report.is_success())
        },
        Command::Plan { manifest } => {
            let manifest = Manifest::load(&manifest)
                .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;

            let mut ok = true;
            for source in &manifest.tables {
                match TableLoader::plan(source) {
                    Ok(spec) => println!("{};", spec.create_table_sql()),
                    Err(e) => {
                        error!(table = %source.table, kind = e.kind(), error = %e, "Cannot plan table");
                        ok = false;
                    },
                }
            }

            info!(tables = manifest.tables.len(), "Plan complete");
            Ok(ok)
        },
    }
}
