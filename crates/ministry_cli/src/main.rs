//! Operator CLI for the ministry core.
//!
//! # Responsibility
//! - Verify core linkage (`ping`).
//! - Run administrative jobs (`rebuild-hierarchy`) and read-only lookups
//!   (`highest-role`) against the configured database.

use clap::{Parser, Subcommand};
use log::error;
use ministry_core::{
    init_logging, open_db, CoreConfig, FallbackDirectory, HttpMemberDirectory, MinistryService,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ministry", about = "Ministry hierarchy and membership tools", version)]
struct Cli {
    /// Path to ministry.toml; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print core linkage and version
    Ping,

    /// Recompute the whole ministry closure table
    RebuildHierarchy,

    /// Resolve a member's most senior active role
    HighestRole {
        /// Member id issued by the member directory
        member_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Commands::Ping = cli.command {
        println!("ministry_core ping={}", ministry_core::ping());
        println!("ministry_core version={}", ministry_core::core_version());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => CoreConfig::load(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };
    if let Some(log_dir) = &config.log_dir {
        let level = config
            .log_level
            .as_deref()
            .unwrap_or(ministry_core::default_log_level());
        init_logging(level, log_dir).map_err(|err| err.to_string())?;
    }

    let name = command_name(&cli.command);
    execute(cli.command, &config).map_err(|message| {
        // Only reached once the logger had its chance to start.
        error!("event=cli_exit module=cli status=error command={name}");
        message
    })
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Ping => "ping",
        Commands::RebuildHierarchy => "rebuild-hierarchy",
        Commands::HighestRole { .. } => "highest-role",
    }
}

fn execute(command: Commands, config: &CoreConfig) -> Result<(), String> {
    let ranking = config.role_ranking().map_err(|err| err.to_string())?;
    let directory =
        HttpMemberDirectory::new(&config.directory.base_url, config.directory.timeout())
            .map_err(|err| err.to_string())?;
    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let service = MinistryService::try_new(&conn, FallbackDirectory::new(directory), ranking)
        .map_err(|err| err.to_string())?;

    match command {
        Commands::Ping => Ok(()),
        Commands::RebuildHierarchy => {
            let edges = service
                .rebuild_full_hierarchy()
                .map_err(|err| err.to_string())?;
            println!("rebuilt closure table: {edges} edges");
            Ok(())
        }
        Commands::HighestRole { member_id, json } => {
            let resolved = service
                .highest_role_for_member(&member_id)
                .map_err(|err| err.to_string())?;
            if json {
                let text = serde_json::to_string_pretty(&resolved).map_err(|err| err.to_string())?;
                println!("{text}");
                return Ok(());
            }
            match resolved {
                Some(role) => println!(
                    "{} {} in {}",
                    role.member_id,
                    role.role,
                    role.ministry_name
                        .unwrap_or_else(|| role.ministry_id.to_string())
                ),
                None => println!("{member_id}: no active membership"),
            }
            Ok(())
        }
    }
}
