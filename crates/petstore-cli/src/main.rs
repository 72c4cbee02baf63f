//! Pet store CLI
//!
//! Command-line entry point: migrates the SQLite schema, saves the demo
//! graph in one cascade and prints what is stored.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use petstore_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogProfile {
    Development,
    Production,
}

impl From<LogProfile> for Profile {
    fn from(value: LogProfile) -> Self {
        match value {
            LogProfile::Development => Profile::Development,
            LogProfile::Production => Profile::Production,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "petstore")]
#[command(about = "Pet store graph persistence demo", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "PETSTORE_DB", default_value = ".petstore/store.db")]
    db: PathBuf,

    /// Log output format
    #[arg(long, global = true, env = "PETSTORE_LOG", value_enum, default_value_t = LogProfile::Development)]
    log: LogProfile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Build the sample graph and save every store in one transaction
    Demo,
    /// Load the stored graph and print it
    Show(commands::show::ShowArgs),
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log.into());

    let result = match cli.command {
        Commands::Migrate => commands::migrate::execute(&cli.db),
        Commands::Demo => commands::demo::execute(&cli.db),
        Commands::Show(args) => commands::show::execute(&cli.db, args),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
