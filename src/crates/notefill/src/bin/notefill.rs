//! notefill CLI - bulk LLM field filling for flashcard note exports.
//!
//! Main entry point for the notefill command-line tool.

use clap::{Parser, Subcommand};
use colored::Colorize;
use notefill::cli::{self, FieldsArgs, RunArgs};

#[derive(Parser)]
#[command(name = "notefill")]
#[command(about = "Bulk LLM field filling for flashcard note exports", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill fields for every row via a completion provider
    Run(RunArgs),

    /// List the fields present in a row file
    Fields(FieldsArgs),

    /// Show the built-in model price table
    Models,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => cli::run::handle_run(args).await,
        Commands::Fields(args) => cli::fields::handle_fields(&args),
        Commands::Models => {
            cli::models::handle_models();
            Ok(0)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
