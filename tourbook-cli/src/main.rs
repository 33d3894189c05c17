use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod utils;

use commands::plan::PlanArgs;
use commands::seed::SeedCommands;
use commands::serve::ServeArgs;

/// tourbook - tour-booking REST service
#[derive(Parser)]
#[command(name = "tourbook")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Print the query plan a list request would execute
    Plan(PlanArgs),
    /// Seed data commands
    Seed {
        #[command(subcommand)]
        command: SeedCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args).await,
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Seed { command } => commands::seed::execute(command).await,
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}
