use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tourbook_service::seed;

use crate::utils;

#[derive(Subcommand)]
pub enum SeedCommands {
    /// Validate seed files against the resource schemas
    Check {
        /// Directory holding tours.json, users.json, reviews.json and bookings.json
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

pub async fn execute(command: SeedCommands) -> Result<()> {
    match command {
        SeedCommands::Check { dir } => check(dir).await,
    }
}

async fn check(dir: PathBuf) -> Result<()> {
    let report = seed::check_dir(&dir)
        .await
        .with_context(|| format!("Seed data in {} is invalid", dir.display()))?;

    utils::section(&format!("Seed data in {}", dir.display()));
    for (kind, count) in &report.imported {
        println!("  {:<10} {}", kind.to_string().bold(), count);
    }
    for kind in &report.skipped {
        utils::warning(&format!("no {} found", kind.seed_file()));
    }
    utils::success(&format!("{} valid", report));
    Ok(())
}
