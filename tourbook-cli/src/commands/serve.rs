use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tourbook_service::prelude::*;
use tourbook_service::seed;

use crate::utils;

#[derive(Args)]
pub struct ServeArgs {
    /// Configuration file (defaults to the usual search path)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Import seed data from this directory before serving
    #[arg(long, value_name = "DIR")]
    pub seed: Option<PathBuf>,

    /// Override the configured port
    #[arg(long, value_name = "N")]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = load_config(&args)?;
    init_tracing(&config)?;

    let state = AppState::new(config.clone());

    let seed_dir = args
        .seed
        .clone()
        .or_else(|| config.seed.as_ref().map(|seed| seed.dir.clone()));
    if let Some(dir) = seed_dir {
        let report = seed::import_dir(state.collections(), &dir)
            .await
            .with_context(|| format!("Failed to import seed data from {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), documents = report.total(), tours_rated = report.tours_rated, "seed data loaded");
        utils::success(&format!("Seeded {report}"));
    }

    utils::info(&format!(
        "Serving {} on {}{}",
        config.service.name,
        config.bind_address(),
        API_PREFIX
    ));
    let app = router(&state);
    Server::new(config).serve(app).await?;
    Ok(())
}

fn load_config(args: &ServeArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from(path).with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => Config::load().context("Failed to load config")?,
    };
    if let Some(port) = args.port {
        config.service.port = port;
    }
    Ok(config)
}
