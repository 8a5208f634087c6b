//! Build command implementation.

use anyhow::{Context, Result};
use pagesmith_core::{Config, Generator};
use std::path::Path;

/// Load the config and run the full pipeline
pub fn build_site(config_path: &Path) -> Result<()> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    let output = config.output_dir();

    let mut generator = Generator::new(config);
    let pages = generator.generate().context("Failed to build site")?;

    tracing::info!("Site built: {} pages in {:?}", pages.len(), output);
    Ok(())
}
