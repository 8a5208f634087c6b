//! Inspect the pages of the last build.

use anyhow::{Context, Result};
use pagesmith_core::snapshot::load_snapshot;
use pagesmith_core::Config;
use serde_json::json;
use std::path::Path;

pub fn list_pages(config_path: &Path, json: bool) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let output = config.output_dir();
    let pages = load_snapshot(&output)
        .context("Failed to read page snapshot")?
        .with_context(|| format!("No pages found in {:?}; run `pagesmith build` first", output))?;

    if json {
        let entries: Vec<_> = pages
            .iter()
            .map(|page| {
                json!({
                    "source": page.filename,
                    "route": page.route(),
                    "title": page.title(),
                    "output": page.dest_filename,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for page in &pages {
        let route = page.route().unwrap_or("-");
        match page.title() {
            Some(title) => println!("{route}  {title}"),
            None => println!("{route}"),
        }
    }
    Ok(())
}
