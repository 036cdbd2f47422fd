//! Init command - write an example config

use crate::config::Settings;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Run the init command
pub fn run(path: &Path) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }

    let (config_path, created) =
        Settings::init_project_config(path).context("Failed to write configuration")?;
    if created {
        println!(
            "{} Created {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        println!(
            "\nNext: {}",
            style("flowsentry scan <flows.json>").cyan()
        );
    } else {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
    }
    Ok(())
}
