//! Write a default configuration file.

use std::path::PathBuf;

use storyreel_common::config::RenderConfig;

pub fn run(config_path: PathBuf, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = RenderConfig::default();
    config.save(&config_path)?;
    println!("Wrote default configuration to {}", config_path.display());
    Ok(())
}
