//! Show or write the effective configuration.

use weever_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, init: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    if init {
        config.save()?;
        println!("Configuration written to: {}", path.display());
        return Ok(());
    }

    let source = if path.exists() { "file" } else { "defaults" };
    println!("# {} ({source})", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
