//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }

        ConfigAction::Init => {
            let config_path = Settings::default_config_path();
            if init_config(&config_path)? {
                Output::success(&format!("Created config file: {}", config_path.display()));
            } else {
                Output::warning(&format!("Config file already exists: {}", config_path.display()));
            }
        }
    }

    Ok(())
}

/// Write a default config file unless one exists. Returns whether it wrote.
///
/// Command-line and environment overrides are never persisted.
fn init_config(path: &PathBuf) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    Settings::default().save_to(path)?;
    Ok(true)
}
