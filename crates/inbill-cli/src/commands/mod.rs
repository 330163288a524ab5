//! Command implementations.

use std::path::PathBuf;

use inbill_core::models::config::InbillConfig;

pub mod config;
pub mod process;
pub mod rules;
pub mod run;

/// Default location of the configuration file.
pub(crate) fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inbill")
        .join("config.json")
}

/// Load configuration from an explicit path, the default location, or
/// built-in defaults when neither exists. A loaded file is validated so a
/// bad value fails the command here rather than mid-run.
pub(crate) fn load_config(config_path: Option<&str>) -> anyhow::Result<InbillConfig> {
    let path = match config_path {
        Some(path) => Some(PathBuf::from(path)),
        None => Some(default_config_path()).filter(|p| p.exists()),
    };
    let Some(path) = path else {
        return Ok(InbillConfig::default());
    };

    let config = InbillConfig::from_file(&path)?;
    config.validate()?;
    Ok(config)
}
