//! Config command - inspect and edit the application configuration.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use inbill_core::models::config::InbillConfig;

use super::default_config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show,

    /// Write a fresh configuration file with default values
    Init(InitArgs),

    /// Print one value by dotted key path
    Get {
        /// Key path, e.g. "paths.inbox_dir" or "retry.max_attempts"
        key: String,
    },

    /// Change one value and write the file back
    Set {
        /// Key path, e.g. "processing.poll_window_hours"
        key: String,

        /// New value; parsed as JSON, kept as a string otherwise
        value: String,
    },

    /// Print which file the config commands operate on
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Where to write the file (default: the path `config path` shows)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Replace an existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show(config_path),
        ConfigCommand::Init(init) => init_file(init, config_path),
        ConfigCommand::Get { key } => get_value(&key, config_path),
        ConfigCommand::Set { key, value } => set_value(&key, &value, config_path),
        ConfigCommand::Path => show_path(config_path),
    }
}

/// The file the subcommands operate on: the global `--config` argument when
/// given, otherwise the per-user default location.
fn target_path(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

fn show(config_path: Option<&str>) -> anyhow::Result<()> {
    if config_path.is_none() && !default_config_path().exists() {
        println!(
            "{} No config file yet, printing the built-in defaults.",
            style("ℹ").blue()
        );
    }
    let config = super::load_config(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_file(args: InitArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = args.output.unwrap_or_else(|| target_path(config_path));
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists, pass --force to replace it", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    InbillConfig::default().save(&path)?;
    println!(
        "{} Wrote default configuration to {}",
        style("✓").green(),
        path.display()
    );
    Ok(())
}

fn get_value(key: &str, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let tree = serde_json::to_value(&config)?;
    let value =
        lookup(&tree, key).ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn set_value(key: &str, value: &str, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = target_path(config_path);
    // Read without validating so a bad value can be corrected here.
    let current = if path.exists() {
        InbillConfig::from_file(&path)?
    } else {
        InbillConfig::default()
    };

    let parsed: serde_json::Value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    // Only keys that already exist in the tree are settable; everything else
    // would be silently dropped on the next load.
    let mut tree = serde_json::to_value(&current)?;
    let slot = lookup_mut(&mut tree, key)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
    *slot = parsed.clone();

    let updated: InbillConfig = serde_json::from_value(tree)
        .map_err(|e| anyhow::anyhow!("{} does not accept {}: {}", key, parsed, e))?;
    updated.validate()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    updated.save(&path)?;
    println!(
        "{} {} = {} in {}",
        style("✓").green(),
        key,
        parsed,
        path.display()
    );
    Ok(())
}

fn show_path(config_path: Option<&str>) -> anyhow::Result<()> {
    let path = target_path(config_path);
    let status = if path.exists() {
        style("exists").green()
    } else {
        style("not created yet").yellow()
    };
    println!("{} ({})", path.display(), status);
    Ok(())
}

/// Walk a dotted key path through the JSON tree.
fn lookup<'t>(tree: &'t serde_json::Value, key: &str) -> Option<&'t serde_json::Value> {
    key.split('.').try_fold(tree, |node, part| node.get(part))
}

fn lookup_mut<'t>(
    tree: &'t mut serde_json::Value,
    key: &str,
) -> Option<&'t mut serde_json::Value> {
    key.split('.').try_fold(tree, |node, part| node.get_mut(part))
}
