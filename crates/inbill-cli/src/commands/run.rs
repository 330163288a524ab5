//! Run command - process recent inbox messages into storage and the ledger.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use inbill_core::models::config::InbillConfig;
use inbill_core::models::rules::RuleSet;
use inbill_core::pipeline::{Pipeline, PipelineOptions, ProcessedSet, RunSummary};

use crate::clients::{CsvLedger, EmlInbox, LocalStorage};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Window of inbox messages to scan, in hours (default: from config)
    #[arg(long)]
    hours: Option<u64>,

    /// Keep running, polling the inbox at a fixed interval
    #[arg(short, long)]
    watch: bool,

    /// Minutes between polls in watch mode (default: from config)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Append run counters to a summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    let mut rules = RuleSet::from_file(&config.paths.rules_file)?;
    if rules.is_empty() {
        anyhow::bail!("No partner rules in {}", config.paths.rules_file.display());
    }
    // A rule with a broken pattern is disabled for this run; the rest keep
    // working.
    rules.rules.retain(|rule| match rule.validate_patterns() {
        Ok(()) => true,
        Err(e) => {
            warn!("Rule '{}' disabled: {}", rule.name, e);
            false
        }
    });
    if rules.is_empty() {
        anyhow::bail!(
            "All rules in {} failed pattern validation",
            config.paths.rules_file.display()
        );
    }
    println!(
        "{} Loaded {} rules from {}",
        style("ℹ").blue(),
        rules.len(),
        config.paths.rules_file.display()
    );

    let mut inbox = EmlInbox::new(config.paths.inbox_dir.clone());
    let mut storage = LocalStorage::new();
    let mut ledger = CsvLedger::new(config.paths.ledger_file.clone());
    let mut processed = ProcessedSet::load(&config.paths.state_file);
    if !processed.is_empty() {
        info!("{} messages already handled in earlier runs", processed.len());
    }

    let first_window = args
        .hours
        .unwrap_or(config.processing.initial_window_hours as u64);

    if !args.watch {
        let summary = run_once(
            &config,
            &rules,
            &mut inbox,
            &mut storage,
            &mut ledger,
            &mut processed,
            first_window,
        )?;
        if let Some(path) = &args.summary {
            append_summary(path, &summary)?;
        }
        return Ok(());
    }

    let interval_minutes = args
        .interval
        .unwrap_or(config.processing.watch_interval_minutes as u64);
    println!(
        "{} Watching the inbox every {} minutes, Ctrl-C to stop",
        style("ℹ").blue(),
        interval_minutes
    );

    let mut window = first_window;
    loop {
        match run_once(
            &config,
            &rules,
            &mut inbox,
            &mut storage,
            &mut ledger,
            &mut processed,
            window,
        ) {
            Ok(summary) => {
                if let Some(path) = &args.summary {
                    append_summary(path, &summary)?;
                }
            }
            Err(e) => warn!("Run failed, retrying next interval: {}", e),
        }
        // After the first pass only the short poll window is needed.
        window = config.processing.poll_window_hours as u64;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval_minutes * 60)) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("{} Stopped", style("ℹ").blue());
                return Ok(());
            }
        }
    }
}

fn run_once(
    config: &InbillConfig,
    rules: &RuleSet,
    inbox: &mut EmlInbox,
    storage: &mut LocalStorage,
    ledger: &mut CsvLedger,
    processed: &mut ProcessedSet,
    window_hours: u64,
) -> anyhow::Result<RunSummary> {
    let start = Instant::now();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(format!("Scanning messages from the last {}h...", window_hours));
    pb.enable_steady_tick(Duration::from_millis(120));

    let summary = {
        let mut pipeline = Pipeline::new(
            rules,
            PipelineOptions::from_config(config),
            inbox,
            storage,
            ledger,
            processed,
        );
        pipeline.run_window(window_hours)?
    };
    pb.finish_and_clear();

    processed.save(&config.paths.state_file)?;

    println!();
    println!(
        "{} Scanned {} messages in {:?}",
        style("✓").green(),
        summary.scanned,
        start.elapsed()
    );
    println!(
        "   {} booked, {} excluded, {} unmatched, {} failed, {} skipped",
        style(summary.booked()).green(),
        summary.excluded,
        summary.unmatched,
        style(summary.failed).red(),
        summary.skipped
    );
    if summary.degraded > 0 {
        println!(
            "   {}",
            style(format!(
                "{} booked with fallback fields, check the ledger",
                summary.degraded
            ))
            .yellow()
        );
    }
    if summary.failed > 0 {
        println!(
            "   {}",
            style("Failed messages stay queued for the next run.").yellow()
        );
    }

    Ok(summary)
}

fn append_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let new_file = !path.exists();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let mut wtr = csv::Writer::from_writer(file);

    if new_file {
        wtr.write_record([
            "timestamp",
            "scanned",
            "processed",
            "degraded",
            "excluded",
            "unmatched",
            "failed",
            "skipped",
        ])?;
    }
    wtr.write_record([
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        summary.scanned.to_string(),
        summary.processed.to_string(),
        summary.degraded.to_string(),
        summary.excluded.to_string(),
        summary.unmatched.to_string(),
        summary.failed.to_string(),
        summary.skipped.to_string(),
    ])?;
    wtr.flush()?;

    println!(
        "{} Summary appended to {}",
        style("✓").green(),
        path.display()
    );
    Ok(())
}
