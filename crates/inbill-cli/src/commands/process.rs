//! Process command - book a single invoice file with operator confirmation.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::{Local, NaiveDate, Utc};
use clap::Args;
use console::style;
use rust_decimal::Decimal;
use tracing::{debug, info};

use inbill_core::classify::classify;
use inbill_core::extract::extract;
use inbill_core::ledger::build_row;
use inbill_core::models::invoice::{Amount, FieldOverrides, FieldProposal, propose_fields};
use inbill_core::models::message::CandidateMessage;
use inbill_core::models::rules::{PartnerRule, RuleSet};
use inbill_core::naming::compute_destination;
use inbill_core::pdf;
use inbill_core::pipeline::{Booking, Pipeline, PipelineOptions, ProcessedSet};

use crate::clients::{CsvLedger, EmlInbox, LocalStorage};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Partner rule to apply, skipping classification
    #[arg(short, long)]
    partner: Option<String>,

    /// Accept all proposed fields without prompting
    #[arg(short, long)]
    yes: bool,

    /// Show what would be booked without writing anything
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "pdf" {
        anyhow::bail!("Unsupported file format: {} (expected a PDF invoice)", extension);
    }
    let file_name = args
        .input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice.pdf")
        .to_string();

    let rules = RuleSet::from_file(&config.paths.rules_file)?;

    info!("Processing file: {}", args.input.display());
    let bytes = fs::read(&args.input)?;
    let text = pdf::extract_text(&bytes, config.max_pdf_size_bytes())?;
    debug!("Extracted {} characters of text", text.len());

    let rule = resolve_rule(&args, &rules, &file_name, &text)?;
    println!(
        "{} Using rule '{}' ({})",
        style("ℹ").blue(),
        rule.name,
        rule.description
    );

    let invoice = extract(rule, &text, &file_name, Local::now().date_naive())?;
    let proposal = propose_fields(&invoice);
    print_proposal(&proposal);

    let overrides = if args.yes {
        FieldOverrides::default()
    } else {
        collect_overrides(&proposal)?
    };
    let confirmed = proposal.apply(&overrides, &file_name);

    let (dest_name, dest_dir) = compute_destination(rule, &confirmed, &config.paths.storage_root);

    if args.dry_run {
        let row = build_row(
            rule,
            &confirmed,
            &dest_dir.join(&dest_name).display().to_string(),
            true,
        );
        println!();
        println!("{} Dry run, nothing written", style("ℹ").blue());
        println!("   Would copy to {}", dest_dir.join(&dest_name).display());
        println!("   Would append: {}", row.cells().join(" | "));
        return Ok(());
    }

    let mut inbox = EmlInbox::new(config.paths.inbox_dir.clone());
    let mut storage = LocalStorage::new();
    let mut ledger = CsvLedger::new(config.paths.ledger_file.clone());
    let mut processed = ProcessedSet::default();

    let booking = {
        let mut pipeline = Pipeline::new(
            &rules,
            PipelineOptions::from_config(&config),
            &mut inbox,
            &mut storage,
            &mut ledger,
            &mut processed,
        );
        pipeline.book(rule, &confirmed, &bytes, true)?
    };

    match booking {
        Booking::Booked(path) => println!(
            "{} Booked {} -> {}",
            style("✓").green(),
            confirmed.invoice_number,
            path.display()
        ),
        Booking::Duplicate(existing) => println!(
            "{} Already booked ({}), nothing written",
            style("ℹ").blue(),
            existing
        ),
    }

    Ok(())
}

/// The rule named on the command line, or the classifier's pick.
fn resolve_rule<'r>(
    args: &ProcessArgs,
    rules: &'r RuleSet,
    file_name: &str,
    text: &str,
) -> anyhow::Result<&'r PartnerRule> {
    let known = || {
        rules
            .rules
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    if let Some(partner) = &args.partner {
        return rules
            .get(partner)
            .ok_or_else(|| anyhow::anyhow!("Unknown rule '{}'. Known rules: {}", partner, known()));
    }

    // The synthetic subject carries the filename and the first lines of the
    // document, so subject and attachment-prefix matchers apply; sender
    // matchers cannot.
    let head: String = text.chars().take(500).collect();
    let message = CandidateMessage::synthetic(file_name, &head, Utc::now());
    let classification = classify(&message, rules);
    let Some(name) = classification.rule.as_deref() else {
        anyhow::bail!(
            "No rule matched '{}'. Pass --partner to pick one of: {}",
            file_name,
            known()
        );
    };
    debug!(
        "Classified as '{}' with confidence {:.2}",
        name, classification.confidence
    );
    rules
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("Rule '{}' not found", name))
}

fn print_proposal(proposal: &FieldProposal) {
    let flag = |field: &str| {
        if proposal.low_confidence.iter().any(|f| f == field) {
            format!(" {}", style("(fallback)").yellow())
        } else {
            String::new()
        }
    };
    let amount = |value: Option<Amount>| match value {
        Some(a) => format!("{} {}", a.value, a.currency.as_str()),
        None => "-".to_string(),
    };

    println!();
    println!("Partner:        {}", proposal.partner);
    println!("Amount:         {}{}", amount(proposal.amount), flag("amount"));
    println!(
        "Amount EUR:     {}{}",
        proposal
            .amount_eur
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string()),
        flag("amount_eur")
    );
    println!("Due date:       {}{}", proposal.due_date, flag("due_date"));
    println!("Invoice date:   {}{}", proposal.invoice_date, flag("invoice_date"));
    println!("Invoice number: {}{}", proposal.invoice_number, flag("invoice_number"));
}

/// Walk the operator through each field. Enter accepts the proposed value.
fn collect_overrides(proposal: &FieldProposal) -> anyhow::Result<FieldOverrides> {
    println!();
    println!(
        "{} Press Enter to accept a value, type a replacement, or 'q' to cancel.",
        style("ℹ").blue()
    );

    let mut overrides = FieldOverrides::default();

    let current_amount = proposal
        .amount
        .map(|a| a.value.to_string())
        .unwrap_or_default();
    if let Some(answer) = prompt("Amount (HUF)", &current_amount)? {
        overrides.amount = Some(parse_decimal(&answer)?);
    }

    let current_eur = proposal
        .amount_eur
        .map(|v| v.to_string())
        .unwrap_or_default();
    if let Some(answer) = prompt("Amount (EUR)", &current_eur)? {
        overrides.amount_eur = Some(parse_decimal(&answer)?);
    }

    if let Some(answer) = prompt("Due date (YYYY-MM-DD)", &proposal.due_date.to_string())? {
        overrides.due_date = Some(parse_date(&answer)?);
    }
    if let Some(answer) = prompt("Invoice date (YYYY-MM-DD)", &proposal.invoice_date.to_string())? {
        overrides.invoice_date = Some(parse_date(&answer)?);
    }
    if let Some(answer) = prompt("Invoice number", &proposal.invoice_number)? {
        overrides.invoice_number = Some(answer);
    }

    Ok(overrides)
}

/// Ask one question; `None` means the proposed value was accepted.
fn prompt(label: &str, current: &str) -> anyhow::Result<Option<String>> {
    print!("{} [{}]: ", label, current);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();

    if line == "q" {
        anyhow::bail!("Cancelled by operator");
    }
    if line.is_empty() {
        Ok(None)
    } else {
        Ok(Some(line.to_string()))
    }
}

fn parse_decimal(input: &str) -> anyhow::Result<Decimal> {
    input
        .parse::<Decimal>()
        .map_err(|_| anyhow::anyhow!("'{}' is not a valid amount", input))
}

fn parse_date(input: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("'{}' is not a valid date (expected YYYY-MM-DD)", input))
}
