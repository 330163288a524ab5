//! Rules command - list and validate partner rules.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use inbill_core::models::rules::RuleSet;

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    /// Validate extraction patterns instead of listing
    #[arg(long)]
    validate: bool,

    /// Rule file to read (default: from config)
    #[arg(short, long)]
    file: Option<PathBuf>,
}

pub async fn run(args: RulesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let path = args.file.unwrap_or(config.paths.rules_file);

    let rules = RuleSet::from_file(&path)?;

    if args.validate {
        validate_rules(&rules)
    } else {
        list_rules(&rules, &path);
        Ok(())
    }
}

fn list_rules(rules: &RuleSet, path: &Path) {
    println!(
        "{}",
        style(format!("Partner rules in {}", path.display())).bold()
    );
    println!();

    for rule in &rules.rules {
        println!(
            "{} {}",
            style(format!("▸ {}", rule.name)).bold().cyan(),
            style(&rule.description).dim()
        );
        println!("    {:<12} {}", "senders:", matcher_line(&rule.sender_patterns));
        println!("    {:<12} {}", "subjects:", matcher_line(&rule.subject_patterns));
        if let Some(prefix) = &rule.attachment_prefix {
            println!("    {:<12} {}*", "attachment:", prefix);
        }
        println!(
            "    {:<12} {} amount, {} EUR, {} due-date",
            "patterns:",
            rule.amount_patterns.len(),
            rule.eur_amount_patterns.len(),
            rule.due_date_patterns.len()
        );
        println!(
            "    {:<12} {} (prefix {})",
            "files to:", rule.folder, rule.filename_prefix
        );
    }

    if !rules.exclusions.is_empty() {
        println!();
        println!("{}", style("Exclusions").bold());
        for exclusion in &rules.exclusions {
            let subject = exclusion
                .subject_pattern
                .as_deref()
                .map(|s| format!(" + subject '{}'", s))
                .unwrap_or_default();
            println!(
                "  {} {}{} {}",
                style("-").dim(),
                exclusion.sender_pattern,
                subject,
                style(&exclusion.reason).dim()
            );
        }
    }

    println!();
    println!(
        "{} {} rules, {} exclusions",
        style("ℹ").blue(),
        rules.len(),
        rules.exclusions.len()
    );
}

fn matcher_line(patterns: &[String]) -> String {
    if patterns.is_empty() {
        "-".to_string()
    } else {
        patterns.join(", ")
    }
}

fn validate_rules(rules: &RuleSet) -> anyhow::Result<()> {
    let mut invalid = 0;

    for rule in &rules.rules {
        match rule.validate_patterns() {
            Ok(()) => println!("{} {}", style("✓").green(), rule.name),
            Err(e) => {
                invalid += 1;
                println!("{} {}: {}", style("✗").red(), rule.name, e);
            }
        }
    }

    println!();
    if invalid > 0 {
        anyhow::bail!("{} of {} rules have invalid patterns", invalid, rules.len());
    }
    println!("{} All {} rules valid", style("✓").green(), rules.len());
    Ok(())
}
