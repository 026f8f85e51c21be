//! Scan commands

use anyhow::{anyhow, bail, Context, Result};
use console::style;
use framescan::engine::{FrameEngine, ScanOutcome};
use framescan::models::{Domain, ScanTier};
use framescan::reporters::{render_report, OutputFormat};
use std::io::Read;

pub fn run_text(
    engine: &FrameEngine,
    domain: &str,
    contacts: Vec<String>,
    content: Option<String>,
    format: &str,
) -> Result<()> {
    let domain: Domain = domain.parse().map_err(|e: String| anyhow!(e))?;
    let content = read_content(content)?;
    let outcome = engine.run_text_scan(domain, &content, contacts);
    finish(outcome, format)
}

pub fn run_image(
    engine: &FrameEngine,
    domain: &str,
    contacts: Vec<String>,
    image_ref: &str,
    tier: &str,
    format: &str,
) -> Result<()> {
    let domain: Domain = domain.parse().map_err(|e: String| anyhow!(e))?;
    let tier: ScanTier = tier.parse().map_err(|e: String| anyhow!(e))?;

    eprintln!(
        "{} {} scan costs {} credit(s), {} available",
        style("›").dim(),
        tier,
        engine.cost_for(tier),
        engine.available_credits()
    );
    let outcome = engine.run_tiered_image_scan(domain, image_ref, contacts, tier);
    finish(outcome, format)
}

pub fn run_quick(
    engine: &FrameEngine,
    contacts: Vec<String>,
    content: Option<String>,
    format: &str,
) -> Result<()> {
    let content = read_content(content)?;
    let outcome = engine.run_quick_text_scan(&content, contacts);
    finish(outcome, format)
}

/// Content argument, or stdin when absent or "-"
fn read_content(content: Option<String>) -> Result<String> {
    match content {
        Some(text) if text != "-" => Ok(text),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read content from stdin")?;
            Ok(buf)
        }
    }
}

fn finish(outcome: ScanOutcome, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;

    if let Some(report) = outcome.report() {
        print!("{}", render_report(report, format)?);
    }
    for advisory in &outcome.advisories {
        eprintln!("{} {}", style("!").yellow().bold(), advisory.message());
    }
    if let Some(e) = outcome.error() {
        bail!("{}", e);
    }
    Ok(())
}
