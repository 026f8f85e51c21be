//! Report, profile and tag commands

use anyhow::{anyhow, Result};
use console::style;
use framescan::engine::FrameEngine;
use framescan::reporters::{render_profile, render_report, render_reports, OutputFormat};
use framescan::scoring::FrameScorer;

pub fn list(engine: &FrameEngine, contact: Option<&str>, limit: usize, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let mut reports = match contact {
        Some(id) => engine.reports_for_contact(id),
        None => engine.all_reports(),
    };
    if limit > 0 {
        reports.truncate(limit);
    }
    print!("{}", render_reports(&reports, format)?);
    Ok(())
}

pub fn show(engine: &FrameEngine, report_id: &str, explain: bool, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let report = engine
        .report_by_id(report_id)
        .ok_or_else(|| anyhow!("No report with id '{}'", report_id))?;

    print!("{}", render_report(&report, format)?);
    if explain && format == OutputFormat::Text {
        let scorer = FrameScorer::new(&engine.config().scoring);
        println!("\n{}", scorer.explain(&report.score));
    }
    Ok(())
}

pub fn profile(engine: &FrameEngine, contact_id: &str, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let profile = engine.profile_for_contact(contact_id);
    let trend = engine.trend_for_contact(contact_id);
    print!("{}", render_profile(&profile, trend.as_ref(), format)?);
    Ok(())
}

pub fn tag(engine: &FrameEngine, report_id: &str, tag: &str, remove: bool) -> Result<()> {
    let report = if remove {
        engine.untag_report(report_id, tag)?
    } else {
        engine.tag_report(report_id, tag)?
    };

    let tags: Vec<&str> = report.custom_domain_tags.iter().map(String::as_str).collect();
    println!(
        "{} {} tags: {}",
        style("✓").green(),
        style(&report.id).cyan(),
        if tags.is_empty() {
            "(none)".to_string()
        } else {
            tags.join(", ")
        }
    );
    Ok(())
}
