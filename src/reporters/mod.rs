//! Output reporters for scan reports
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::models::ScanReport;
use crate::store::{CumulativeProfile, Trend};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// A contact's profile together with its trend
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView<'a> {
    #[serde(flatten)]
    pub profile: &'a CumulativeProfile,
    pub trend: Option<&'a Trend>,
}

/// Render a single report in full
pub fn render_report(report: &ScanReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render_report(report),
        OutputFormat::Json => json::render(report),
    }
}

/// Render a list of reports, one summary line each in text mode
pub fn render_reports(reports: &[ScanReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render_report_list(reports),
        OutputFormat::Json => json::render(reports),
    }
}

pub fn render_profile(
    profile: &CumulativeProfile,
    trend: Option<&Trend>,
    format: OutputFormat,
) -> Result<String> {
    let view = ProfileView { profile, trend };
    match format {
        OutputFormat::Text => text::render_profile(&view),
        OutputFormat::Json => json::render(&view),
    }
}
