//! Text (terminal) reporter with colors and formatting

use super::ProfileView;
use crate::models::ScanReport;
use crate::scoring::OverallFrame;
use crate::store::TrendDirection;
use anyhow::Result;

/// Frame colors (ANSI escape codes)
fn frame_color(frame: OverallFrame) -> &'static str {
    match frame {
        OverallFrame::Apex => "\x1b[32m",    // Green
        OverallFrame::Neutral => "\x1b[33m", // Yellow
        OverallFrame::Mixed => "\x1b[35m",   // Magenta
        OverallFrame::Slave => "\x1b[31m",   // Red
    }
}

/// Axis raw score colors
fn raw_color(raw: i32) -> &'static str {
    match raw {
        r if r >= 2 => "\x1b[32m",
        r if r <= -2 => "\x1b[31m",
        0 => "\x1b[90m",
        _ => "\x1b[33m",
    }
}

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Ten-cell bar for a raw score in [-3, +3]
fn bar(raw: i32) -> String {
    let filled = (((raw + 3) as f64 / 6.0) * 10.0).round().clamp(0.0, 10.0) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

/// Render one report in full
pub fn render_report(report: &ScanReport) -> Result<String> {
    let mut out = String::new();
    let score = &report.score;
    let color = frame_color(score.overall_frame);

    out.push_str(&format!("\n{BOLD}Frame Scan{RESET} {DIM}{}{RESET}\n", report.id));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Score: {color}{BOLD}{}/100{RESET}  Frame: {color}{BOLD}{}{RESET}\n",
        score.frame_score, score.overall_frame
    ));
    out.push_str(&format!(
        "Domain: {}{}  Modality: {}  Tier: {}\n",
        report.domain,
        if report.domain_inferred { " (guessed)" } else { "" },
        report.modality,
        report.tier
    ));
    out.push_str(&format!(
        "Contacts: {}  {DIM}{}{RESET}\n",
        report.subject_contact_ids.join(", "),
        report.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if !report.custom_domain_tags.is_empty() {
        let tags: Vec<&str> = report.custom_domain_tags.iter().map(String::as_str).collect();
        out.push_str(&format!("Tags: {}\n", tags.join(", ")));
    }

    out.push_str(&format!("\n{BOLD}Axes{RESET}\n"));
    for axis in &score.axis_scores {
        let defaulted = report.raw_result.defaulted_axes.contains(&axis.axis_id);
        out.push_str(&format!(
            "  {:<24} {}{}{RESET} {:+}{}\n",
            axis.axis_id.label(),
            raw_color(axis.score),
            bar(axis.score),
            axis.score,
            if defaulted {
                format!(" {DIM}(not judged){RESET}")
            } else {
                String::new()
            }
        ));
    }

    let raw = &report.raw_result;
    if let Some(summary) = &raw.summary {
        out.push_str(&format!("\n{BOLD}Summary{RESET}\n  {}\n", summary));
    }
    push_section(&mut out, "Notes", &score.notes);
    push_section(&mut out, "Evidence", &raw.supporting_evidence);
    push_section(&mut out, "Corrections", &raw.corrections);
    if !raw.patterns.is_empty() {
        out.push_str(&format!("\n{BOLD}Patterns{RESET} {}\n", raw.patterns.join(", ")));
    }

    Ok(out)
}

fn push_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{BOLD}{title}{RESET}\n"));
    for item in items {
        out.push_str(&format!("  • {}\n", item));
    }
}

/// One line per report
pub fn render_report_list(reports: &[ScanReport]) -> Result<String> {
    if reports.is_empty() {
        return Ok(format!("{DIM}No reports yet.{RESET}\n"));
    }

    let mut out = String::new();
    for report in reports {
        let frame = report.score.overall_frame;
        out.push_str(&format!(
            "{DIM}{}{RESET}  {}  {}{BOLD}{:>3}{RESET} {:<8} {:<15} {:<9} {}\n",
            report.created_at.format("%Y-%m-%d %H:%M"),
            report.id,
            frame_color(frame),
            report.frame_score(),
            frame,
            report.domain,
            report.tier,
            report.subject_contact_ids.join(",")
        ));
    }
    out.push_str(&format!("{DIM}{} report(s){RESET}\n", reports.len()));
    Ok(out)
}

pub fn render_profile(view: &ProfileView<'_>) -> Result<String> {
    let profile = view.profile;
    let mut out = String::new();

    out.push_str(&format!("\n{BOLD}Profile{RESET} {}\n", profile.contact_id));
    out.push_str(&format!(
        "Current score: {BOLD}{}{RESET}  Scans: {}\n",
        profile.current_frame_score, profile.scans_count
    ));
    match profile.last_scan_at {
        Some(at) => out.push_str(&format!("Last scan: {}\n", at.format("%Y-%m-%d %H:%M UTC"))),
        None => out.push_str(&format!("{DIM}Not scanned yet{RESET}\n")),
    }
    match view.trend {
        Some(trend) => {
            let (arrow, color) = match trend.direction {
                TrendDirection::Up => ("↑", "\x1b[32m"),
                TrendDirection::Down => ("↓", "\x1b[31m"),
                TrendDirection::Flat => ("→", "\x1b[90m"),
            };
            out.push_str(&format!(
                "Trend: {color}{arrow} {} {}{RESET}\n",
                trend.direction, trend.change_amount
            ));
        }
        None => out.push_str(&format!("{DIM}Trend needs at least two scans{RESET}\n")),
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;
    use crate::store::{CumulativeProfile, Trend};

    #[test]
    fn test_text_render_includes_axes_and_sections() {
        let report = test_report();
        let out = render_report(&report).expect("render text");
        assert!(out.contains("Frame Scan"));
        assert!(out.contains("Boundary control"));
        assert!(out.contains("Drop the closing apology"));
        assert!(out.contains("anchoring"));
        assert!(out.contains("Tags: q3"));
    }

    #[test]
    fn test_bar_extremes() {
        assert_eq!(bar(-3), "░".repeat(10));
        assert_eq!(bar(3), "█".repeat(10));
        assert_eq!(bar(0).chars().filter(|c| *c == '█').count(), 5);
    }

    #[test]
    fn test_empty_list() {
        let out = render_report_list(&[]).expect("render list");
        assert!(out.contains("No reports yet"));
    }

    #[test]
    fn test_profile_trend_line() {
        let profile = CumulativeProfile {
            contact_id: "alex".into(),
            current_frame_score: 80,
            scans_count: 3,
            last_scan_at: None,
        };
        let trend = Trend {
            direction: TrendDirection::Up,
            change_amount: 30,
        };
        let view = ProfileView {
            profile: &profile,
            trend: Some(&trend),
        };
        let out = render_profile(&view).expect("render profile");
        assert!(out.contains("up 30"));
        assert!(out.contains("Not scanned yet"));
    }
}
