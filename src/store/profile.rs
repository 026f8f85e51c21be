//! Cumulative profile and trend computation
//!
//! Both are derived on demand from a subject's report history and never
//! stored. Inputs are expected most recent first, the order
//! [`ReportStore::reports_for_subject`](super::ReportStore::reports_for_subject)
//! returns.

use crate::config::ProfileConfig;
use crate::models::ScanReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of a subject's scan history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeProfile {
    pub contact_id: String,
    /// Score of the most recent report, or the unscored default
    pub current_frame_score: u8,
    pub scans_count: usize,
    pub last_scan_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Flat => write!(f, "flat"),
        }
    }
}

/// Movement of the latest score against the recent baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub change_amount: u32,
}

/// Profile aggregator bound to a profile configuration
pub struct ProfileAggregator<'a> {
    config: &'a ProfileConfig,
}

impl<'a> ProfileAggregator<'a> {
    pub fn new(config: &'a ProfileConfig) -> Self {
        Self { config }
    }

    /// Latest score, count and last scan time for `contact_id`.
    ///
    /// Reports that do not concern the contact are ignored.
    pub fn profile(&self, contact_id: &str, reports: &[ScanReport]) -> CumulativeProfile {
        let mut relevant = reports.iter().filter(|r| r.concerns(contact_id));
        let latest = relevant.next();

        CumulativeProfile {
            contact_id: contact_id.to_string(),
            current_frame_score: latest
                .map(|r| r.frame_score())
                .unwrap_or(self.config.unscored_default),
            scans_count: latest.map_or(0, |_| 1 + relevant.count()),
            last_scan_at: latest.map(|r| r.created_at),
        }
    }

    /// Compare the latest score with the mean of up to `trend_window`
    /// reports before it. `None` with fewer than two reports.
    pub fn trend(&self, reports: &[ScanReport]) -> Option<Trend> {
        let (latest, preceding) = reports.split_first()?;
        if preceding.is_empty() {
            return None;
        }

        let window = &preceding[..preceding.len().min(self.config.trend_window.max(1))];
        let baseline =
            window.iter().map(|r| f64::from(r.frame_score())).sum::<f64>() / window.len() as f64;
        let delta = f64::from(latest.frame_score()) - baseline;

        let direction = if delta > 0.0 {
            TrendDirection::Up
        } else if delta < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        };

        Some(Trend {
            direction,
            change_amount: delta.abs().round() as u32,
        })
    }
}

/// Cumulative profile with the default configuration
pub fn compute_cumulative_profile(contact_id: &str, reports: &[ScanReport]) -> CumulativeProfile {
    let config = ProfileConfig::default();
    ProfileAggregator::new(&config).profile(contact_id, reports)
}

/// Trend with the default window
pub fn compute_trend(reports: &[ScanReport]) -> Option<Trend> {
    let config = ProfileConfig::default();
    ProfileAggregator::new(&config).trend(reports)
}

/// Trend with an explicit baseline window
pub fn compute_trend_with_window(reports: &[ScanReport], trend_window: usize) -> Option<Trend> {
    let config = ProfileConfig {
        trend_window,
        ..Default::default()
    };
    ProfileAggregator::new(&config).trend(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::report_with_score;
    use chrono::Duration;

    /// Reports for "c1" with the given scores in chronological order,
    /// returned most recent first.
    fn history(scores: &[u8]) -> Vec<ScanReport> {
        let start = Utc::now() - Duration::days(30);
        let mut reports: Vec<ScanReport> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                report_with_score(&format!("r{}", i), "c1", *s, start + Duration::hours(i as i64))
            })
            .collect();
        reports.reverse();
        reports
    }

    #[test]
    fn test_rising_history() {
        let reports = history(&[40, 60, 80]);
        let profile = compute_cumulative_profile("c1", &reports);
        assert_eq!(profile.current_frame_score, 80);
        assert_eq!(profile.scans_count, 3);
        assert_eq!(profile.last_scan_at, Some(reports[0].created_at));

        let trend = compute_trend(&reports).unwrap();
        assert_eq!(trend.direction, TrendDirection::Up);
        assert_eq!(trend.change_amount, 30);
    }

    #[test]
    fn test_no_reports() {
        let profile = compute_cumulative_profile("c1", &[]);
        assert_eq!(profile.current_frame_score, 50);
        assert_eq!(profile.scans_count, 0);
        assert!(profile.last_scan_at.is_none());
        assert!(compute_trend(&[]).is_none());
    }

    #[test]
    fn test_single_report_has_no_trend() {
        let reports = history(&[72]);
        assert!(compute_trend(&reports).is_none());
        assert_eq!(compute_cumulative_profile("c1", &reports).current_frame_score, 72);
    }

    #[test]
    fn test_profile_ignores_other_contacts() {
        let reports = history(&[40, 60]);
        let profile = compute_cumulative_profile("someone-else", &reports);
        assert_eq!(profile.scans_count, 0);
        assert_eq!(profile.current_frame_score, 50);
    }

    #[test]
    fn test_unscored_default_is_configurable() {
        let config = ProfileConfig {
            unscored_default: 0,
            ..Default::default()
        };
        let profile = ProfileAggregator::new(&config).profile("c1", &[]);
        assert_eq!(profile.current_frame_score, 0);
    }

    #[test]
    fn test_falling_and_flat() {
        let trend = compute_trend(&history(&[70, 50])).unwrap();
        assert_eq!(trend.direction, TrendDirection::Down);
        assert_eq!(trend.change_amount, 20);

        let trend = compute_trend(&history(&[60, 40, 50])).unwrap();
        assert_eq!(trend.direction, TrendDirection::Flat);
        assert_eq!(trend.change_amount, 0);
    }

    #[test]
    fn test_window_limits_baseline() {
        // Chronological: 10, 90, 90, 50. Window 2 sees only the two 90s.
        let reports = history(&[10, 90, 90, 50]);
        let trend = compute_trend_with_window(&reports, 2).unwrap();
        assert_eq!(trend.direction, TrendDirection::Down);
        assert_eq!(trend.change_amount, 40);

        // Default window takes all three: mean 63.33
        let trend = compute_trend(&reports).unwrap();
        assert_eq!(trend.change_amount, 13);
    }

    #[test]
    fn test_direction_uses_unrounded_delta() {
        // Baseline (50 + 51) / 2 = 50.5, latest 51: delta 0.5 rounds to 1
        let trend = compute_trend(&history(&[50, 51, 51])).unwrap();
        assert_eq!(trend.direction, TrendDirection::Up);

        // Baseline (50 + 50 + 51) / 3 = 50.33, latest 50: down but rounds to 0
        let trend = compute_trend(&history(&[50, 50, 51, 50])).unwrap();
        assert_eq!(trend.direction, TrendDirection::Down);
        assert_eq!(trend.change_amount, 0);
    }
}
