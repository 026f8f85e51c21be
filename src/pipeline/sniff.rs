//! Keyword-based domain guessing for quick scans
//!
//! Only the quick-scan entry point uses this. Explicit scans always use the
//! caller's domain.

use crate::models::Domain;
use regex::Regex;
use std::sync::OnceLock;

/// How much a domain guess can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confidence {
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffedDomain {
    pub domain: Domain,
    pub confidence: Confidence,
}

static RULES: OnceLock<Vec<(Domain, Regex)>> = OnceLock::new();

fn rules() -> &'static Vec<(Domain, Regex)> {
    RULES.get_or_init(|| {
        vec![
            (
                Domain::Negotiation,
                Regex::new(r"(?i)\b(counter[- ]?offer|offer|salary|rate|terms|budget|discount|price|deal|contract|compensation)\b")
                    .expect("valid regex"),
            ),
            (
                Domain::SalesEmail,
                Regex::new(r"(?i)\b(demo|follow(ing)?[- ]?up|quick call|pricing|proposal|prospect|our (product|platform|solution)|book a (call|meeting)|circle back)\b")
                    .expect("valid regex"),
            ),
            (
                Domain::DatingMessage,
                Regex::new(r"(?i)\b(date|drinks|dinner|match(ed)?|cute|tinder|hinge|bumble|miss you|babe|crush)\b")
                    .expect("valid regex"),
            ),
            (
                Domain::SocialPost,
                Regex::new(r"(?i)(#\w+|\b(followers|repost|retweet|linkedin|thread|like and share|link in bio)\b)")
                    .expect("valid regex"),
            ),
        ]
    })
}

/// Guess the domain of a text from keyword hits.
///
/// The domain with the most hits wins; ties go to the earlier rule. No hits
/// means [`Domain::General`].
pub fn sniff_domain(content: &str) -> SniffedDomain {
    let domain = rules()
        .iter()
        .map(|(domain, pattern)| (*domain, pattern.find_iter(content).count()))
        .filter(|(_, hits)| *hits > 0)
        .fold(None::<(Domain, usize)>, |best, (domain, hits)| match best {
            Some((_, best_hits)) if best_hits >= hits => best,
            _ => Some((domain, hits)),
        })
        .map(|(domain, _)| domain)
        .unwrap_or(Domain::General);

    SniffedDomain {
        domain,
        confidence: Confidence::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniffs_sales() {
        let sniffed = sniff_domain("Following up on the demo, can we book a call about pricing?");
        assert_eq!(sniffed.domain, Domain::SalesEmail);
        assert_eq!(sniffed.confidence, Confidence::Low);
    }

    #[test]
    fn test_sniffs_negotiation() {
        let sniffed =
            sniff_domain("Thanks for the offer. Given the scope, the salary and terms need to move up");
        assert_eq!(sniffed.domain, Domain::Negotiation);
    }

    #[test]
    fn test_sniffs_dating() {
        let sniffed = sniff_domain("Had fun last night, want to grab drinks Friday after our date?");
        assert_eq!(sniffed.domain, Domain::DatingMessage);
    }

    #[test]
    fn test_sniffs_social() {
        let sniffed = sniff_domain("Big news for my followers today #launch #startup");
        assert_eq!(sniffed.domain, Domain::SocialPost);
    }

    #[test]
    fn test_falls_back_to_general() {
        let sniffed = sniff_domain("See you at the team offsite next week, bring a jacket");
        assert_eq!(sniffed.domain, Domain::General);
    }
}
