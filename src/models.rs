//! Core data models for framescan
//!
//! These models are shared by the pipeline, the report store and the
//! consumer-facing engine API.

use crate::provider::NormalizedAnalysis;
use crate::scoring::FrameScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Hex SHA-256 of submitted content.
///
/// Reports keep the digest instead of the raw content so that duplicate
/// submissions can be recognized without storing message bodies.
pub fn content_digest(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Analysis domain, selecting the prompt/schema profile used for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    SalesEmail,
    DatingMessage,
    ProfilePhoto,
    Negotiation,
    SocialPost,
    General,
}

impl Domain {
    pub fn all() -> &'static [Domain] {
        &[
            Domain::SalesEmail,
            Domain::DatingMessage,
            Domain::ProfilePhoto,
            Domain::Negotiation,
            Domain::SocialPost,
            Domain::General,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Domain::SalesEmail => "sales_email",
            Domain::DatingMessage => "dating_message",
            Domain::ProfilePhoto => "profile_photo",
            Domain::Negotiation => "negotiation",
            Domain::SocialPost => "social_post",
            Domain::General => "general",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Domain::all()
            .iter()
            .copied()
            .find(|d| d.name() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Domain::all().iter().map(|d| d.name()).collect();
                format!("Unknown domain '{}'. Valid domains: {}", s, valid.join(", "))
            })
    }
}

/// Kind of content submitted for analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Text => write!(f, "text"),
            Modality::Image => write!(f, "image"),
        }
    }
}

/// Named scan configuration with an associated credit cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanTier {
    /// Text analysis, always free
    #[default]
    Text,
    Basic,
    Detailed,
}

impl ScanTier {
    /// Content kind the tier analyzes: text is the free tier, images are paid
    pub fn modality(&self) -> Modality {
        match self {
            ScanTier::Text => Modality::Text,
            ScanTier::Basic | ScanTier::Detailed => Modality::Image,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanTier::Text => "text",
            ScanTier::Basic => "basic",
            ScanTier::Detailed => "detailed",
        }
    }
}

impl std::fmt::Display for ScanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(ScanTier::Text),
            "basic" => Ok(ScanTier::Basic),
            "detailed" => Ok(ScanTier::Detailed),
            _ => Err(format!(
                "Unknown tier '{}'. Valid tiers: text, basic, detailed",
                s
            )),
        }
    }
}

/// A persisted scan result.
///
/// Scoring fields never change after creation; only `custom_domain_tags`
/// may be edited, and only through the report store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub domain: Domain,
    pub modality: Modality,
    pub tier: ScanTier,
    pub subject_contact_ids: Vec<String>,
    pub score: FrameScore,
    pub raw_result: NormalizedAnalysis,
    #[serde(default)]
    pub custom_domain_tags: BTreeSet<String>,
    /// Domain came from keyword sniffing rather than the caller
    #[serde(default)]
    pub domain_inferred: bool,
    #[serde(default)]
    pub content_digest: String,
}

impl ScanReport {
    pub fn frame_score(&self) -> u8 {
        self.score.frame_score
    }

    pub fn concerns(&self, contact_id: &str) -> bool {
        self.subject_contact_ids.iter().any(|c| c == contact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parsing_accepts_both_separators() {
        assert_eq!("sales-email".parse::<Domain>(), Ok(Domain::SalesEmail));
        assert_eq!("dating_message".parse::<Domain>(), Ok(Domain::DatingMessage));
        assert_eq!(" General ".parse::<Domain>(), Ok(Domain::General));
        assert!("poetry".parse::<Domain>().is_err());
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("detailed".parse::<ScanTier>(), Ok(ScanTier::Detailed));
        assert_eq!("BASIC".parse::<ScanTier>(), Ok(ScanTier::Basic));
        assert!("premium".parse::<ScanTier>().is_err());
    }

    #[test]
    fn test_tier_modality() {
        assert_eq!(ScanTier::Text.modality(), Modality::Text);
        assert_eq!(ScanTier::Basic.modality(), Modality::Image);
        assert_eq!(ScanTier::Detailed.modality(), Modality::Image);
    }

    #[test]
    fn test_content_digest_is_stable() {
        let a = content_digest("hello there");
        let b = content_digest("hello there");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_digest("hello there!"));
    }

    #[test]
    fn test_domain_serializes_snake_case() {
        let json = serde_json::to_string(&Domain::ProfilePhoto).unwrap();
        assert_eq!(json, "\"profile_photo\"");
    }
}
