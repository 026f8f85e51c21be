//! Fixed per-domain prompt and modality profiles

use crate::models::{Domain, Modality};

/// Prompt/schema configuration for one analysis domain
#[derive(Debug)]
pub struct DomainProfile {
    pub domain: Domain,
    pub label: &'static str,
    /// Describes the situation the content comes from
    pub context_label: &'static str,
    pub allowed_modalities: &'static [Modality],
    pub system_prompt: &'static str,
}

impl DomainProfile {
    pub fn allows(&self, modality: Modality) -> bool {
        self.allowed_modalities.contains(&modality)
    }
}

const TEXT_ONLY: &[Modality] = &[Modality::Text];
const IMAGE_ONLY: &[Modality] = &[Modality::Image];
const TEXT_AND_IMAGE: &[Modality] = &[Modality::Text, Modality::Image];

static PROFILES: [DomainProfile; 6] = [
    DomainProfile {
        domain: Domain::SalesEmail,
        label: "Sales email",
        context_label: "an outbound or follow-up sales email to a prospect",
        allowed_modalities: TEXT_ONLY,
        system_prompt: "You evaluate sales emails. Judge whether the sender leads from \
assumed value and clear terms, or chases the prospect with pressure, discounts and \
repeated check-ins.",
    },
    DomainProfile {
        domain: Domain::DatingMessage,
        label: "Dating message",
        context_label: "a message sent to a romantic interest or match",
        allowed_modalities: TEXT_ONLY,
        system_prompt: "You evaluate dating messages. Judge whether the sender is \
relaxed and outcome-independent, or seeks approval, over-explains and over-invests.",
    },
    DomainProfile {
        domain: Domain::ProfilePhoto,
        label: "Profile photo",
        context_label: "a profile or headshot photo used to introduce oneself",
        allowed_modalities: IMAGE_ONLY,
        system_prompt: "You evaluate profile photos. Judge posture, gaze, framing and \
setting for signals of composure and self-possession versus approval seeking.",
    },
    DomainProfile {
        domain: Domain::Negotiation,
        label: "Negotiation",
        context_label: "a message exchanged during a negotiation over price or terms",
        allowed_modalities: TEXT_ONLY,
        system_prompt: "You evaluate negotiation messages. Judge whether the sender \
anchors on their own terms and holds boundaries, or concedes early and justifies \
every position.",
    },
    DomainProfile {
        domain: Domain::SocialPost,
        label: "Social post",
        context_label: "a public social media post or its image",
        allowed_modalities: TEXT_AND_IMAGE,
        system_prompt: "You evaluate social media posts. Judge whether the author \
states a position from their own values, or fishes for validation and engagement.",
    },
    DomainProfile {
        domain: Domain::General,
        label: "General",
        context_label: "any interpersonal message or image",
        allowed_modalities: TEXT_AND_IMAGE,
        system_prompt: "You evaluate interpersonal communication. Judge the overall \
frame the author projects: composure, boundaries and independence from the \
other side's approval.",
    },
];

/// Look up the profile for a domain
pub fn profile_for(domain: Domain) -> &'static DomainProfile {
    PROFILES
        .iter()
        .find(|p| p.domain == domain)
        .unwrap_or(&PROFILES[PROFILES.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_domain_has_its_own_profile() {
        for domain in Domain::all() {
            assert_eq!(profile_for(*domain).domain, *domain);
        }
    }

    #[test]
    fn test_modalities() {
        assert!(profile_for(Domain::ProfilePhoto).allows(Modality::Image));
        assert!(!profile_for(Domain::ProfilePhoto).allows(Modality::Text));
        assert!(!profile_for(Domain::SalesEmail).allows(Modality::Image));
        assert!(!profile_for(Domain::Negotiation).allows(Modality::Image));
        assert!(profile_for(Domain::SocialPost).allows(Modality::Image));
        assert!(profile_for(Domain::General).allows(Modality::Text));
    }
}
