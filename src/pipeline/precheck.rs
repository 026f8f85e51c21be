//! Content pre-checks run before any credit is reserved

use super::ScanInput;
use crate::config::PipelineConfig;
use crate::models::Modality;
use crate::provider::DomainProfile;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "heic", "bmp"];

/// Return the rejection reason when `input` cannot be analyzed
pub fn check(input: &ScanInput, profile: &DomainProfile, config: &PipelineConfig) -> Result<(), String> {
    if input
        .subject_contact_ids
        .iter()
        .all(|id| id.trim().is_empty())
    {
        return Err("Select at least one contact this content is about".to_string());
    }

    if input.tier.modality() != input.modality {
        return Err(match input.modality {
            Modality::Text => format!("Text scans are free and cannot use the {} tier", input.tier),
            Modality::Image => "Image scans need the basic or detailed tier".to_string(),
        });
    }

    if !profile.allows(input.modality) {
        return Err(format!(
            "{} scans accept {} content only",
            profile.label,
            profile
                .allowed_modalities
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(" or ")
        ));
    }

    let content = input.content.trim();
    if content.is_empty() {
        return Err(match input.modality {
            Modality::Text => "Paste the message you want analyzed".to_string(),
            Modality::Image => "Provide an image to analyze".to_string(),
        });
    }

    match input.modality {
        Modality::Text => {
            let words = content.split_whitespace().count();
            if words < config.min_context_words {
                return Err(format!(
                    "Not enough context: {} word{} given, at least {} needed. \
                     Include who it is for, what it is about and when it was sent",
                    words,
                    if words == 1 { "" } else { "s" },
                    config.min_context_words
                ));
            }
        }
        Modality::Image => {
            if !is_image_reference(content) {
                return Err(format!(
                    "'{}' is not an image URL, data URI or file path",
                    content
                ));
            }
        }
    }

    Ok(())
}

/// `http(s)://` URL, `data:image/` URI, or something shaped like a file path
fn is_image_reference(reference: &str) -> bool {
    if reference.chars().any(char::is_whitespace) && !looks_like_path(reference) {
        return false;
    }

    let lower = reference.to_lowercase();
    if let Some(rest) = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
    {
        return rest.split('/').next().is_some_and(|host| !host.is_empty());
    }
    if let Some(rest) = lower.strip_prefix("data:") {
        return rest.starts_with("image/") && rest.contains(',');
    }
    if let Some(rest) = lower.strip_prefix("file://") {
        return !rest.is_empty();
    }

    looks_like_path(reference)
}

fn looks_like_path(reference: &str) -> bool {
    let rooted = ["/", "./", "../", "~/"]
        .iter()
        .any(|prefix| reference.starts_with(prefix))
        || reference.contains(":\\");

    let has_image_extension = std::path::Path::new(reference)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()));

    rooted || (has_image_extension && !reference.contains("://"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Domain, ScanTier};
    use crate::provider::profile_for;

    fn input(domain: Domain, modality: Modality, content: &str, subjects: &[&str]) -> ScanInput {
        ScanInput {
            domain,
            modality,
            content: content.to_string(),
            subject_contact_ids: subjects.iter().map(|s| s.to_string()).collect(),
            tier: match modality {
                Modality::Text => ScanTier::Text,
                Modality::Image => ScanTier::Basic,
            },
            domain_inferred: false,
        }
    }

    fn run(input: &ScanInput) -> Result<(), String> {
        check(input, profile_for(input.domain), &PipelineConfig::default())
    }

    const MESSAGE: &str = "Following up on Tuesday's demo with the pricing we discussed";

    #[test]
    fn test_accepts_valid_text() {
        assert!(run(&input(Domain::SalesEmail, Modality::Text, MESSAGE, &["c1"])).is_ok());
    }

    #[test]
    fn test_requires_subjects() {
        assert!(run(&input(Domain::SalesEmail, Modality::Text, MESSAGE, &[])).is_err());
        assert!(run(&input(Domain::SalesEmail, Modality::Text, MESSAGE, &["  "])).is_err());
    }

    #[test]
    fn test_modality_must_match_domain() {
        let err = run(&input(Domain::ProfilePhoto, Modality::Text, MESSAGE, &["c1"])).unwrap_err();
        assert!(err.contains("image"));
        assert!(run(&input(Domain::Negotiation, Modality::Image, "https://x.io/a.png", &["c1"])).is_err());
    }

    #[test]
    fn test_tier_must_match_modality() {
        let mut free_image = input(Domain::ProfilePhoto, Modality::Image, "https://x.io/a.png", &["c1"]);
        free_image.tier = ScanTier::Text;
        assert!(run(&free_image).unwrap_err().contains("basic or detailed"));

        let mut paid_text = input(Domain::SalesEmail, Modality::Text, MESSAGE, &["c1"]);
        paid_text.tier = ScanTier::Detailed;
        assert!(run(&paid_text).unwrap_err().contains("free"));
    }

    #[test]
    fn test_rejects_blank_and_short_text() {
        assert!(run(&input(Domain::General, Modality::Text, "   \n", &["c1"])).is_err());
        let err = run(&input(Domain::General, Modality::Text, "hey", &["c1"])).unwrap_err();
        assert!(err.contains("1 word given"));
    }

    #[test]
    fn test_image_references() {
        assert!(is_image_reference("https://cdn.example.com/me.jpg"));
        assert!(is_image_reference("http://example.com/photo"));
        assert!(is_image_reference("data:image/png;base64,iVBORw0KGgo="));
        assert!(is_image_reference("file:///home/me/photo.png"));
        assert!(is_image_reference("/home/me/photo"));
        assert!(is_image_reference("./shots/Profile Photo.JPG"));
        assert!(is_image_reference("headshot.webp"));

        assert!(!is_image_reference("https://"));
        assert!(!is_image_reference("data:text/plain,hello"));
        assert!(!is_image_reference("ftp://example.com/a.png"));
        assert!(!is_image_reference("just some words"));
        assert!(!is_image_reference("notes.txt"));
    }

    #[test]
    fn test_image_scan_rejection_reason() {
        let err = run(&input(Domain::ProfilePhoto, Modality::Image, "my face", &["c1"])).unwrap_err();
        assert!(err.contains("not an image"));
    }
}
