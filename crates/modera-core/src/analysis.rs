//! Parsing of raw AI vision output into a structured verdict.
//!
//! The gateway returns untrusted text: it may be valid JSON, JSON wrapped
//! in a markdown code fence, or free-form prose. Parsing is fail-open —
//! anything that cannot be understood degrades to [`SafetyStatus::Safe`]
//! with an empty tag set, and the raw text is kept for the moderator.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::media::ValidationError;
use crate::safety::SafetyStatus;

/// Maximum tag name length after trimming, in characters.
pub const MAX_TAG_LEN: usize = 50;

/// Structured verdict extracted from the gateway's raw response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    /// Resolved safety tier (fallback `Safe` when unknown or unparseable).
    pub status: SafetyStatus,
    /// Detected tag names, as reported by the model (not yet normalized).
    pub tags: Vec<String>,
    /// Model explanation, or the unparsed text when parsing failed.
    pub explanation: String,
    /// Fence-stripped raw text, preserved verbatim for the record.
    pub raw: String,
}

/// Wire shape the vision model is asked to produce.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    detected_tags: Vec<String>,
    #[serde(default)]
    safety_level: String,
    #[serde(default)]
    explanation: String,
}

fn opening_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```(?:json)?\s*").expect("valid regex"))
}

fn closing_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```$").expect("valid regex"))
}

/// Strip a markdown code fence (```json ... ```) if present.
///
/// Each side is stripped independently, so a response with only the
/// opening fence (models truncate the closing one often enough) still
/// comes out clean.
pub fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(m) = opening_fence_re().find(s) {
        s = &s[m.end()..];
    }
    if let Some(m) = closing_fence_re().find(s) {
        s = &s[..m.start()];
    }
    s.trim()
}

/// Parse raw gateway text into a [`ParsedAnalysis`].
///
/// Never fails: malformed JSON or an out-of-range `safety_level` fall back
/// to `Safe`. The fence-stripped text is always preserved in `raw`.
pub fn parse_analysis(text: &str) -> ParsedAnalysis {
    let cleaned = strip_code_fence(text);

    match serde_json::from_str::<RawVerdict>(cleaned) {
        Ok(verdict) => {
            let status = SafetyStatus::parse(&verdict.safety_level).unwrap_or_else(|| {
                tracing::warn!(
                    safety_level = %verdict.safety_level,
                    "unknown safety level from gateway, falling back to safe"
                );
                SafetyStatus::Safe
            });

            ParsedAnalysis {
                status,
                tags: verdict.detected_tags,
                explanation: verdict.explanation,
                raw: cleaned.to_string(),
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "unparseable gateway response, falling back to safe");
            ParsedAnalysis {
                status: SafetyStatus::Safe,
                tags: Vec::new(),
                explanation: cleaned.to_string(),
                raw: cleaned.to_string(),
            }
        }
    }
}

/// Normalize a single tag name: trim whitespace, enforce the length limit.
///
/// Empty-after-trim or over-long names are rejected.
pub fn normalize_tag_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidTag("empty tag name".to_string()));
    }
    if trimmed.chars().count() > MAX_TAG_LEN {
        return Err(ValidationError::InvalidTag(format!(
            "tag \"{}\" exceeds {} characters",
            trimmed, MAX_TAG_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalize a moderator's comma-joined tag string.
///
/// Splits on commas, trims each entry, drops empties, and rejects any tag
/// over the length limit. Returns the canonical `", "`-joined form.
pub fn normalize_moderator_tags(tags: &str) -> Result<String, ValidationError> {
    let mut cleaned = Vec::new();
    for part in tags.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part.chars().count() > MAX_TAG_LEN {
            return Err(ValidationError::InvalidTag(format!(
                "tag \"{}\" exceeds {} characters",
                part, MAX_TAG_LEN
            )));
        }
        cleaned.push(part);
    }
    Ok(cleaned.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let text = "```json\n{\"safety_level\": \"safe\"}\n```";
        assert_eq!(strip_code_fence(text), "{\"safety_level\": \"safe\"}");
    }

    #[test]
    fn strips_bare_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn strips_opening_fence_without_closing() {
        let text = "```json\n{\"safety_level\": \"unsafe\"}";
        assert_eq!(strip_code_fence(text), "{\"safety_level\": \"unsafe\"}");

        let parsed = parse_analysis(text);
        assert_eq!(parsed.status, SafetyStatus::Unsafe);
    }

    #[test]
    fn strips_closing_fence_without_opening() {
        let text = "{\"safety_level\": \"safe\"}\n```";
        assert_eq!(strip_code_fence(text), "{\"safety_level\": \"safe\"}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fence("  plain text  "), "plain text");
    }

    #[test]
    fn parses_full_verdict() {
        let text = r#"{"detected_tags": ["violence", "blood"], "safety_level": "unsafe", "explanation": "graphic imagery"}"#;
        let parsed = parse_analysis(text);
        assert_eq!(parsed.status, SafetyStatus::Unsafe);
        assert_eq!(parsed.tags, vec!["violence", "blood"]);
        assert_eq!(parsed.explanation, "graphic imagery");
    }

    #[test]
    fn parses_fenced_verdict() {
        let text = "```json\n{\"detected_tags\": [], \"safety_level\": \"potentially_unsafe\", \"explanation\": \"borderline\"}\n```";
        let parsed = parse_analysis(text);
        assert_eq!(parsed.status, SafetyStatus::PotentiallyUnsafe);
        assert!(!parsed.raw.contains("```"));
    }

    #[test]
    fn malformed_json_falls_back_to_safe() {
        let text = "The image shows a sunset over mountains.";
        let parsed = parse_analysis(text);
        assert_eq!(parsed.status, SafetyStatus::Safe);
        assert!(parsed.tags.is_empty());
        assert_eq!(parsed.explanation, text);
        assert_eq!(parsed.raw, text);
    }

    #[test]
    fn unknown_safety_level_falls_back_to_safe() {
        let text = r#"{"detected_tags": ["weapons"], "safety_level": "catastrophic", "explanation": "?"}"#;
        let parsed = parse_analysis(text);
        assert_eq!(parsed.status, SafetyStatus::Safe);
        // Tags are still taken at face value; the registry normalizes later.
        assert_eq!(parsed.tags, vec!["weapons"]);
    }

    #[test]
    fn missing_fields_default() {
        let parsed = parse_analysis("{}");
        assert_eq!(parsed.status, SafetyStatus::Safe);
        assert!(parsed.tags.is_empty());
        assert!(parsed.explanation.is_empty());
    }

    #[test]
    fn normalize_tag_name_trims() {
        assert_eq!(normalize_tag_name("  violence  ").unwrap(), "violence");
    }

    #[test]
    fn normalize_tag_name_rejects_empty_and_long() {
        assert!(normalize_tag_name("   ").is_err());
        assert!(normalize_tag_name(&"x".repeat(MAX_TAG_LEN + 1)).is_err());
        assert!(normalize_tag_name(&"x".repeat(MAX_TAG_LEN)).is_ok());
    }

    #[test]
    fn normalize_moderator_tags_cleans_list() {
        let result = normalize_moderator_tags(" tag1 ,, tag2,  ").unwrap();
        assert_eq!(result, "tag1, tag2");
    }

    #[test]
    fn normalize_moderator_tags_rejects_long_entries() {
        let long = "y".repeat(MAX_TAG_LEN + 1);
        assert!(normalize_moderator_tags(&format!("ok, {long}")).is_err());
    }

    #[test]
    fn normalize_moderator_tags_empty_string_is_ok() {
        assert_eq!(normalize_moderator_tags("").unwrap(), "");
    }
}
