//! Recovery of the links object from free-form LM text.
use super::LookupResult;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("response text is empty")]
    Empty,

    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("invalid JSON object: {0}")]
    Invalid(String),
}

fn fenced_object() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("fenced JSON pattern")
    })
}

/// Extract the links object from a reply that may be wrapped in prose or fences.
///
/// Tries a fenced block first, then the widest `{ ... }` span, then gives up.
pub fn parse_possibly_wrapped_json(text: &str) -> Result<LookupResult, ParseFailure> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseFailure::Empty);
    }

    if let Some(caps) = fenced_object().captures(text) {
        match parse_object(&caps[1]) {
            Ok(result) => return Ok(result),
            Err(err) => {
                tracing::debug!(error = %err, "fenced block rejected, trying bare braces");
            }
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => parse_object(&text[start..=end]),
        _ => Err(ParseFailure::NoJsonObject),
    }
}

fn parse_object(candidate: &str) -> Result<LookupResult, ParseFailure> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|err| ParseFailure::Invalid(err.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ParseFailure::Invalid("expected a JSON object".to_string()));
    };
    Ok(LookupResult {
        website: string_field(&map, "website"),
        linkedin: string_field(&map, "linkedin"),
        careers: string_field(&map, "careers"),
        job_listings: string_field(&map, "job_listings"),
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACME: &str = r#"{"website": "https://acme.com", "linkedin": "https://linkedin.com/acme", "careers": "https://acme.com/careers", "job_listings": "https://acme.com/careers/jobs"}"#;

    fn acme() -> LookupResult {
        LookupResult {
            website: Some("https://acme.com".to_string()),
            linkedin: Some("https://linkedin.com/acme".to_string()),
            careers: Some("https://acme.com/careers".to_string()),
            job_listings: Some("https://acme.com/careers/jobs".to_string()),
        }
    }

    #[test]
    fn parses_plain_object() {
        assert_eq!(parse_possibly_wrapped_json(ACME), Ok(acme()));
    }

    #[test]
    fn parses_json_fence_inside_prose() {
        let text = format!("Here is what I found:\n```json\n{ACME}\n```\nLet me know!");
        assert_eq!(parse_possibly_wrapped_json(&text), Ok(acme()));
    }

    #[test]
    fn parses_unlabeled_fence() {
        let text = format!("```\n{ACME}\n```");
        assert_eq!(parse_possibly_wrapped_json(&text), Ok(acme()));
    }

    #[test]
    fn falls_back_to_bare_braces_in_prose() {
        let text = format!("Based on my search, {ACME} are the links.");
        assert_eq!(parse_possibly_wrapped_json(&text), Ok(acme()));
    }

    #[test]
    fn broken_fence_poisons_bare_brace_fallback() {
        let text = format!("```json\n{{oops}}\n```\nCorrected: {ACME}");
        // widest span starts inside the broken block
        assert!(matches!(
            parse_possibly_wrapped_json(&text),
            Err(ParseFailure::Invalid(_))
        ));
    }

    #[test]
    fn keeps_sentinel_and_drops_blank_or_non_string_values() {
        let text = r#"{"website": "Not Found", "linkedin": "  ", "careers": null, "job_listings": 42}"#;
        let result = parse_possibly_wrapped_json(text).expect("parse");
        assert_eq!(result.website.as_deref(), Some("Not Found"));
        assert_eq!(result.linkedin, None);
        assert_eq!(result.careers, None);
        assert_eq!(result.job_listings, None);
    }

    #[test]
    fn missing_keys_stay_absent() {
        let result = parse_possibly_wrapped_json(r#"{"website": "https://acme.com"}"#)
            .expect("parse");
        assert_eq!(result.website.as_deref(), Some("https://acme.com"));
        assert_eq!(result.job_listings, None);
    }

    #[test]
    fn reports_empty_and_missing_objects() {
        assert_eq!(parse_possibly_wrapped_json("  \n"), Err(ParseFailure::Empty));
        assert_eq!(
            parse_possibly_wrapped_json("I could not find anything."),
            Err(ParseFailure::NoJsonObject)
        );
        assert_eq!(
            parse_possibly_wrapped_json("} backwards {"),
            Err(ParseFailure::NoJsonObject)
        );
    }

    #[test]
    fn reports_invalid_json() {
        assert!(matches!(
            parse_possibly_wrapped_json("{website: acme.com}"),
            Err(ParseFailure::Invalid(_))
        ));
    }
}
