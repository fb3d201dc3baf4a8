//! JSON salvage: recover the field object from the model's free-form reply.
//!
//! ## Why is salvage necessary?
//!
//! The prompt says "Just return the JSON, no other text" and models mostly
//! comply — but *mostly* is not *always*. Observed failure shapes:
//!
//! - the object wrapped in ` ```json … ``` ` fences despite the instruction
//! - a polite preamble: "Here is the extracted data: { … }"
//! - a trailing disclaimer after the closing brace
//!
//! Salvage applies cheap, deterministic recovery passes in order of
//! strictness, the same philosophy as deterministic output cleanup: fix the
//! model's packaging without ever touching the content. Each pass is
//! independently testable.
//!
//! ## Attempt order
//!
//! 1. strip an outer code fence when the whole reply is wrapped in one;
//! 2. parse the (trimmed) text as JSON directly;
//! 3. take the substring from the first `{` to the last `}` and parse that.
//!
//! Anything that survives to a JSON object is accepted; a reply with no
//! recoverable object is an error carrying a short description (the caller
//! keeps the raw text on the `FileResult` for diagnostics).

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// How a reply failed to yield JSON. Converted to a `FileError` by the
/// caller, which also knows the filename.
#[derive(Debug, PartialEq, Eq)]
pub enum SalvageFailure {
    /// No `{ … }` span exists in the text at all.
    NoObject,
    /// A candidate span was found but did not parse.
    ParseFailed(String),
    /// The text parsed, but to something other than an object.
    NotAnObject,
}

impl std::fmt::Display for SalvageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SalvageFailure::NoObject => write!(f, "no JSON object in reply"),
            SalvageFailure::ParseFailed(detail) => write!(f, "JSON parse failed: {detail}"),
            SalvageFailure::NotAnObject => write!(f, "reply is JSON but not an object"),
        }
    }
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*?)\n?```\s*$").unwrap());

/// Strip an outer ```/```json fence when the whole reply is wrapped in one.
fn strip_fence(input: &str) -> &str {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(input),
        None => input.trim(),
    }
}

/// Recover a JSON object from the model's reply text.
pub fn salvage_json(reply: &str) -> Result<Value, SalvageFailure> {
    let text = strip_fence(reply);

    // Fast path: the whole reply is the object.
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return if value.is_object() {
            Ok(value)
        } else {
            Err(SalvageFailure::NotAnObject)
        };
    }

    // Fallback: widest brace-delimited span. The object we want is the
    // outermost one, so first '{' to last '}' is the right cut even when
    // nested objects appear inside.
    let start = text.find('{').ok_or(SalvageFailure::NoObject)?;
    let end = text.rfind('}').ok_or(SalvageFailure::NoObject)?;
    if end < start {
        return Err(SalvageFailure::NoObject);
    }

    let candidate = &text[start..=end];
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(SalvageFailure::NotAnObject),
        Err(e) => Err(SalvageFailure::ParseFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_json_parses_directly() {
        let v = salvage_json(r#"{"surname": "DUPONT", "gender": "F"}"#).unwrap();
        assert_eq!(v["surname"], "DUPONT");
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let reply = "```json\n{\"documentType\": \"Passport\"}\n```";
        let v = salvage_json(reply).unwrap();
        assert_eq!(v["documentType"], "Passport");
    }

    #[test]
    fn bare_fence_is_unwrapped() {
        let reply = "```\n{\"country\": \"Kenya\"}\n```";
        assert_eq!(salvage_json(reply).unwrap()["country"], "Kenya");
    }

    #[test]
    fn preamble_and_trailer_are_cut_away() {
        let reply = "Here is the extracted data:\n\n{\"surname\": \"IONESCU\", \"gender\": \"M\"}\n\nLet me know if you need anything else!";
        let v = salvage_json(reply).unwrap();
        assert_eq!(v["surname"], "IONESCU");
    }

    #[test]
    fn nested_objects_survive_the_outermost_cut() {
        let reply = "Sure: {\"surname\": \"LI\", \"extra\": {\"mrz\": \"P<CHN\"}} done";
        let v = salvage_json(reply).unwrap();
        assert_eq!(v["extra"]["mrz"], "P<CHN");
    }

    #[test]
    fn whitespace_and_leading_newlines_are_fine() {
        let v = salvage_json("\n\n   {\"gender\": \"F\"}   \n").unwrap();
        assert_eq!(v, json!({"gender": "F"}));
    }

    #[test]
    fn no_braces_is_no_object() {
        assert_eq!(
            salvage_json("I cannot read this document."),
            Err(SalvageFailure::NoObject)
        );
    }

    #[test]
    fn truncated_object_is_parse_failed() {
        let reply = r#"{"surname": "MARTIN", "givenName": "Cla"#;
        // No closing brace anywhere → no span to try.
        assert_eq!(salvage_json(reply), Err(SalvageFailure::NoObject));

        let reply = r#"{"surname": "MARTIN", "date": } trailing {x}"#;
        assert!(matches!(
            salvage_json(reply),
            Err(SalvageFailure::ParseFailed(_))
        ));
    }

    #[test]
    fn json_array_is_not_an_object() {
        assert_eq!(salvage_json("[1, 2, 3]"), Err(SalvageFailure::NotAnObject));
    }

    #[test]
    fn failure_display_is_short() {
        let msg = SalvageFailure::NoObject.to_string();
        assert_eq!(msg, "no JSON object in reply");
    }
}
