//! Cleanup of model replies: locate the JSON object inside chatty output.
//!
//! Even well-prompted models occasionally wrap a JSON reply in
//! ` ```json … ``` ` fences despite the directive saying not to, or prefix
//! it with a sentence of commentary. Retrying the call for that would waste
//! a full round-trip, so the JSON-mode rung first runs these cheap,
//! deterministic recovery rules. Only if no JSON object can be located at
//! all does the rung report an unparseable reply.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Strip an outer ```/```json fence pair, if present.
fn strip_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    }
}

/// Extract the first complete JSON object from a model reply.
///
/// Scans for the first `{` and returns the substring up to its balanced
/// closing brace, skipping braces inside string literals. Returns `None`
/// when no balanced object exists.
pub fn extract_json_object(input: &str) -> Option<String> {
    let text = strip_fences(input);
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_clean_json_through() {
        let raw = r#"{"title": "T", "slides": []}"#;
        assert_eq!(extract_json_object(raw).as_deref(), Some(raw));
    }

    #[test]
    fn strips_json_fences() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(raw).as_deref(), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn strips_bare_fences() {
        let raw = "```\n{\"a\": 1}\n```\n";
        assert_eq!(extract_json_object(raw).as_deref(), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn skips_leading_commentary() {
        let raw = "Sure, here is the outline you asked for:\n\n{\"title\": \"T\"} hope it helps";
        assert_eq!(extract_json_object(raw).as_deref(), Some(r#"{"title": "T"}"#));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let raw = r#"{"body": "use {braces} and a \" quote"}"#;
        assert_eq!(extract_json_object(raw).as_deref(), Some(raw));
    }

    #[test]
    fn nested_objects_balance() {
        let raw = r#"{"slides": [{"title": "a"}, {"title": "b"}]}"#;
        assert_eq!(extract_json_object(raw).as_deref(), Some(raw));
    }

    #[test]
    fn unbalanced_input_is_rejected() {
        assert_eq!(extract_json_object(r#"{"title": "T""#), None);
        assert_eq!(extract_json_object("no json here"), None);
    }
}
