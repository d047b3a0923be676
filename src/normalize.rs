use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Fields probed when extracting a reply from a structured response,
/// in priority order.
const PRIORITY_FIELDS: [&str; 6] = ["output", "response", "message", "text", "data", "result"];

/// Placeholder some webhook flows emit when a model produced nothing.
const NO_OUTPUT: &str = "[No output]";

/// Shown when normalization ends up with an empty string.
pub const EMPTY_RESPONSE: &str = "[Empty response]";

/// A webhook response body, split by the content type the transport declared.
#[derive(Debug, Clone)]
pub enum ResponseEnvelope {
    Json(Value),
    Text(String),
}

/// Reduce a response envelope to the single string shown for one bot turn.
///
/// JSON bodies go through priority-field probing and the first-string
/// fallback search; other bodies are used verbatim. Either way the result
/// gets the iframe pass, is trimmed, and never comes back empty.
pub fn display_text(envelope: &ResponseEnvelope) -> String {
    let extracted = match envelope {
        ResponseEnvelope::Json(value) => extract_from_json(value),
        ResponseEnvelope::Text(body) => body.clone(),
    };

    let cleaned = sanitize_frames(&extracted);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        EMPTY_RESPONSE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn extract_from_json(value: &Value) -> String {
    let probed = PRIORITY_FIELDS
        .iter()
        .find_map(|field| value.get(field).and_then(coerce_to_text));

    // With no priority field present, prefer any nested string over dumping
    // the whole object at the user.
    let mut text = match probed {
        Some(text) => text,
        None => first_string(value).unwrap_or_else(|| value.to_string()),
    };

    if text.is_empty() || text == NO_OUTPUT || text == "{}" {
        if let Some(found) = first_string(value) {
            text = found;
        }
    }

    text
}

/// Accepts any present, non-null value. Strings must be non-empty;
/// everything else is coerced to its compact JSON form.
fn coerce_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Depth-first search for the first non-blank string, visiting object
/// fields in declaration order and recursing into nested containers before
/// moving on to the next sibling.
fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => map.values().find_map(first_string),
        Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}

fn srcdoc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<iframe[^>]*srcdoc="([^"]*)"[^>]*>"#).expect("srcdoc pattern")
    })
}

fn iframe_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<iframe.*?</iframe>").expect("iframe pattern"))
}

/// An iframe with a srcdoc attribute is a trusted rich response: its inline
/// document replaces the whole string. Any other iframe is stripped,
/// content included.
fn sanitize_frames(text: &str) -> String {
    if let Some(caps) = srcdoc_re().captures(text) {
        unescape_entities(&caps[1])
    } else {
        iframe_re().replace_all(text, "").into_owned()
    }
}

fn unescape_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_text(value: Value) -> String {
        display_text(&ResponseEnvelope::Json(value))
    }

    fn raw_text(body: &str) -> String {
        display_text(&ResponseEnvelope::Text(body.to_string()))
    }

    #[test]
    fn test_priority_field_wins() {
        let value = json!({"output": "the answer", "response": "ignored"});
        assert_eq!(json_text(value), "the answer");
    }

    #[test]
    fn test_priority_order_skips_missing_and_empty() {
        let value = json!({"output": "", "message": "from message"});
        assert_eq!(json_text(value), "from message");
    }

    #[test]
    fn test_null_priority_field_is_skipped() {
        let value = json!({"output": null, "text": "fallback text"});
        assert_eq!(json_text(value), "fallback text");
    }

    #[test]
    fn test_object_valued_priority_field_is_serialized() {
        let value = json!({"output": {"answer": 42}});
        assert_eq!(json_text(value), r#"{"answer":42}"#);
    }

    #[test]
    fn test_nested_string_found_depth_first() {
        let value = json!({"a": {"b": "hello"}});
        assert_eq!(json_text(value), "hello");
    }

    #[test]
    fn test_recursion_before_sibling() {
        let value = json!({"a": {"b": "inner"}, "c": "outer"});
        assert_eq!(json_text(value), "inner");
    }

    #[test]
    fn test_nested_string_inside_array() {
        let value = json!({"items": [1, {"note": "from array"}]});
        assert_eq!(json_text(value), "from array");
    }

    #[test]
    fn test_empty_object_serializes_to_itself() {
        assert_eq!(json_text(json!({})), "{}");
    }

    #[test]
    fn test_no_strings_anywhere_falls_back_to_serialization() {
        let value = json!({"count": 3, "flag": true});
        assert_eq!(json_text(value), r#"{"count":3,"flag":true}"#);
    }

    #[test]
    fn test_no_output_placeholder_triggers_search() {
        let value = json!({"output": "[No output]", "detail": {"msg": "real reply"}});
        assert_eq!(json_text(value), "real reply");
    }

    #[test]
    fn test_empty_object_priority_value_triggers_search() {
        let value = json!({"output": {}, "note": "found me"});
        assert_eq!(json_text(value), "found me");
    }

    #[test]
    fn test_raw_body_used_verbatim() {
        assert_eq!(raw_text("plain reply"), "plain reply");
    }

    #[test]
    fn test_srcdoc_iframe_replaces_whole_string() {
        let body = r#"<iframe srcdoc="&lt;b&gt;hi&lt;/b&gt;"></iframe>"#;
        assert_eq!(raw_text(body), "<b>hi</b>");
    }

    #[test]
    fn test_srcdoc_unescapes_all_entities() {
        let body = r#"<iframe srcdoc="&quot;a&quot; &amp; &#39;b&#39; &lt;c&gt;"></iframe>"#;
        assert_eq!(raw_text(body), r#""a" & 'b' <c>"#);
    }

    #[test]
    fn test_plain_iframe_is_stripped() {
        let body = "hello <iframe src='x'></iframe> world";
        assert_eq!(raw_text(body), "hello  world");
    }

    #[test]
    fn test_multiline_iframe_is_stripped() {
        let body = "before <iframe>\nsome\ncontent\n</iframe> after";
        assert_eq!(raw_text(body), "before  after");
    }

    #[test]
    fn test_empty_body_becomes_placeholder() {
        assert_eq!(raw_text(""), EMPTY_RESPONSE);
        assert_eq!(raw_text("   \n  "), EMPTY_RESPONSE);
    }

    #[test]
    fn test_iframe_only_body_becomes_placeholder() {
        assert_eq!(raw_text("<iframe src='x'></iframe>"), EMPTY_RESPONSE);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let value = json!({"output": "  padded  "});
        assert_eq!(json_text(value), "padded");
    }
}
