//! Ordered, duck-typed response parsing.
//!
//! Each parser is a free function over `&Value` returning `Option<String>`.
//! `parse_response` walks them in order; the first non-empty result wins.
//! New provider variants are added by appending to the list, not by editing
//! a chain of conditionals (see design notes on duck-typed parsing).

use serde_json::Value;

type Parser = fn(&Value) -> Option<String>;

const PARSERS: &[Parser] = &[
    parse_gemini_standard,
    parse_openai_standard,
    parse_generic_top_level,
    parse_generic_results,
    parse_nested_data,
];

/// Returns the first non-empty (post-trim) string any parser extracts.
pub fn parse_response(body: &Value) -> Option<String> {
    for parser in PARSERS {
        if let Some(text) = parser(body) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn parse_gemini_standard(body: &Value) -> Option<String> {
    let parts = body.get("candidates")?.get(0)?.get("content")?.get("parts")?.as_array()?;
    let mut out = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            out.push_str(text);
        } else if let Some(thinking) = part.get("thinking").and_then(Value::as_str) {
            out.push_str(thinking);
        } else if let Some(value) = part.get("value").and_then(Value::as_str) {
            out.push_str(value);
        } else if let Some(plain) = part.as_str() {
            out.push_str(plain);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn parse_openai_standard(body: &Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(String::from)
}

fn parse_generic_top_level(body: &Value) -> Option<String> {
    for key in ["response", "output", "content"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }
    None
}

fn parse_generic_results(body: &Value) -> Option<String> {
    let results = body.get("results")?;
    if let Some(text) = results.as_str() {
        return Some(text.to_string());
    }
    if let Some(list) = results.as_array() {
        let joined: String = list.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("\n\n");
        if !joined.is_empty() {
            return Some(joined);
        }
    }
    None
}

fn parse_nested_data(body: &Value) -> Option<String> {
    let data = body.get("data")?;
    for key in ["response", "output", "content"] {
        if let Some(text) = data.get(key).and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }
    if let Some(text) = data.get("candidates").and_then(|c| c.get(0)).and_then(|c| c.get("content")).and_then(Value::as_str) {
        return Some(text.to_string());
    }
    if let Some(text) = data
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
    {
        return Some(text.to_string());
    }
    data.as_str().map(String::from)
}
