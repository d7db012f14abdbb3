//! Structured parsing of free-form backend text.
//!
//! Backends return natural-language-adjacent output with no format guarantee,
//! so every structured read goes through three tiers:
//! 1. the trimmed text as-is,
//! 2. the text with Markdown code fences stripped,
//! 3. the first balanced `{…}` / `[…]` span found anywhere in the text.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("response was empty")]
    Empty,

    #[error("no parseable JSON found in response: {preview}")]
    NoJson { preview: String },
}

/// Which tier produced the value. Logged by callers; never part of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    Direct,
    Unfenced,
    Scanned,
}

pub fn parse_structured(text: &str) -> Result<(Value, ParseTier), ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok((value, ParseTier::Direct));
    }

    let unfenced = strip_json_fences(text);
    if unfenced != text {
        if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
            return Ok((value, ParseTier::Unfenced));
        }
    }

    // Try every opening bracket in turn; one that never closes, closes with
    // the wrong bracket, or encloses invalid JSON does not end the scan.
    let mut offset = 0;
    while let Some(found) = text[offset..].find(|c: char| c == '{' || c == '[') {
        let start = offset + found;
        if let Some(span) = balanced_span(&text[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(span) {
                return Ok((value, ParseTier::Scanned));
            }
        }
        offset = start + 1;
    }

    Err(ParseError::NoJson {
        preview: text.chars().take(80).collect(),
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output,
/// including fences that appear after leading prose.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(open) = text.find("```") else {
        return text;
    };
    let after = &text[open + 3..];
    // Drop an info string such as `json` on the opening fence line.
    let body = match after.find('\n') {
        Some(nl) if after[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => &after[nl + 1..],
        _ => after.strip_prefix("json").unwrap_or(after),
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Returns the balanced object or array span opening at the start of `text`,
/// tracking string literals and escapes so brackets inside strings are
/// ignored.
fn balanced_span(text: &str) -> Option<&str> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => stack.push(c),
            '}' | ']' if !in_string => {
                let expected = if c == '}' { '{' } else { '[' };
                if stack.pop() != Some(expected) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&text[..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
