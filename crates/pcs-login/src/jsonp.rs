//! JSONP unwrapping and repair of the provider's non-standard JSON.
//!
//! Every passport endpoint answers with `callback(<payload>)`, sometimes
//! followed by more script. The login confirmation endpoint additionally
//! emits single-quoted, backslash-littered JSON. All of that string surgery
//! lives here so a format change on the provider side stays local to this
//! module.

use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::{LoginError, Result};

fn callback_missing(callback: &str) -> LoginError {
    LoginError::CallbackUnwrap {
        callback: callback.to_string(),
    }
}

/// Byte offset of the first payload byte, right after `callback(`.
fn payload_start(body: &str, callback: &str) -> Result<usize> {
    if callback.is_empty() {
        return Err(callback_missing(callback));
    }
    let marker = format!("{callback}(");
    body.find(&marker)
        .map(|start| start + marker.len())
        .ok_or_else(|| callback_missing(callback))
}

/// Offset of the `)` closing the call, skipping nested brackets and quoted
/// strings of either quote style.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Strips the `callback(...)` wrapper from a JSONP body and returns the raw
/// argument text.
///
/// The argument ends at the parenthesis that balances `callback(`, so
/// brackets or parentheses inside the payload and script after the call are
/// both left alone. Use this for payloads that need [`repair`] first.
pub fn unwrap_jsonp<'a>(body: &'a str, callback: &str) -> Result<&'a str> {
    let start = payload_start(body, callback)?;
    let end = closing_paren(&body[start..]).ok_or_else(|| callback_missing(callback))? + start;
    let payload = &body[start..end];
    if payload.trim().is_empty() {
        return Err(callback_missing(callback));
    }

    trace!(callback, payload, "Unwrapped JSONP payload");
    Ok(payload)
}

/// Deserializes the single JSON value passed to `callback` in a JSONP body.
///
/// Exactly one value is read after `callback(`; it must be followed by the
/// closing parenthesis. Whatever comes after the call is ignored.
pub fn parse_jsonp<T: DeserializeOwned>(body: &str, callback: &str) -> Result<T> {
    let rest = &body[payload_start(body, callback)?..];
    if rest.trim_start().starts_with(')') {
        return Err(callback_missing(callback));
    }

    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<serde_json::Value>();
    let value = match values.next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => return Err(LoginError::ResponseFormat(e.to_string())),
        None => return Err(callback_missing(callback)),
    };
    if !rest[values.byte_offset()..].trim_start().starts_with(')') {
        return Err(callback_missing(callback));
    }

    trace!(callback, %value, "Parsed JSONP payload");
    serde_json::from_value(value).map_err(|e| LoginError::ResponseFormat(e.to_string()))
}

/// Fixes the quoting quirks of the login confirmation payload.
///
/// Single quotes become double quotes, surrounding whitespace is trimmed and
/// every backslash is dropped.
pub fn repair(raw: &str) -> String {
    raw.replace('\'', "\"").trim().replace('\\', "")
}

/// Parses well-formed JSON text into `T`.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| LoginError::ResponseFormat(e.to_string()))
}

/// Repairs `raw`, checks that the result is valid JSON and deserializes it.
pub fn repair_and_parse<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let text = repair(raw);
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| LoginError::ResponseFormat(format!("{e}: {text}")))?;
    serde_json::from_value(value).map_err(|e| LoginError::ResponseFormat(e.to_string()))
}
