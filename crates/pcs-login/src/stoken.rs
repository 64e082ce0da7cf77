//! Scoped STOKEN extraction.
//!
//! The login response carries a `stokenList` such as
//! `&quot;netdisk#ABC&quot;,&quot;tieba#XYZ&quot;`. Only the token scoped to
//! `netdisk` is accepted by the storage API.

use std::borrow::Cow;

use crate::error::{LoginError, Result};

/// Scope of the tokens used by the storage API.
pub const NETDISK_SCOPE: &str = "netdisk";

/// Returns the `netdisk` token from an entity-encoded stoken list.
pub fn extract_netdisk_stoken(stoken_list: &str) -> Result<String> {
    extract_scoped_stoken(stoken_list, NETDISK_SCOPE)
}

/// Returns the token for `scope` from an entity-encoded stoken list.
pub fn extract_scoped_stoken(stoken_list: &str, scope: &str) -> Result<String> {
    let decoded = decode_html_entities(stoken_list);
    let prefix = format!("\"{scope}#");

    decoded
        .split(',')
        .map(str::trim)
        .filter(|item| item.starts_with(&prefix))
        .find_map(|item| {
            let parts: Vec<&str> = item.split('#').collect();
            (parts.len() == 2).then(|| parts[1].trim_matches('"').to_string())
        })
        .ok_or(LoginError::TokenNotFound)
}

/// Decodes the HTML entities found in provider payloads.
///
/// Named entities for `& < > " '`, plus decimal and hex character
/// references. Anything else is kept verbatim.
pub fn decode_html_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|&semi| semi <= 10) {
            Some(semi) => match decode_entity(&tail[1..semi]) {
                Some(c) => {
                    out.push(c);
                    rest = &tail[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "quot" => Some('"'),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
