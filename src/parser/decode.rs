//! Best-effort repair of escaped or mis-encoded strings in JSON exports.
//!
//! Instagram exports store UTF-8 text as one code point per byte, sometimes
//! still carrying literal `\u00XX` escapes. Decoding never fails: if a step
//! cannot produce valid UTF-8 the input is kept as-is.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\u([0-9A-Fa-f]{4})").expect("invalid escape pattern"));

/// Decode a name or message text from a JSON export.
pub fn decode_export_string(raw: &str) -> String {
    let unescaped = decode_unicode_escapes(raw).unwrap_or_else(|| raw.to_string());
    match repair_mojibake(&unescaped) {
        Some(repaired) => repaired,
        None => unescaped,
    }
}

/// Reinterpret `\uXXXX` escapes as raw bytes and percent-decode the result as UTF-8.
fn decode_unicode_escapes(raw: &str) -> Option<String> {
    let percent_encoded = UNICODE_ESCAPE.replace_all(raw, |caps: &Captures<'_>| {
        let code = u32::from_str_radix(&caps[1], 16).unwrap_or(u32::MAX);
        if code <= 0xFF {
            format!("%{:02X}", code)
        } else {
            char::from_u32(code)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        }
    });

    urlencoding::decode(&percent_encoded)
        .ok()
        .map(Cow::into_owned)
}

/// Re-decode a string whose code points are all bytes forming valid UTF-8.
fn repair_mojibake(text: &str) -> Option<String> {
    if text.is_ascii() || text.chars().any(|c| u32::from(c) > 0xFF) {
        return None;
    }
    let bytes: Vec<u8> = text.chars().map(|c| u32::from(c) as u8).collect();
    String::from_utf8(bytes).ok()
}
