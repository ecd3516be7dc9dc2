//! Literal decoding for tuple fields.
//!
//! Decoding is total. The universal fallback is best-effort verbatim text,
//! so a malformed field can never fail a row on its own; callers discard
//! rows that come up short on columns.

use crate::models::{DecodedRow, SqlValue};
use crate::tokenizer::split_fields;

/// Decodes one raw tuple into typed values.
pub fn decode_row(tuple: &str) -> DecodedRow {
    split_fields(tuple).into_iter().map(decode_field).collect()
}

/// Decodes a single literal token.
///
/// `NULL` (any case, unquoted) becomes null; a bare run of digits becomes
/// an integer; a `'...'` or `"..."` literal becomes unescaped text.
/// Anything else, including digit runs too large for i64, comes back
/// verbatim.
pub fn decode_field(token: &str) -> SqlValue {
    let t = token.trim();

    if t.eq_ignore_ascii_case("null") {
        return SqlValue::Null;
    }

    if !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = t.parse::<i64>() {
            return SqlValue::Integer(n);
        }
    }

    if t.len() >= 2 {
        let b = t.as_bytes();
        let first = b[0];
        if (first == b'\'' || first == b'"') && b[b.len() - 1] == first {
            return SqlValue::Text(unescape(&t[1..t.len() - 1]));
        }
    }

    SqlValue::Text(t.to_string())
}

/// Resolves backslash escapes in a single pass: `\'` `\"` `\\` `\n` `\r`
/// `\t` map to their characters, `\0` is dropped, and an unknown escape
/// keeps its backslash.
pub fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
