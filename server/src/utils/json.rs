//! JSON string escaping for hand-written documents
//!
//! Small documents (autocomplete entries) are written straight into a
//! pre-sized buffer instead of going through `serde_json`. The escaping
//! rules match what `serde_json` accepts on the way back in, plus the
//! JavaScript line terminators U+2028/U+2029 which some consumers choke on.

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Escape sequence for a single char, if it needs one.
#[inline]
fn short_escape(c: char) -> Option<&'static [u8]> {
    match c {
        '"' => Some(b"\\\""),
        '\\' => Some(b"\\\\"),
        '\t' => Some(b"\\t"),
        '\u{8}' => Some(b"\\b"),
        '\n' => Some(b"\\n"),
        '\r' => Some(b"\\r"),
        '\u{c}' => Some(b"\\f"),
        '\u{2028}' => Some(b"\\u2028"),
        '\u{2029}' => Some(b"\\u2029"),
        _ => None,
    }
}

/// Number of UTF-8 bytes `value` occupies once JSON-escaped (without quotes).
pub fn json_escaped_len(value: &str) -> usize {
    value
        .chars()
        .map(|c| match short_escape(c) {
            Some(escaped) => escaped.len(),
            None if (c as u32) < 0x20 => 6, // \u00XX
            None => c.len_utf8(),
        })
        .sum()
}

/// Append the JSON-escaped form of `value` (without quotes) to `buf`.
pub fn write_json_escaped(buf: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    let mut start = 0;

    for (i, c) in value.char_indices() {
        let control = (c as u32) < 0x20;
        let escaped = short_escape(c);
        if escaped.is_none() && !control {
            continue;
        }

        buf.extend_from_slice(&bytes[start..i]);
        match escaped {
            Some(seq) => buf.extend_from_slice(seq),
            None => {
                let b = c as u8;
                buf.extend_from_slice(b"\\u00");
                buf.push(HEX[(b >> 4) as usize]);
                buf.push(HEX[(b & 0xf) as usize]);
            }
        }
        start = i + c.len_utf8();
    }

    buf.extend_from_slice(&bytes[start..]);
}
