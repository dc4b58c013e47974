use std::borrow::Cow;

use serde_json::{Map, Value};

use podfilter_types::{ControlRange, FIELD_LOG};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Rewrite every byte in `range` as `\xHH` (uppercase hex).
///
/// Works on bytes. Control bytes are ASCII and never occur inside a multi-byte
/// UTF-8 sequence, so every cut lands on a char boundary. Text without any
/// such byte is borrowed as is.
pub fn escape_control_bytes(text: &str, range: ControlRange) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let Some(first) = bytes.iter().position(|&b| range.contains(b)) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(&text[..first]);
    let mut start = first;

    for (i, &byte) in bytes.iter().enumerate().skip(first) {
        if !range.contains(byte) {
            continue;
        }
        out.push_str(&text[start..i]);
        out.push('\\');
        out.push('x');
        out.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
        out.push(HEX_DIGITS[usize::from(byte & 0x0F)] as char);
        start = i + 1;
    }
    out.push_str(&text[start..]);

    Cow::Owned(out)
}

/// Escape control bytes in the record's `log` field, if it is a string.
///
/// Must only run on records already judged, since patterns are matched
/// against the raw text.
pub fn sanitize_record(record: &mut Map<String, Value>, range: ControlRange) {
    let Some(Value::String(log)) = record.get_mut(FIELD_LOG) else {
        return;
    };
    let escaped = match escape_control_bytes(log, range) {
        Cow::Borrowed(_) => return,
        Cow::Owned(escaped) => escaped,
    };
    *log = escaped;
}
