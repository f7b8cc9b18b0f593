//! C-style string escaping.
//!
//! Escaping always covers the control characters, `DEL`, the backslash and
//! the double quote; bytes at and above 128 pass through untouched (string
//! payloads are UTF-8). In multiline mode `\n` is kept literal. Unescaping
//! additionally accepts octal (`\101`), hex (`\x41`) and 4- or 8-digit
//! unicode (`\u` / `\U`) sequences.

use crate::reflect::{ErrorKind, Output};

/// Escape `text` into `out`.
pub(crate) fn escape_into(out: &mut Output, text: &str, multiline: bool) {
    for &byte in text.as_bytes() {
        let should_escape = (byte < b' ' && !(multiline && byte == b'\n'))
            || byte == 0x7f
            || byte == b'"'
            || byte == b'\\';

        if !should_escape {
            out.write_u8(byte);
            continue;
        }

        match byte {
            0 => out.write_str("\\0"),
            b'"' => out.write_str("\\\""),
            b'\\' => out.write_str("\\\\"),
            0x07 => out.write_str("\\a"),
            0x08 => out.write_str("\\b"),
            0x0c => out.write_str("\\f"),
            b'\n' => out.write_str("\\n"),
            b'\r' => out.write_str("\\r"),
            b'\t' => out.write_str("\\t"),
            0x0b => out.write_str("\\v"),
            _ => out.write_str(&format!("\\x{byte:02X}")),
        }
    }
}

/// Undo [`escape_into`]. The input is the raw (still escaped) byte content of
/// a string literal, without the delimiting quotes.
pub(crate) fn unescape(raw: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let mut result = Vec::with_capacity(raw.len());
    let mut cursor = 0;

    while cursor < raw.len() {
        let byte = raw[cursor];
        if byte != b'\\' {
            result.push(byte);
            cursor += 1;
            continue;
        }

        cursor += 1; // Skip the backslash.
        let Some(&code) = raw.get(cursor) else {
            return Err(ErrorKind::InvalidEscape(String::new()));
        };
        cursor += 1;

        match code {
            b'\'' => result.push(b'\''),
            b'"' => result.push(b'"'),
            b'\\' => result.push(b'\\'),
            b'a' => result.push(0x07),
            b'b' => result.push(0x08),
            b'f' => result.push(0x0c),
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'v' => result.push(0x0b),
            b'0'..=b'7' => {
                cursor -= 1;
                let digits = take_while(raw, &mut cursor, 3, |b| (b'0'..=b'7').contains(&b));
                let value = u32::from_str_radix(&digits, 8).unwrap_or(u32::MAX);
                if value > 255 {
                    return Err(ErrorKind::InvalidEscape(digits));
                }
                result.push(value as u8);
            }
            b'x' => {
                let digits = take_while(raw, &mut cursor, 2, |b| b.is_ascii_hexdigit());
                if digits.is_empty() {
                    return Err(ErrorKind::InvalidEscape("x".into()));
                }
                let value = u32::from_str_radix(&digits, 16).unwrap_or(0);
                result.push(value as u8);
            }
            b'u' => unescape_unicode(raw, &mut cursor, 4, &mut result)?,
            b'U' => unescape_unicode(raw, &mut cursor, 8, &mut result)?,
            other => {
                return Err(ErrorKind::InvalidEscape(
                    char::from(other).to_string(),
                ));
            }
        }
    }

    Ok(result)
}

fn unescape_unicode(
    raw: &[u8],
    cursor: &mut usize,
    digit_count: usize,
    result: &mut Vec<u8>,
) -> Result<(), ErrorKind> {
    let digits = take_while(raw, cursor, digit_count, |b| b.is_ascii_hexdigit());
    if digits.len() != digit_count {
        return Err(ErrorKind::InvalidEscape(format!(
            "{}{digits}",
            if digit_count == 4 { 'u' } else { 'U' }
        )));
    }
    let value = u32::from_str_radix(&digits, 16).unwrap_or(u32::MAX);
    let ch = char::from_u32(value).ok_or_else(|| ErrorKind::InvalidEscape(digits))?;
    let mut buf = [0u8; 4];
    result.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    Ok(())
}

fn take_while(raw: &[u8], cursor: &mut usize, max: usize, pred: impl Fn(u8) -> bool) -> String {
    let start = *cursor;
    while *cursor < raw.len() && *cursor - start < max && pred(raw[*cursor]) {
        *cursor += 1;
    }
    String::from_utf8_lossy(&raw[start..*cursor]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escape(text: &str, multiline: bool) -> String {
        let mut out = Output::new();
        escape_into(&mut out, text, multiline);
        out.into_string()
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(escape("a\tb\nc\"d\\e", false), "a\\tb\\nc\\\"d\\\\e");
    }

    #[test]
    fn multiline_keeps_line_feeds() {
        assert_eq!(escape("a\nb", true), "a\nb");
        assert_eq!(escape("a\rb", true), "a\\rb");
    }

    #[test]
    fn unprintable_bytes_use_hex() {
        assert_eq!(escape("\u{1}\u{7f}", false), "\\x01\\x7F");
    }

    #[test]
    fn unescape_round_trip() {
        // Given
        let original = "tab\t quote\" back\\ bell\u{7} nl\n";

        // When
        let escaped = escape(original, false);
        let bytes = unescape(escaped.as_bytes()).unwrap();

        // Then
        assert_eq!(String::from_utf8(bytes).unwrap(), original);
    }

    #[test]
    fn numeric_escapes() {
        assert_eq!(unescape(b"\\101").unwrap(), b"A");
        assert_eq!(unescape(b"\\x41").unwrap(), b"A");
        assert_eq!(unescape(b"\\u0041").unwrap(), b"A");
        assert_eq!(
            String::from_utf8(unescape(b"\\U0001F600").unwrap()).unwrap(),
            "\u{1F600}"
        );
    }

    #[test]
    fn invalid_escapes_are_reported() {
        assert!(matches!(
            unescape(b"\\q"),
            Err(ErrorKind::InvalidEscape(_))
        ));
        assert!(matches!(
            unescape(b"\\777"),
            Err(ErrorKind::InvalidEscape(_))
        ));
        assert!(matches!(
            unescape(b"\\uD800"),
            Err(ErrorKind::InvalidEscape(_))
        ));
    }
}
