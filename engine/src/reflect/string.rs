//! Reflection for `String`.
//!
//! Text: double-quoted with C-style escapes; the `multiline_strings` option
//! keeps line feeds literal. Binary: a little-endian u32 byte length followed
//! by the raw bytes.

use crate::reflect::{
    ErrorKind, FromBinaryOptions, FromStringOptions, Input, Output, Reflect, Result,
    ToStringOptions, escape,
};

impl Reflect for String {
    fn write_text(&self, out: &mut Output, options: &ToStringOptions) -> Result<()> {
        out.write_char('"');
        escape::escape_into(out, self, options.multiline_strings);
        out.write_char('"');
        Ok(())
    }

    fn read_text(&mut self, input: &mut Input<'_>, _options: &FromStringOptions) -> Result<()> {
        input.discard('"')?;
        let mut raw = Vec::new();
        loop {
            let Ok(byte) = input.read_byte() else {
                return Err(input.error(ErrorKind::UnterminatedString));
            };
            if byte == b'"' {
                break;
            }
            raw.push(byte);
            if byte == b'\\' {
                let Ok(escaped) = input.read_byte() else {
                    return Err(input.error(ErrorKind::UnterminatedString));
                };
                raw.push(escaped);
            }
        }
        let bytes = escape::unescape(&raw).map_err(|kind| input.error(kind))?;
        *self = String::from_utf8(bytes).map_err(|_| input.error(ErrorKind::InvalidUtf8))?;
        Ok(())
    }

    fn write_binary(&self, out: &mut Output) -> Result<()> {
        let length: u32 = self
            .len()
            .try_into()
            .map_err(|_| out.error(ErrorKind::StringTooLong))?;
        out.write_u32_le(length);
        out.write_bytes(self.as_bytes());
        Ok(())
    }

    fn read_binary(&mut self, input: &mut Input<'_>, _options: &FromBinaryOptions) -> Result<()> {
        let length = input.read_u32_le()? as usize;
        let bytes = input.read_exact(length)?;
        *self = String::from_utf8(bytes.to_vec())
            .map_err(|_| input.error(ErrorKind::InvalidUtf8))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{from_string, to_binary, to_string};

    #[test]
    fn quoted_and_escaped() {
        // Given
        let value = "line1\nline2\t\"quoted\"".to_string();

        // When
        let compact = to_string(&value, &ToStringOptions::default()).unwrap();

        // Then
        assert_eq!(compact, "\"line1\\nline2\\t\\\"quoted\\\"\"");
        assert_eq!(from_string::<String>(&compact).unwrap(), value);
    }

    #[test]
    fn multiline_mode_preserves_line_feeds() {
        // Given
        let value = "a\nb".to_string();
        let options = ToStringOptions {
            multiline_strings: true,
            ..Default::default()
        };

        // When
        let text = to_string(&value, &options).unwrap();

        // Then - And the literal line feed still parses back.
        assert_eq!(text, "\"a\nb\"");
        assert_eq!(from_string::<String>(&text).unwrap(), value);
    }

    #[test]
    fn unterminated_strings_are_reported() {
        assert_eq!(
            from_string::<String>("\"abc").unwrap_err().kind(),
            &ErrorKind::UnterminatedString
        );
        assert_eq!(
            from_string::<String>("\"abc\\").unwrap_err().kind(),
            &ErrorKind::UnterminatedString
        );
    }

    #[test]
    fn binary_layout() {
        // Given
        let value = "hi".to_string();

        // Then - u32 LE length, then the raw bytes.
        assert_eq!(to_binary(&value).unwrap(), vec![2, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn binary_round_trip() {
        let value = "snowman \u{2603}".to_string();
        let bytes = to_binary(&value).unwrap();
        assert_eq!(crate::reflect::from_binary::<String>(&bytes).unwrap(), value);
    }

    #[test]
    fn oversized_binary_length_is_reported() {
        // Given - A length prefix far beyond the actual data.
        let bytes = [255u8, 255, 255, 127, b'x'];

        // Then
        assert_eq!(
            crate::reflect::from_binary::<String>(&bytes).unwrap_err().kind(),
            &ErrorKind::UnexpectedEnd
        );
    }
}
