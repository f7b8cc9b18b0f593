//! The text/binary input cursor.
//!
//! Wraps a byte slice with a position and a [`LocationStyle`]; every parse
//! error produced through [`Input::error`] carries the current location as a
//! prefix, either as a byte offset (binary data) or as row:column (text).

use crate::reflect::{Error, ErrorKind, Result};

/// How locations are reported in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStyle {
    /// `at byte N` - for binary data.
    ByteOffset,
    /// `at row:column` - for text.
    TextPosition,
}

/// An input stream over borrowed bytes.
pub struct Input<'a> {
    data: &'a [u8],
    position: usize,
    style: LocationStyle,
}

impl<'a> Input<'a> {
    pub fn new(data: &'a [u8], style: LocationStyle) -> Self {
        Self {
            data,
            position: 0,
            style,
        }
    }

    /// The current byte position.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the cursor is at the end of the data.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// The next byte, without advancing.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    /// Read one byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self
            .peek()
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEnd))?;
        self.position += 1;
        Ok(byte)
    }

    /// Read exactly `count` bytes.
    pub fn read_exact(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.data.len() - self.position < count {
            return Err(self.error(ErrorKind::UnexpectedEnd));
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_exact(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_byte()
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Consume `ch`, failing if the next byte is anything else.
    pub fn discard(&mut self, ch: char) -> Result<()> {
        if !self.discard_if_present(ch) {
            return Err(self.error(ErrorKind::Expected(ch)));
        }
        Ok(())
    }

    /// Consume `ch` if it is next. Returns whether it was.
    pub fn discard_if_present(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch as u8) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Extract the longest run of bytes matching `category`. Fails (naming
    /// `expected`) if the run is empty.
    pub fn extract(
        &mut self,
        expected: &'static str,
        category: impl Fn(u8) -> bool,
    ) -> Result<String> {
        let start = self.position;
        while self.peek().is_some_and(&category) {
            self.position += 1;
        }
        if self.position == start {
            return Err(self.error(ErrorKind::ExpectedCategory(expected)));
        }
        // The categories used by the readers are all ASCII.
        Ok(String::from_utf8_lossy(&self.data[start..self.position]).into_owned())
    }

    /// Extract an identifier: an alphanumeric-or-underscore run.
    pub fn extract_identifier(&mut self) -> Result<String> {
        self.extract("an identifier", |b| b.is_ascii_alphanumeric() || b == b'_')
    }

    /// Fail if any data remains at the cursor.
    pub fn expect_end(&self) -> Result<()> {
        if !self.at_end() {
            return Err(self.error(ErrorKind::TrailingJunk));
        }
        Ok(())
    }

    /// Skip whitespace, `//` line comments and `/* */` block comments.
    ///
    /// The per-type readers only call this *inside* their own syntax; leading
    /// and trailing skipping is the entry points' job.
    pub fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                self.position += 1;
            }
            match (self.peek(), self.data.get(self.position + 1).copied()) {
                (Some(b'/'), Some(b'/')) => {
                    while self.peek().is_some_and(|b| b != b'\n') {
                        self.position += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    self.position += 2;
                    while self.position < self.data.len() {
                        if self.data[self.position] == b'*'
                            && self.data.get(self.position + 1) == Some(&b'/')
                        {
                            self.position += 2;
                            break;
                        }
                        self.position += 1;
                    }
                }
                _ => return,
            }
        }
    }

    /// An error at the current location.
    pub fn error(&self, kind: ErrorKind) -> Error {
        Error::with_location(self.location(), kind)
    }

    fn location(&self) -> String {
        match self.style {
            LocationStyle::ByteOffset => format!("at byte {}", self.position),
            LocationStyle::TextPosition => {
                let mut row = 1usize;
                let mut column = 1usize;
                for &byte in &self.data[..self.position.min(self.data.len())] {
                    if byte == b'\n' {
                        row += 1;
                        column = 1;
                    } else {
                        column += 1;
                    }
                }
                format!("at {row}:{column}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_skipped() {
        // Given
        let mut input = Input::new(
            b"  // line\n /* block\n */ x",
            LocationStyle::TextPosition,
        );

        // When
        input.skip_whitespace_and_comments();

        // Then
        assert_eq!(input.peek(), Some(b'x'));
    }

    #[test]
    fn text_locations_are_row_column() {
        // Given
        let mut input = Input::new(b"ab\ncd", LocationStyle::TextPosition);
        input.read_byte().unwrap();
        input.read_byte().unwrap();
        input.read_byte().unwrap();
        input.read_byte().unwrap();

        // When
        let err = input.discard('x').unwrap_err();

        // Then
        assert_eq!(err.location(), Some("at 2:2"));
        assert_eq!(err.kind(), &ErrorKind::Expected('x'));
    }

    #[test]
    fn binary_locations_are_byte_offsets() {
        // Given
        let mut input = Input::new(b"\x01\x02", LocationStyle::ByteOffset);
        input.read_u16_le().unwrap();

        // When
        let err = input.read_byte().unwrap_err();

        // Then
        assert_eq!(err.location(), Some("at byte 2"));
    }

    #[test]
    fn extract_requires_at_least_one_byte() {
        // Given
        let mut input = Input::new(b"=", LocationStyle::TextPosition);

        // Then
        assert_eq!(
            input.extract_identifier().unwrap_err().kind(),
            &ErrorKind::ExpectedCategory("an identifier")
        );
    }
}
