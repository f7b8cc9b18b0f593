//! The output buffer used by both the text and the binary writers.

use crate::reflect::{Error, ErrorKind};

/// A growable byte buffer with text and little-endian helpers.
#[derive(Default)]
pub struct Output {
    buffer: Vec<u8>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn write_char(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.buffer.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }

    #[inline]
    pub fn write_str(&mut self, text: &str) {
        self.buffer.extend_from_slice(text.as_bytes());
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write `count` spaces (for indentation).
    pub fn write_spaces(&mut self, count: u32) {
        for _ in 0..count {
            self.buffer.push(b' ');
        }
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    #[inline]
    pub fn write_u16_le(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_u32_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// An error at the current output position.
    pub fn error(&self, kind: ErrorKind) -> Error {
        Error::with_location(format!("at byte {}", self.buffer.len()), kind)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// The buffer as a string. The text writers only ever emit UTF-8.
    pub fn into_string(self) -> String {
        String::from_utf8(self.buffer).expect("text writers emit UTF-8")
    }
}
