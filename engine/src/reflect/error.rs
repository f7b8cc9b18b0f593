use std::fmt;

use thiserror::Error as ThisError;

/// A serialization error: what went wrong, prefixed with where in the stream
/// it happened when a location is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    location: Option<String>,
    kind: ErrorKind,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            location: None,
            kind,
        }
    }

    pub fn with_location(location: String, kind: ErrorKind) -> Self {
        Self {
            location: Some(location),
            kind,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{location}: {}", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// The kinds of serialization failures.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected junk at the end of input")]
    TrailingJunk,
    #[error("expected `{0}`")]
    Expected(char),
    #[error("expected {0}")]
    ExpectedCategory(&'static str),

    #[error("malformed number `{0}`")]
    MalformedNumber(String),
    #[error("malformed boolean `{0}`")]
    MalformedBool(String),
    #[error("invalid boolean byte {0}")]
    InvalidBoolByte(u8),

    #[error("unterminated string")]
    UnterminatedString,
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(String),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("the string is too long to be saved")]
    StringTooLong,

    #[error("the container is too long")]
    ContainerTooLong,

    #[error("unknown enumerator `{0}`")]
    UnknownEnumerator(String),
    #[error("invalid enum value {0}")]
    InvalidEnumValue(String),

    #[error("unknown variant name `{0}`")]
    UnknownVariant(String),
    #[error("variant index {0} is out of range")]
    VariantIndexOutOfRange(u8),

    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("duplicate field `{0}`")]
    DuplicateField(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unknown polymorphic class name `{0}`")]
    UnknownClassName(String),
    #[error("polymorphic class index {0} is invalid")]
    InvalidClassIndex(u16),
    #[error("class `{0}` is not registered as polymorphic")]
    UnregisteredClass(&'static str),
}
