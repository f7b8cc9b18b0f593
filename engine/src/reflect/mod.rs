//! Reflection and serialization.
//!
//! Every reflected type supports the same four operations - to text, from
//! text, to binary, from binary - through the [`Reflect`] trait. The built-in
//! implementations cover the arithmetic types, `bool`, `String`, `Option`,
//! `Vec`, `BTreeSet` and [`poly::PolyStorage`]; `#[derive(Reflect)]` extends
//! the protocol to structs (field lists), fieldless enums (name tables) and
//! data-carrying enums (tagged unions).
//!
//! # Entry points
//!
//! The functions in this module ([`to_string`], [`from_string`],
//! [`to_binary`], [`from_binary`]) are the intended surface. The readers
//! among them skip leading/trailing whitespace and comments and verify that
//! the whole input was consumed; the trait methods themselves never do either,
//! so nested readers compose without re-scanning.

pub mod enums;
pub mod poly;
pub mod structs;
pub mod variant;

mod container;
mod error;
mod escape;
mod input;
mod optional;
mod options;
mod output;
mod scalar;
mod string;

pub use error::{Error, ErrorKind};
pub use input::{Input, LocationStyle};
pub use options::{FromBinaryOptions, FromStringOptions, ToStringOptions};
pub use output::Output;
pub use poly::PolyStorage;

/// Re-export of the derive macro, so `use ember_engine::reflect::Reflect`
/// brings both the trait and the derive into scope.
pub use ember_macros::Reflect;

/// Convenience alias used across the serialization surface.
pub type Result<T> = std::result::Result<T, Error>;

/// The uniform serialization protocol.
///
/// Implementations must not skip whitespace around their own syntax (the
/// entry points and the compound readers handle that), and must not check for
/// end of input (only the entry points know where the end is).
pub trait Reflect: 'static {
    /// True for types whose textual form is short enough that pretty-printed
    /// containers and field lists keep them on a single line.
    const SHORT_REPR: bool = false;

    fn write_text(&self, out: &mut Output, options: &ToStringOptions) -> Result<()>;

    fn read_text(&mut self, input: &mut Input<'_>, options: &FromStringOptions) -> Result<()>;

    fn write_binary(&self, out: &mut Output) -> Result<()>;

    fn read_binary(&mut self, input: &mut Input<'_>, options: &FromBinaryOptions) -> Result<()>;
}

/// Serialize a value to its textual form.
pub fn to_string<T: Reflect>(value: &T, options: &ToStringOptions) -> Result<String> {
    let mut out = Output::new();
    value.write_text(&mut out, options)?;
    Ok(out.into_string())
}

/// Parse a value from text. The input may be padded with whitespace and
/// comments, but must contain nothing else.
pub fn from_string<T: Reflect + Default>(text: &str) -> Result<T> {
    from_string_with(text, &FromStringOptions::default())
}

/// [`from_string`] with explicit options.
pub fn from_string_with<T: Reflect + Default>(
    text: &str,
    options: &FromStringOptions,
) -> Result<T> {
    let mut value = T::default();
    from_string_into(&mut value, text, options)?;
    Ok(value)
}

/// Parse from text into an existing value.
pub fn from_string_into<T: Reflect>(
    value: &mut T,
    text: &str,
    options: &FromStringOptions,
) -> Result<()> {
    let mut input = Input::new(text.as_bytes(), LocationStyle::TextPosition);
    input.skip_whitespace_and_comments();
    value.read_text(&mut input, options)?;
    input.skip_whitespace_and_comments();
    input.expect_end()
}

/// Serialize a value to its binary form.
pub fn to_binary<T: Reflect>(value: &T) -> Result<Vec<u8>> {
    let mut out = Output::new();
    value.write_binary(&mut out)?;
    Ok(out.into_bytes())
}

/// Parse a value from its binary form. The input must contain nothing else.
pub fn from_binary<T: Reflect + Default>(bytes: &[u8]) -> Result<T> {
    from_binary_with(bytes, &FromBinaryOptions::default())
}

/// [`from_binary`] with explicit options.
pub fn from_binary_with<T: Reflect + Default>(
    bytes: &[u8],
    options: &FromBinaryOptions,
) -> Result<T> {
    let mut value = T::default();
    from_binary_into(&mut value, bytes, options)?;
    Ok(value)
}

/// Parse from binary into an existing value.
pub fn from_binary_into<T: Reflect>(
    value: &mut T,
    bytes: &[u8],
    options: &FromBinaryOptions,
) -> Result<()> {
    let mut input = Input::new(bytes, LocationStyle::ByteOffset);
    value.read_binary(&mut input, options)?;
    input.expect_end()
}
