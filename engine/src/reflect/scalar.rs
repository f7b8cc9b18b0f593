//! Reflection for the arithmetic types and `bool`.
//!
//! Text: integers accept decimal and `0x` hex spellings with optional `'`
//! digit separators; floats additionally accept `.`, exponents, `inf` and
//! `nan`. Binary: little-endian, native width; bool is one byte, 0 or 1.

use crate::reflect::{
    ErrorKind, FromBinaryOptions, FromStringOptions, Input, Output, Reflect, Result,
    ToStringOptions,
};

const DIGIT_SEPARATOR: char = '\'';

fn int_byte_category(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'-' || byte == DIGIT_SEPARATOR as u8
}

fn float_byte_category(byte: u8) -> bool {
    int_byte_category(byte) || byte == b'.'
}

/// Strip digit separators and split off a leading sign.
fn normalize_int_token(token: &str) -> (&'static str, String) {
    let cleaned: String = token.chars().filter(|ch| *ch != DIGIT_SEPARATOR).collect();
    if let Some(rest) = cleaned.strip_prefix('-') {
        ("-", rest.to_string())
    } else if let Some(rest) = cleaned.strip_prefix('+') {
        ("", rest.to_string())
    } else {
        ("", cleaned)
    }
}

macro_rules! reflect_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                const SHORT_REPR: bool = true;

                fn write_text(&self, out: &mut Output, _options: &ToStringOptions) -> Result<()> {
                    out.write_str(&self.to_string());
                    Ok(())
                }

                fn read_text(
                    &mut self,
                    input: &mut Input<'_>,
                    _options: &FromStringOptions,
                ) -> Result<()> {
                    let token = input.extract("an integer", int_byte_category)?;
                    let (sign, digits) = normalize_int_token(&token);
                    let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                        Some(hex) => <$ty>::from_str_radix(&format!("{sign}{hex}"), 16),
                        None => <$ty>::from_str_radix(&format!("{sign}{digits}"), 10),
                    };
                    match parsed {
                        Ok(value) => {
                            *self = value;
                            Ok(())
                        }
                        Err(_) => Err(input.error(ErrorKind::MalformedNumber(token))),
                    }
                }

                fn write_binary(&self, out: &mut Output) -> Result<()> {
                    out.write_bytes(&self.to_le_bytes());
                    Ok(())
                }

                fn read_binary(
                    &mut self,
                    input: &mut Input<'_>,
                    _options: &FromBinaryOptions,
                ) -> Result<()> {
                    *self = <$ty>::from_le_bytes(input.read_array()?);
                    Ok(())
                }
            }
        )*
    };
}

reflect_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! reflect_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                const SHORT_REPR: bool = true;

                fn write_text(&self, out: &mut Output, _options: &ToStringOptions) -> Result<()> {
                    // `Display` for floats is the shortest representation that
                    // round-trips, and spells the specials `inf` and `NaN`.
                    out.write_str(&self.to_string());
                    Ok(())
                }

                fn read_text(
                    &mut self,
                    input: &mut Input<'_>,
                    _options: &FromStringOptions,
                ) -> Result<()> {
                    let token = input.extract("a real number", float_byte_category)?;
                    let cleaned: String =
                        token.chars().filter(|ch| *ch != DIGIT_SEPARATOR).collect();
                    match cleaned.parse::<$ty>() {
                        Ok(value) => {
                            *self = value;
                            Ok(())
                        }
                        Err(_) => Err(input.error(ErrorKind::MalformedNumber(token))),
                    }
                }

                fn write_binary(&self, out: &mut Output) -> Result<()> {
                    out.write_bytes(&self.to_le_bytes());
                    Ok(())
                }

                fn read_binary(
                    &mut self,
                    input: &mut Input<'_>,
                    _options: &FromBinaryOptions,
                ) -> Result<()> {
                    *self = <$ty>::from_le_bytes(input.read_array()?);
                    Ok(())
                }
            }
        )*
    };
}

reflect_float!(f32, f64);

impl Reflect for bool {
    const SHORT_REPR: bool = true;

    fn write_text(&self, out: &mut Output, _options: &ToStringOptions) -> Result<()> {
        out.write_str(if *self { "true" } else { "false" });
        Ok(())
    }

    fn read_text(&mut self, input: &mut Input<'_>, options: &FromStringOptions) -> Result<()> {
        // `true` / `false`, with an integral fallback.
        if input
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || b == b'+' || b == b'-')
        {
            let mut value = 0i64;
            value.read_text(input, options)?;
            *self = value != 0;
            return Ok(());
        }
        let token = input.extract("a boolean", |b| b.is_ascii_alphanumeric())?;
        *self = match token.as_str() {
            "true" => true,
            "false" => false,
            _ => return Err(input.error(ErrorKind::MalformedBool(token))),
        };
        Ok(())
    }

    fn write_binary(&self, out: &mut Output) -> Result<()> {
        out.write_u8(*self as u8);
        Ok(())
    }

    fn read_binary(&mut self, input: &mut Input<'_>, _options: &FromBinaryOptions) -> Result<()> {
        *self = match input.read_u8()? {
            0 => false,
            1 => true,
            other => return Err(input.error(ErrorKind::InvalidBoolByte(other))),
        };
        Ok(())
    }
}
