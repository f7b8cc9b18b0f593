//! Reflection for `Option<T>`.
//!
//! Text: `?` when empty, otherwise `:` followed by the value. Binary: a
//! one-byte flag, then the value if the flag is set.

use crate::reflect::{
    FromBinaryOptions, FromStringOptions, Input, Output, Reflect, Result, ToStringOptions,
};

impl<T: Reflect + Default> Reflect for Option<T> {
    const SHORT_REPR: bool = T::SHORT_REPR;

    fn write_text(&self, out: &mut Output, options: &ToStringOptions) -> Result<()> {
        match self {
            None => {
                out.write_char('?');
                Ok(())
            }
            Some(value) => {
                out.write_char(':');
                value.write_text(out, options)
            }
        }
    }

    fn read_text(&mut self, input: &mut Input<'_>, options: &FromStringOptions) -> Result<()> {
        if input.discard_if_present('?') {
            *self = None;
            return Ok(());
        }
        input.discard(':')?;
        input.skip_whitespace_and_comments();
        let mut value = T::default();
        value.read_text(input, options)?;
        *self = Some(value);
        Ok(())
    }

    fn write_binary(&self, out: &mut Output) -> Result<()> {
        match self {
            None => {
                false.write_binary(out)?;
                Ok(())
            }
            Some(value) => {
                true.write_binary(out)?;
                value.write_binary(out)
            }
        }
    }

    fn read_binary(&mut self, input: &mut Input<'_>, options: &FromBinaryOptions) -> Result<()> {
        let mut exists = false;
        exists.read_binary(input, options)?;
        if !exists {
            *self = None;
            return Ok(());
        }
        let mut value = T::default();
        value.read_binary(input, options)?;
        *self = Some(value);
        Ok(())
    }
}
