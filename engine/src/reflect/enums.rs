//! Reflection for plain (fieldless) enums.
//!
//! The derive builds an [`EnumHelper`] holding two sorted tables - values to
//! names and names to values - and routes the four operations through the
//! functions here. A *relaxed* enum (`#[reflect(relaxed)]`) additionally
//! accepts numeric spellings of its values in text form: if the next
//! character is a digit or a sign, the reader parses an integer and maps it
//! back through the value table. Values with no named counterpart are not
//! representable in a Rust enum, so they are an error in either direction.

use crate::reflect::{
    ErrorKind, FromBinaryOptions, FromStringOptions, Input, Output, Reflect, Result,
    ToStringOptions,
};

/// The name/value tables of one reflected enum. Lookup is binary search.
pub struct EnumHelper<R> {
    values_to_names: Vec<(R, &'static str)>,
    names_to_values: Vec<(&'static str, R)>,
    relaxed: bool,
}

impl<R: Copy + Ord> EnumHelper<R> {
    pub fn new(entries: Vec<(R, &'static str)>, relaxed: bool) -> Self {
        let mut values_to_names = entries.clone();
        values_to_names.sort_by(|a, b| a.0.cmp(&b.0));

        let mut names_to_values: Vec<(&'static str, R)> =
            entries.into_iter().map(|(value, name)| (name, value)).collect();
        names_to_values.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            values_to_names,
            names_to_values,
            relaxed,
        }
    }

    /// Whether numeric spellings are accepted when deserializing.
    pub fn is_relaxed(&self) -> bool {
        self.relaxed
    }

    pub fn value_to_name(&self, value: R) -> Option<&'static str> {
        self.values_to_names
            .binary_search_by(|(v, _)| v.cmp(&value))
            .ok()
            .map(|index| self.values_to_names[index].1)
    }

    pub fn name_to_value(&self, name: &str) -> Option<R> {
        self.names_to_values
            .binary_search_by(|(n, _)| (*n).cmp(name))
            .ok()
            .map(|index| self.names_to_values[index].1)
    }
}

/// Implemented by the derive for fieldless enums.
pub trait ReflectEnum: Sized + 'static {
    /// The underlying integer type, from `#[repr(...)]` (default `i32`).
    type Repr: Reflect + Default + Copy + Ord + std::fmt::Display;

    fn helper() -> &'static EnumHelper<Self::Repr>;
    fn to_repr(&self) -> Self::Repr;
    fn from_repr(value: Self::Repr) -> Option<Self>;
}

pub fn write_text<E: ReflectEnum>(
    value: &E,
    out: &mut Output,
    options: &ToStringOptions,
) -> Result<()> {
    let helper = E::helper();
    let repr = value.to_repr();
    match helper.value_to_name(repr) {
        Some(name) => {
            out.write_str(name);
            Ok(())
        }
        // A Rust enum value always has a name; this arm mirrors the relaxed
        // write rule for completeness.
        None if helper.is_relaxed() => repr.write_text(out, options),
        None => Err(out.error(ErrorKind::InvalidEnumValue(repr.to_string()))),
    }
}

pub fn read_text<E: ReflectEnum>(
    value: &mut E,
    input: &mut Input<'_>,
    options: &FromStringOptions,
) -> Result<()> {
    let helper = E::helper();

    if helper.is_relaxed()
        && input
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || b == b'+' || b == b'-')
    {
        let mut repr = E::Repr::default();
        repr.read_text(input, options)?;
        match E::from_repr(repr) {
            Some(parsed) => *value = parsed,
            None => return Err(input.error(ErrorKind::InvalidEnumValue(repr.to_string()))),
        }
        return Ok(());
    }

    let name = input.extract_identifier()?;
    match helper.name_to_value(&name).and_then(E::from_repr) {
        Some(parsed) => {
            *value = parsed;
            Ok(())
        }
        None => Err(input.error(ErrorKind::UnknownEnumerator(name))),
    }
}

pub fn write_binary<E: ReflectEnum>(value: &E, out: &mut Output) -> Result<()> {
    let repr = value.to_repr();
    if !E::helper().is_relaxed() && E::helper().value_to_name(repr).is_none() {
        return Err(out.error(ErrorKind::InvalidEnumValue(repr.to_string())));
    }
    repr.write_binary(out)
}

pub fn read_binary<E: ReflectEnum>(
    value: &mut E,
    input: &mut Input<'_>,
    options: &FromBinaryOptions,
) -> Result<()> {
    let mut repr = E::Repr::default();
    repr.read_binary(input, options)?;
    match E::from_repr(repr) {
        Some(parsed) => {
            *value = parsed;
            Ok(())
        }
        None => Err(input.error(ErrorKind::InvalidEnumValue(repr.to_string()))),
    }
}
