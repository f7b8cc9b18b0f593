//! Reflection for aggregates.
//!
//! The derive walks the fields in declaration order and routes the textual
//! forms through the helpers here. An aggregate's text form is a braced field
//! list: `{x=1,y=2}` compact, `{x = 1, y = 2}` pretty when every field has a
//! short representation, otherwise one field per line with trailing commas.
//! The binary form is simply every field in declaration order, no separators.
//!
//! Fields marked `#[reflect(optional)]` may be absent when deserializing;
//! they keep their current value.

use crate::reflect::{
    ErrorKind, FromStringOptions, Input, Output, Reflect, Result, ToStringOptions,
};

/// Metadata for a single reflected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: &'static str,
    pub optional: bool,
}

/// Metadata for a reflected aggregate: its name and ordered field table.
#[derive(Debug, Clone, Copy)]
pub struct StructDescriptor {
    pub name: &'static str,
    pub fields: &'static [FieldInfo],
}

/// Implemented by the derive for structs. The descriptor is what the
/// polymorphic registry and the by-name tooling consume.
pub trait ReflectStruct: Reflect {
    const DESCRIPTOR: StructDescriptor;
}

/// A borrowed writer for one field's value.
pub type FieldWriter<'s> = &'s mut dyn FnMut(&mut Output, &ToStringOptions) -> Result<()>;

/// A borrowed reader for one field's value.
pub type FieldReader<'s> = &'s mut dyn FnMut(&mut Input<'_>, &FromStringOptions) -> Result<()>;

/// Write a braced field list.
pub fn write_text_fields(
    out: &mut Output,
    options: &ToStringOptions,
    all_short: bool,
    fields: &mut [(&'static str, FieldWriter<'_>)],
) -> Result<()> {
    out.write_char('{');
    let nested = options.nested();
    let count = fields.len();

    for (index, (name, write)) in fields.iter_mut().enumerate() {
        if options.pretty && !all_short {
            out.write_char('\n');
            out.write_spaces(nested.extra_indent);
        }

        out.write_str(name);
        out.write_str(if options.pretty { " = " } else { "=" });
        write(out, &nested)?;

        if index != count - 1 || (options.pretty && !all_short) {
            out.write_char(',');
            if options.pretty && all_short {
                out.write_char(' ');
            }
        }
    }

    if options.pretty && !all_short && count > 0 {
        out.write_char('\n');
        out.write_spaces(options.extra_indent);
    }

    out.write_char('}');
    Ok(())
}

/// Read a braced field list. Fields may appear in any order; unknown and
/// duplicate names fail, and so do missing non-optional fields (unless
/// `ignore_missing_fields` is set).
pub fn read_text_fields(
    input: &mut Input<'_>,
    options: &FromStringOptions,
    descriptor: &StructDescriptor,
    fields: &mut [FieldReader<'_>],
) -> Result<()> {
    debug_assert_eq!(descriptor.fields.len(), fields.len());

    input.discard('{')?;
    let mut seen = vec![false; fields.len()];
    loop {
        input.skip_whitespace_and_comments();
        if input.discard_if_present('}') {
            break;
        }

        let name = input.extract_identifier()?;
        let index = match descriptor.fields.iter().position(|f| f.name == name) {
            Some(index) => index,
            None => return Err(input.error(ErrorKind::UnknownField(name))),
        };
        if seen[index] {
            return Err(input.error(ErrorKind::DuplicateField(name)));
        }
        seen[index] = true;

        input.skip_whitespace_and_comments();
        input.discard('=')?;
        input.skip_whitespace_and_comments();
        fields[index](input, options)?;

        input.skip_whitespace_and_comments();
        if !input.discard_if_present(',') {
            input.discard('}')?;
            break;
        }
    }

    if !options.ignore_missing_fields {
        for (field, was_seen) in descriptor.fields.iter().zip(&seen) {
            if !was_seen && !field.optional {
                return Err(input.error(ErrorKind::MissingField(field.name)));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ember_macros::Reflect;

    use super::*;
    use crate::reflect::{from_binary, from_string, from_string_with, to_binary, to_string};

    #[derive(Reflect, Debug, Default, Clone, PartialEq)]
    struct Sprite {
        angle: f64,
        frame: u32,
    }

    #[derive(Reflect, Debug, Default, Clone, PartialEq)]
    struct Config {
        title: String,
        #[reflect(optional)]
        scale: f32,
    }

    #[derive(Reflect, Debug, Default, Clone, PartialEq)]
    struct Outer {
        sprite: Sprite,
        tags: Vec<u8>,
    }

    #[test]
    fn descriptor_reports_the_field_table() {
        // Given
        let descriptor = <Config as ReflectStruct>::DESCRIPTOR;

        // Then
        assert_eq!(descriptor.name, "Config");
        assert_eq!(
            descriptor.fields,
            &[
                FieldInfo {
                    name: "title",
                    optional: false,
                },
                FieldInfo {
                    name: "scale",
                    optional: true,
                },
            ]
        );
    }

    #[test]
    fn compact_text() {
        let value = Sprite {
            angle: 0.5,
            frame: 3,
        };
        let text = to_string(&value, &ToStringOptions::default()).unwrap();
        assert_eq!(text, "{angle=0.5,frame=3}");
        assert_eq!(from_string::<Sprite>(&text).unwrap(), value);
    }

    #[test]
    fn pretty_short_fields_stay_on_one_line() {
        let value = Sprite {
            angle: 0.5,
            frame: 3,
        };
        let text = to_string(&value, &ToStringOptions::pretty(4)).unwrap();
        assert_eq!(text, "{angle = 0.5, frame = 3}");
        assert_eq!(from_string::<Sprite>(&text).unwrap(), value);
    }

    #[test]
    fn pretty_long_fields_go_multiline() {
        // Given - A String field forces the multiline layout.
        let value = Config {
            title: "demo".into(),
            scale: 2.0,
        };

        // When
        let text = to_string(&value, &ToStringOptions::pretty(4)).unwrap();

        // Then
        assert_eq!(text, "{\n    title = \"demo\",\n    scale = 2,\n}");
        assert_eq!(from_string::<Config>(&text).unwrap(), value);
    }

    #[test]
    fn fields_parse_in_any_order() {
        let value = from_string::<Sprite>("{frame=3, angle=0.5}").unwrap();
        assert_eq!(
            value,
            Sprite {
                angle: 0.5,
                frame: 3,
            }
        );
    }

    #[test]
    fn field_errors() {
        assert_eq!(
            from_string::<Sprite>("{angle=1,spin=2}").unwrap_err().kind(),
            &ErrorKind::UnknownField("spin".into())
        );
        assert_eq!(
            from_string::<Sprite>("{angle=1,angle=2}").unwrap_err().kind(),
            &ErrorKind::DuplicateField("angle".into())
        );
        assert_eq!(
            from_string::<Sprite>("{angle=1}").unwrap_err().kind(),
            &ErrorKind::MissingField("frame")
        );
    }

    #[test]
    fn optional_fields_may_be_elided() {
        // Given - `scale` is optional, `title` is not.
        let value = from_string::<Config>("{title=\"x\"}").unwrap();
        assert_eq!(value.scale, 0.0);

        // And - The ignore-missing option silences the rest too.
        let relaxed = from_string_with::<Config>(
            "{}",
            &FromStringOptions {
                ignore_missing_fields: true,
            },
        )
        .unwrap();
        assert_eq!(relaxed, Config::default());
    }

    #[test]
    fn binary_fields_in_declaration_order() {
        // Given
        let value = Sprite {
            angle: 1.0,
            frame: 2,
        };

        // When
        let bytes = to_binary(&value).unwrap();

        // Then - f64 little-endian, then u32 little-endian, no separators.
        let mut expected = 1.0f64.to_le_bytes().to_vec();
        expected.extend_from_slice(&2u32.to_le_bytes());
        assert_eq!(bytes, expected);
        assert_eq!(from_binary::<Sprite>(&bytes).unwrap(), value);
    }

    #[test]
    fn nested_aggregates_round_trip() {
        // Given
        let value = Outer {
            sprite: Sprite {
                angle: -2.5,
                frame: 9,
            },
            tags: vec![1, 2, 3],
        };

        // Then - Both encodings round-trip, pretty included.
        for options in [ToStringOptions::default(), ToStringOptions::pretty(2)] {
            let text = to_string(&value, &options).unwrap();
            assert_eq!(from_string::<Outer>(&text).unwrap(), value);
        }
        let bytes = to_binary(&value).unwrap();
        assert_eq!(from_binary::<Outer>(&bytes).unwrap(), value);
    }

    #[test]
    fn binary_output_is_reproducible() {
        let value = Outer {
            sprite: Sprite {
                angle: 0.25,
                frame: 1,
            },
            tags: vec![7],
        };
        assert_eq!(to_binary(&value).unwrap(), to_binary(&value).unwrap());
    }
}
