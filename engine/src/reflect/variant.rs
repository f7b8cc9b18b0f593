//! Reflection for tagged unions (data-carrying enums).
//!
//! Text: the variant's name, then its payload (a space separates them in
//! pretty mode). Binary: a one-byte little-endian tag - the variant's
//! declaration index - then the payload; the derive refuses enums with more
//! than 255 variants. Unit variants carry an empty braced payload; newtype
//! variants serialize as their inner value; struct variants as a field list.

use crate::reflect::{Input, Output, Result, ToStringOptions};

/// Write the variant name, with the pretty-mode separator.
pub fn write_name(out: &mut Output, options: &ToStringOptions, name: &str) {
    out.write_str(name);
    if options.pretty {
        out.write_char(' ');
    }
}

/// Read a variant name.
pub fn read_name(input: &mut Input<'_>) -> Result<String> {
    input.extract_identifier()
}

#[cfg(test)]
mod tests {
    use ember_macros::Reflect;

    use crate::reflect::{
        ErrorKind, from_binary, from_string, to_binary, to_string, ToStringOptions,
    };

    #[derive(Reflect, Debug, Default, Clone, PartialEq)]
    struct Foo {
        x: i32,
    }

    #[derive(Reflect, Debug, Default, Clone, PartialEq)]
    enum Payload {
        #[default]
        Empty,
        Foo(Foo),
        Pair {
            a: u8,
            b: u8,
        },
    }

    #[test]
    fn newtype_variant_binary_layout() {
        // Given - Foo is the variant with tag 1, holding one i32 field.
        let value = Payload::Foo(Foo { x: 0x01020304 });

        // When
        let bytes = to_binary(&value).unwrap();

        // Then - Tag byte, then the field little-endian.
        assert_eq!(bytes, vec![0x01, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(from_binary::<Payload>(&bytes).unwrap(), value);
    }

    #[test]
    fn text_forms() {
        let compact = ToStringOptions::default();
        let pretty = ToStringOptions::pretty(4);

        assert_eq!(to_string(&Payload::Empty, &compact).unwrap(), "Empty{}");
        assert_eq!(to_string(&Payload::Empty, &pretty).unwrap(), "Empty {}");
        assert_eq!(
            to_string(&Payload::Foo(Foo { x: 7 }), &compact).unwrap(),
            "Foo{x=7}"
        );
        assert_eq!(
            to_string(&Payload::Foo(Foo { x: 7 }), &pretty).unwrap(),
            "Foo {x = 7}"
        );
        assert_eq!(
            to_string(&Payload::Pair { a: 1, b: 2 }, &compact).unwrap(),
            "Pair{a=1,b=2}"
        );
    }

    #[test]
    fn text_round_trip() {
        for value in [
            Payload::Empty,
            Payload::Foo(Foo { x: -3 }),
            Payload::Pair { a: 9, b: 10 },
        ] {
            let text = to_string(&value, &ToStringOptions::pretty(4)).unwrap();
            assert_eq!(from_string::<Payload>(&text).unwrap(), value);
        }
    }

    #[test]
    fn unknown_variant_name_is_reported() {
        assert_eq!(
            from_string::<Payload>("Quux{}").unwrap_err().kind(),
            &ErrorKind::UnknownVariant("Quux".into())
        );
    }

    #[test]
    fn out_of_range_tag_is_reported() {
        assert_eq!(
            from_binary::<Payload>(&[9]).unwrap_err().kind(),
            &ErrorKind::VariantIndexOutOfRange(9)
        );
    }
}
