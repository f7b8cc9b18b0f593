//! Reflection for sequence containers (`Vec`, `BTreeSet`).
//!
//! Text: `[a, b, c]`. Pretty-printing puts one element per line with trailing
//! commas, unless the element type has a short representation, in which case
//! the whole container stays on one line. Binary: a little-endian u32 length
//! prefix, then the elements back to back; on read the reservation implied by
//! the prefix is capped by `FromBinaryOptions::max_reserved_size`.

use std::collections::BTreeSet;

use crate::reflect::{
    ErrorKind, FromBinaryOptions, FromStringOptions, Input, Output, Reflect, Result,
    ToStringOptions,
};

fn write_seq_text<'a, T: Reflect + 'a>(
    items: impl ExactSizeIterator<Item = &'a T>,
    out: &mut Output,
    options: &ToStringOptions,
) -> Result<()> {
    let force_single_line = T::SHORT_REPR;

    out.write_char('[');
    let nested = options.nested();
    let size = items.len();

    for (index, elem) in items.enumerate() {
        if options.pretty && !force_single_line {
            out.write_char('\n');
            out.write_spaces(nested.extra_indent);
        }

        elem.write_text(out, &nested)?;

        if index != size - 1 || (options.pretty && !force_single_line) {
            out.write_char(',');
            if options.pretty && force_single_line {
                out.write_char(' ');
            }
        }
    }

    if options.pretty && !force_single_line && size > 0 {
        out.write_char('\n');
        out.write_spaces(options.extra_indent);
    }

    out.write_char(']');
    Ok(())
}

fn read_seq_text<T: Reflect + Default>(
    input: &mut Input<'_>,
    options: &FromStringOptions,
    mut push: impl FnMut(T),
) -> Result<()> {
    input.discard('[')?;
    loop {
        input.skip_whitespace_and_comments();
        if input.discard_if_present(']') {
            break;
        }

        let mut elem = T::default();
        elem.read_text(input, options)?;
        push(elem);

        input.skip_whitespace_and_comments();
        if !input.discard_if_present(',') {
            input.discard(']')?;
            break;
        }
    }
    Ok(())
}

fn write_seq_binary<'a, T: Reflect + 'a>(
    length: usize,
    items: impl Iterator<Item = &'a T>,
    out: &mut Output,
) -> Result<()> {
    let length: u32 = length
        .try_into()
        .map_err(|_| out.error(ErrorKind::ContainerTooLong))?;
    out.write_u32_le(length);
    for elem in items {
        elem.write_binary(out)?;
    }
    Ok(())
}

/// The capped reservation implied by a length prefix: a forged prefix must
/// not translate into a huge allocation. The element reads fail on truncated
/// data anyway.
fn capped_reservation<T>(length: usize, options: &FromBinaryOptions) -> usize {
    let max_reserved_elems = options.max_reserved_size / size_of::<T>().max(1);
    length.min(max_reserved_elems)
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn write_text(&self, out: &mut Output, options: &ToStringOptions) -> Result<()> {
        write_seq_text(self.iter(), out, options)
    }

    fn read_text(&mut self, input: &mut Input<'_>, options: &FromStringOptions) -> Result<()> {
        self.clear();
        read_seq_text(input, options, |elem| self.push(elem))
    }

    fn write_binary(&self, out: &mut Output) -> Result<()> {
        write_seq_binary(self.len(), self.iter(), out)
    }

    fn read_binary(&mut self, input: &mut Input<'_>, options: &FromBinaryOptions) -> Result<()> {
        let length = input.read_u32_le()? as usize;
        self.clear();
        self.reserve(capped_reservation::<T>(length, options));
        for _ in 0..length {
            let mut elem = T::default();
            elem.read_binary(input, options)?;
            self.push(elem);
        }
        Ok(())
    }
}

impl<T: Reflect + Default + Ord> Reflect for BTreeSet<T> {
    fn write_text(&self, out: &mut Output, options: &ToStringOptions) -> Result<()> {
        write_seq_text(self.iter(), out, options)
    }

    fn read_text(&mut self, input: &mut Input<'_>, options: &FromStringOptions) -> Result<()> {
        self.clear();
        // Duplicate elements collapse, as inserts into a set do.
        read_seq_text(input, options, |elem| {
            self.insert(elem);
        })
    }

    fn write_binary(&self, out: &mut Output) -> Result<()> {
        write_seq_binary(self.len(), self.iter(), out)
    }

    fn read_binary(&mut self, input: &mut Input<'_>, options: &FromBinaryOptions) -> Result<()> {
        // Sets have no capacity to reserve.
        let length = input.read_u32_le()? as usize;
        self.clear();
        for _ in 0..length {
            let mut elem = T::default();
            elem.read_binary(input, options)?;
            self.insert(elem);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{from_binary, from_binary_with, from_string, to_binary, to_string};

    #[test]
    fn compact_text() {
        let value = vec![1i32, 2, 3];
        let text = to_string(&value, &ToStringOptions::default()).unwrap();
        assert_eq!(text, "[1,2,3]");
        assert_eq!(from_string::<Vec<i32>>(&text).unwrap(), value);
    }

    #[test]
    fn pretty_short_elements_stay_on_one_line() {
        let value = vec![1i32, 2, 3];
        let text = to_string(&value, &ToStringOptions::pretty(4)).unwrap();
        assert_eq!(text, "[1, 2, 3]");
    }

    #[test]
    fn pretty_long_elements_go_multiline() {
        // Given - Strings don't have a short representation.
        let value = vec!["a".to_string(), "b".to_string()];

        // When
        let text = to_string(&value, &ToStringOptions::pretty(4)).unwrap();

        // Then - One per line, trailing commas.
        assert_eq!(text, "[\n    \"a\",\n    \"b\",\n]");
        assert_eq!(from_string::<Vec<String>>(&text).unwrap(), value);
    }

    #[test]
    fn trailing_comma_and_spacing_are_accepted() {
        assert_eq!(
            from_string::<Vec<i32>>("[ 1 , 2 , 3 , ]").unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(from_string::<Vec<i32>>("[]").unwrap(), Vec::<i32>::new());
        assert_eq!(
            from_string::<Vec<i32>>("[/* none */]").unwrap(),
            Vec::<i32>::new()
        );
    }

    #[test]
    fn binary_layout() {
        let value = vec![1u16, 2];
        assert_eq!(to_binary(&value).unwrap(), vec![2, 0, 0, 0, 1, 0, 2, 0]);
        assert_eq!(from_binary::<Vec<u16>>(&[2, 0, 0, 0, 1, 0, 2, 0]).unwrap(), value);
    }

    #[test]
    fn forged_length_fails_without_allocating() {
        // Given - A length prefix claiming ~4 billion elements.
        let bytes = [255u8, 255, 255, 255];
        let options = FromBinaryOptions {
            max_reserved_size: 64,
        };

        // Then - The read fails on missing data, not on memory.
        assert_eq!(
            from_binary_with::<Vec<u64>>(&bytes, &options)
                .unwrap_err()
                .kind(),
            &ErrorKind::UnexpectedEnd
        );
    }

    #[test]
    fn sets_collapse_duplicates() {
        let set = from_string::<BTreeSet<i32>>("[3,1,3,2]").unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn nested_containers() {
        let value = vec![vec![1u8], vec![2, 3]];
        let text = to_string(&value, &ToStringOptions::default()).unwrap();
        assert_eq!(text, "[[1],[2,3]]");
        assert_eq!(from_string::<Vec<Vec<u8>>>(&text).unwrap(), value);

        let bytes = to_binary(&value).unwrap();
        assert_eq!(from_binary::<Vec<Vec<u8>>>(&bytes).unwrap(), value);
    }
}
