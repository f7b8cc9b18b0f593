/// Options for the textual writers.
#[derive(Debug, Clone, Copy)]
pub struct ToStringOptions {
    /// Add extra spaces for readability, and make containers and structs with
    /// long-representation contents multiline (with trailing commas).
    pub pretty: bool,

    /// Preserve line feeds when printing strings. Otherwise they are escaped
    /// as `\n`.
    pub multiline_strings: bool,

    /// Indentation step.
    pub indent: u32,

    /// Extra indentation at the beginning of each line except the first one.
    /// Intended for internal use by nested emitters.
    pub extra_indent: u32,
}

impl Default for ToStringOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            multiline_strings: false,
            indent: 4,
            extra_indent: 0,
        }
    }
}

impl ToStringOptions {
    /// Pretty-printing options with the given indentation step.
    pub fn pretty(indent: u32) -> Self {
        Self {
            pretty: true,
            indent,
            ..Self::default()
        }
    }

    /// The options a nested emitter inherits: one indentation step deeper
    /// when pretty-printing.
    pub(crate) fn nested(&self) -> Self {
        let mut next = *self;
        if self.pretty {
            next.extra_indent += self.indent;
        }
        next
    }
}

/// Options for the textual readers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FromStringOptions {
    /// When parsing a struct, don't complain about missing fields.
    pub ignore_missing_fields: bool,
}

/// Options for the binary readers.
#[derive(Debug, Clone, Copy)]
pub struct FromBinaryOptions {
    /// `reserve()` calls are capped at this many bytes. This keeps malformed
    /// length prefixes from allocating large amounts of temporary memory.
    pub max_reserved_size: usize,
}

impl Default for FromBinaryOptions {
    fn default() -> Self {
        Self {
            max_reserved_size: 1024 * 1024,
        }
    }
}
