//! Configuration options for parsing and writing.
//!
//! - [`Limits`]: resource bounds applied by every parser and by the event engine
//! - [`CsvOptions`]: delimiter, line ending and type deduction for CSV/TSV
//! - [`Delimiter`]: field separator choice (comma, tab, or pipe)
//!
//! ## Examples
//!
//! ```rust
//! use valuestream::{from_csv_with_options, CsvOptions, Delimiter};
//!
//! let options = CsvOptions::new().with_delimiter(Delimiter::Pipe);
//! let rows = from_csv_with_options("a|b\n1|2\n", &options).unwrap();
//! assert_eq!(rows.as_array().map(Vec::len), Some(2));
//! ```

/// Field separator for delimited text.
///
/// # Examples
///
/// ```rust
/// use valuestream::Delimiter;
///
/// assert_eq!(Delimiter::Comma.as_str(), ",");
/// assert_eq!(Delimiter::Tab.as_str(), "\t");
/// assert_eq!(Delimiter::Pipe.as_str(), "|");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Pipe,
}

impl Delimiter {
    /// Returns the string representation of this delimiter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Delimiter::Comma => ",",
            Delimiter::Tab => "\t",
            Delimiter::Pipe => "|",
        }
    }

    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }
}

/// Row terminator written by the CSV writer. The reader accepts both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Options for CSV and TSV.
///
/// # Examples
///
/// ```rust
/// use valuestream::{CsvOptions, Delimiter, LineEnding};
///
/// let options = CsvOptions::tsv()
///     .with_line_ending(LineEnding::CrLf)
///     .with_deduce_types(false);
/// assert_eq!(options.delimiter, Delimiter::Tab);
/// ```
#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: Delimiter,
    pub line_ending: LineEnding,
    /// Turn unquoted fields that look like numbers, booleans or nothing into
    /// typed values instead of strings.
    pub deduce_types: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: Delimiter::default(),
            line_ending: LineEnding::default(),
            deduce_types: true,
        }
    }
}

impl CsvOptions {
    /// Comma-separated, LF line endings, type deduction on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tab-separated defaults.
    #[must_use]
    pub fn tsv() -> Self {
        CsvOptions {
            delimiter: Delimiter::Tab,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    #[must_use]
    pub fn with_deduce_types(mut self, deduce_types: bool) -> Self {
        self.deduce_types = deduce_types;
        self
    }
}

/// Resource bounds for parsing and streaming.
///
/// # Examples
///
/// ```rust
/// use valuestream::{from_json_with_limits, ErrorKind, Limits};
///
/// let limits = Limits::new().with_max_depth(2);
/// assert!(from_json_with_limits("[[1]]", &limits).is_ok());
/// let err = from_json_with_limits("[[[1]]]", &limits).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::Range);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Deepest container nesting accepted.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_depth: 8192 }
    }
}

impl Limits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No nesting bound beyond available memory.
    #[must_use]
    pub fn unlimited() -> Self {
        Limits {
            max_depth: usize::MAX,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
