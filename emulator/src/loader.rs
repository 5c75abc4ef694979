//! Program file loading.
//!
//! A program file is plain text holding one directive per line:
//!   - an empty line is ignored,
//!   - a line starting with `.` moves the load pointer to the address that follows it,
//!   - any other line holds an integer, stored at the load pointer which then moves forward by one.
//!
//! Everything after the first whitespace character of a line is a comment. A line starting with
//! whitespace is therefore a comment as a whole.

use camino::{Utf8Path, Utf8PathBuf};
use miette::{NamedSource, SourceSpan};
use nom::{
    branch::alt,
    bytes::complete::take_till,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    sequence::{pair, preceded},
    IResult,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::{Address, Word, MEMORY_SIZE, PROGRAM_START};

#[derive(Debug, Error, miette::Diagnostic)]
pub enum LoadError {
    #[error("could not read program file {path}")]
    #[diagnostic(code(vnm::load::io))]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed program: line {line} is neither a value nor a load address")]
    #[diagnostic(
        code(vnm::load::malformed),
        help("lines hold a decimal integer, or `.` followed by the next load address")
    )]
    Malformed {
        line: usize,
        #[source_code]
        source_code: NamedSource<String>,
        #[label("could not parse this")]
        span: SourceSpan,
    },

    #[error("line {line} stores a value at address {address}, outside of memory")]
    #[diagnostic(code(vnm::load::out_of_range))]
    OutOfRange {
        line: usize,
        address: i64,
        #[source_code]
        source_code: NamedSource<String>,
        #[label("stored here")]
        span: SourceSpan,
    },
}

impl LoadError {
    /// The 1-based line of the program file which caused the error, if any
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Io { .. } => None,
            Self::Malformed { line, .. } | Self::OutOfRange { line, .. } => Some(*line),
        }
    }
}

/// One parsed line of a program file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Blank,
    Origin(Word),
    Value(Word),
}

/// Parse a signed decimal integer
fn parse_integer(input: &str) -> IResult<&str, Word> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse)(input)
}

/// Parse a token stripped from its comment
fn parse_directive(input: &str) -> IResult<&str, Directive> {
    alt((
        map(preceded(char('.'), parse_integer), Directive::Origin),
        map(parse_integer, Directive::Value),
    ))(input)
}

/// Parse a whole line. The returned input is the comment, if any.
fn parse_line(input: &str) -> IResult<&str, Directive> {
    let (comment, token) = take_till(char::is_whitespace)(input)?;
    if token.is_empty() {
        return Ok((comment, Directive::Blank));
    }

    let (_, directive) = all_consuming(parse_directive)(token)?;
    Ok((comment, directive))
}

/// The initial content of memory, as an ordered list of `(address, value)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    cells: Vec<(Address, Word)>,
}

impl ProgramImage {
    #[must_use]
    pub fn new(cells: Vec<(Address, Word)>) -> Self {
        Self { cells }
    }

    /// Build an image holding consecutive words, starting at the first program address
    #[must_use]
    pub fn from_words(words: &[Word]) -> Self {
        Self::default().with_segment(PROGRAM_START, words)
    }

    /// Append consecutive words starting at `start`
    #[must_use]
    pub fn with_segment(mut self, start: Address, words: &[Word]) -> Self {
        self.cells
            .extend(words.iter().enumerate().map(|(offset, word)| (start + offset, *word)));
        self
    }

    /// Parse a program from its textual representation
    ///
    /// # Errors
    ///
    /// Fails on the first line that can't be parsed, or that would store a value outside of
    /// memory.
    pub fn parse(source: &str) -> Result<Self, LoadError> {
        Self::parse_named("<program>", source)
    }

    /// Read and parse a program file
    ///
    /// # Errors
    ///
    /// Fails if the file can't be read, or on the first line that can't be parsed.
    pub fn from_file(path: &Utf8Path) -> Result<Self, LoadError> {
        info!(%path, "Reading program");
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse_named(path.as_str(), &source)
    }

    #[tracing::instrument(skip(source), err)]
    fn parse_named(name: &str, source: &str) -> Result<Self, LoadError> {
        let mut cells = Vec::new();
        let mut pointer = i64::try_from(PROGRAM_START).unwrap_or_default();
        let mut offset = 0;

        for (index, raw) in source.split_inclusive('\n').enumerate() {
            let line = index + 1;
            let content = raw.trim_end_matches(['\n', '\r']);
            let token_len = content.find(char::is_whitespace).unwrap_or(content.len());
            let span = SourceSpan::from((offset, token_len.max(1)));
            offset += raw.len();

            let Ok((_, directive)) = parse_line(content) else {
                return Err(LoadError::Malformed {
                    line,
                    source_code: NamedSource::new(name, source.to_owned()),
                    span,
                });
            };

            match directive {
                Directive::Blank => {}
                Directive::Origin(address) => {
                    debug!(line, address, "Moving load pointer");
                    pointer = address.into();
                }
                Directive::Value(value) => {
                    let address = Address::try_from(pointer)
                        .ok()
                        .filter(|address| *address < MEMORY_SIZE)
                        .ok_or_else(|| LoadError::OutOfRange {
                            line,
                            address: pointer,
                            source_code: NamedSource::new(name, source.to_owned()),
                            span,
                        })?;
                    cells.push((address, value));
                    pointer += 1;
                }
            }
        }

        info!(cells = cells.len(), "Program parsed");
        Ok(Self { cells })
    }

    #[must_use]
    pub fn cells(&self) -> &[(Address, Word)] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
        self.cells.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(Address, Word)> for ProgramImage {
    fn from_iter<T: IntoIterator<Item = (Address, Word)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
