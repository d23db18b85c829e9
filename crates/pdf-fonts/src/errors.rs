//! Error types shared across the crate.

use core::{fmt, ops};

use crate::font::TableTag;

/// Detailed reason for a [`MalformedCMap`](Error::MalformedCMap) error.
#[derive(Debug)]
#[non_exhaustive]
pub enum CMapErrorKind {
    /// Unexpected end of the CMap program.
    UnexpectedEof,
    /// Invalid hex string (odd digit count or a non-hex character).
    InvalidHex,
    /// Invalid or non-integer numeric operand.
    InvalidNumber,
    /// A code longer than the 4-byte maximum.
    CodeTooLong(usize),
    /// Range bounds with differing byte lengths.
    RangeLengthMismatch,
    /// A CID outside the supported `u16` range.
    CidOutOfRange(i64),
    /// A section (e.g. `begincidrange`) without its closing operator.
    UnterminatedSection(&'static str),
    /// A `bfrange` destination array whose length differs from the range.
    DestinationCountMismatch,
    /// `usecmap` composition is not supported.
    UnsupportedUseCmap,
    /// The CMap does not declare a `CIDSystemInfo` triple.
    MissingCidSystemInfo,
    /// A destination that is not well-formed UTF-16.
    InvalidUnicode,
}

impl fmt::Display for CMapErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the CMap program"),
            Self::InvalidHex => formatter.write_str("invalid hex string"),
            Self::InvalidNumber => formatter.write_str("invalid numeric operand"),
            Self::CodeTooLong(len) => {
                write!(formatter, "code of {len} bytes exceeds the 4-byte maximum")
            }
            Self::RangeLengthMismatch => {
                formatter.write_str("range bounds have differing byte lengths")
            }
            Self::CidOutOfRange(cid) => write!(formatter, "CID {cid} is out of range"),
            Self::UnterminatedSection(op) => write!(formatter, "`{op}` section is not terminated"),
            Self::DestinationCountMismatch => {
                formatter.write_str("destination array length differs from the range")
            }
            Self::UnsupportedUseCmap => formatter.write_str("`usecmap` composition is unsupported"),
            Self::MissingCidSystemInfo => {
                formatter.write_str("CMap does not declare `CIDSystemInfo`")
            }
            Self::InvalidUnicode => formatter.write_str("destination is not well-formed UTF-16"),
        }
    }
}

impl std::error::Error for CMapErrorKind {}

/// Detailed reason for a [`MalformedFont`](Error::MalformedFont) or
/// [`SourceFontCorrupt`](Error::SourceFontCorrupt) error.
#[derive(Debug)]
#[non_exhaustive]
pub enum FontErrorKind {
    /// Unexpected end of the font data.
    UnexpectedEof,
    /// Unexpected sfnt version.
    UnexpectedFontVersion(u32),
    /// Missing required font table.
    MissingTable(TableTag),
    /// Unexpected table version.
    UnexpectedTableVersion {
        /// Table the version was read from.
        table: TableTag,
        /// Version value encountered.
        version: u32,
    },
    /// Unexpected table length.
    UnexpectedTableLen {
        /// Table with the unexpected length.
        table: TableTag,
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// Unexpected `indexToLocFormat` value in the `head` table.
    UnexpectedLocaFormat(u16),
    /// Glyph outline range pointing outside the `glyf` table.
    MissingGlyph {
        /// Glyph the outline belongs to.
        glyph_id: u16,
        /// Byte range inferred from the offset index.
        range: ops::Range<usize>,
    },
    /// A requested glyph outside the font's glyph count.
    GlyphOutOfRange {
        /// Requested glyph ID.
        glyph_id: u16,
        /// Glyph count declared by the font.
        glyph_count: u16,
    },
    /// A composite component referencing a glyph outside the glyph count.
    ComponentOutOfRange {
        /// Composite glyph holding the reference.
        glyph_id: u16,
        /// Referenced component glyph ID.
        component: u16,
        /// Glyph count declared by the font.
        glyph_count: u16,
    },
    /// An empty root glyph set.
    EmptyGlyphSet,
    /// An `hhea` table declaring zero metric records.
    NoHorizontalMetrics,
}

impl fmt::Display for FontErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::UnexpectedFontVersion(version) => {
                write!(formatter, "unexpected sfnt version ({version:#010x})")
            }
            Self::MissingTable(tag) => write!(formatter, "missing required `{tag}` table"),
            Self::UnexpectedTableVersion { table, version } => {
                write!(formatter, "unexpected `{table}` version ({version:#010x})")
            }
            Self::UnexpectedTableLen {
                table,
                expected,
                actual,
            } => write!(
                formatter,
                "unexpected `{table}` length: expected {expected}, got {actual}"
            ),
            Self::UnexpectedLocaFormat(format) => {
                write!(formatter, "unexpected offset index format ({format})")
            }
            Self::MissingGlyph { glyph_id, range } => write!(
                formatter,
                "outline of glyph #{glyph_id} ({range:?}) is outside the `glyf` table"
            ),
            Self::GlyphOutOfRange {
                glyph_id,
                glyph_count,
            } => write!(
                formatter,
                "glyph #{glyph_id} is outside the glyph count ({glyph_count})"
            ),
            Self::ComponentOutOfRange {
                glyph_id,
                component,
                glyph_count,
            } => write!(
                formatter,
                "glyph #{glyph_id} references component #{component} outside the glyph count \
                 ({glyph_count})"
            ),
            Self::EmptyGlyphSet => formatter.write_str("root glyph set is empty"),
            Self::NoHorizontalMetrics => {
                formatter.write_str("font declares zero horizontal metric records")
            }
        }
    }
}

impl std::error::Error for FontErrorKind {}

/// Errors produced by CMap resolution, encoding conversions and font subsetting.
///
/// Every variant is fatal to the operation that raised it; no partial output is
/// returned, and failures are never cached.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A named CMap resource is unknown to the resource loader.
    ResourceNotFound {
        /// Requested resource name.
        name: String,
    },
    /// A CMap resource failed to parse.
    MalformedCMap {
        /// Name of the offending resource.
        name: String,
        /// Parse failure details.
        kind: CMapErrorKind,
    },
    /// Glyph data contradicting the font's declared structure.
    MalformedFont(FontErrorKind),
    /// A byte code without a CID mapping in a non-identity CMap.
    MalformedEncoding {
        /// The unmapped code, collapsed to a big-endian integer.
        code: u32,
    },
    /// A missing or unreadable required table in the source font.
    SourceFontCorrupt(FontErrorKind),
}

impl Error {
    pub(crate) fn cmap(name: &str, kind: CMapErrorKind) -> Self {
        Self::MalformedCMap {
            name: name.to_owned(),
            kind,
        }
    }

    pub(crate) fn missing_table(tag: TableTag) -> Self {
        Self::SourceFontCorrupt(FontErrorKind::MissingTable(tag))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceNotFound { name } => {
                write!(formatter, "CMap resource `{name}` was not found")
            }
            Self::MalformedCMap { name, kind } => {
                write!(formatter, "malformed CMap `{name}`: {kind}")
            }
            Self::MalformedFont(kind) => write!(formatter, "malformed font: {kind}"),
            Self::MalformedEncoding { code } => {
                write!(formatter, "code {code:#x} has no CID mapping")
            }
            Self::SourceFontCorrupt(kind) => write!(formatter, "corrupt source font: {kind}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedCMap { kind, .. } => Some(kind),
            Self::MalformedFont(kind) | Self::SourceFontCorrupt(kind) => Some(kind),
            Self::ResourceNotFound { .. } | Self::MalformedEncoding { .. } => None,
        }
    }
}
