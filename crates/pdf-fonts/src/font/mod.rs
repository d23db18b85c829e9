//! Source font access: the [`FontProgram`] collaborator interface and the
//! reference [`SfntFont`] parser implementing it over raw bytes.

use core::{fmt, ops};

pub(crate) use self::glyph::{ComponentArgs, ComponentTransform, Glyph, GlyphComponent};
use crate::errors::{Error, FontErrorKind};

mod glyph;

/// Four-byte table tag from an sfnt table directory.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableTag(pub [u8; 4]);

impl TableTag {
    /// `cmap`: character to glyph mapping.
    pub const CMAP: Self = Self(*b"cmap");
    /// `cvt `: control values for hinting.
    pub const CVT: Self = Self(*b"cvt ");
    /// `DSIG`: digital signature.
    pub const DSIG: Self = Self(*b"DSIG");
    /// `fpgm`: font program.
    pub const FPGM: Self = Self(*b"fpgm");
    /// `glyf`: glyph outlines.
    pub const GLYF: Self = Self(*b"glyf");
    /// `head`: font header.
    pub const HEAD: Self = Self(*b"head");
    /// `hhea`: horizontal metrics header.
    pub const HHEA: Self = Self(*b"hhea");
    /// `hmtx`: horizontal metrics.
    pub const HMTX: Self = Self(*b"hmtx");
    /// `loca`: glyph offset index.
    pub const LOCA: Self = Self(*b"loca");
    /// `maxp`: maximum profile.
    pub const MAXP: Self = Self(*b"maxp");
    /// `name`: naming table.
    pub const NAME: Self = Self(*b"name");
    /// `OS/2`: OS/2 and Windows metrics.
    pub const OS2: Self = Self(*b"OS/2");
    /// `post`: PostScript information.
    pub const POST: Self = Self(*b"post");
    /// `prep`: control value program.
    pub const PREP: Self = Self(*b"prep");
}

pub(crate) fn skip(bytes: &mut &[u8], n: usize) -> Result<(), FontErrorKind> {
    if bytes.len() < n {
        Err(FontErrorKind::UnexpectedEof)
    } else {
        *bytes = &bytes[n..];
        Ok(())
    }
}

pub(crate) fn read_u16(bytes: &mut &[u8]) -> Result<u16, FontErrorKind> {
    let [a, b, rest @ ..] = bytes else {
        return Err(FontErrorKind::UnexpectedEof);
    };
    *bytes = rest;
    Ok(u16::from_be_bytes([*a, *b]))
}

pub(crate) fn read_u32(bytes: &mut &[u8]) -> Result<u32, FontErrorKind> {
    let [a, b, c, d, rest @ ..] = bytes else {
        return Err(FontErrorKind::UnexpectedEof);
    };
    *bytes = rest;
    Ok(u32::from_be_bytes([*a, *b, *c, *d]))
}

pub(crate) fn read_byte_array<const N: usize>(bytes: &mut &[u8]) -> Result<[u8; N], FontErrorKind> {
    if bytes.len() < N {
        Err(FontErrorKind::UnexpectedEof)
    } else {
        let (head, tail) = bytes.split_at(N);
        *bytes = tail;
        Ok(head.try_into().unwrap())
    }
}

fn offset_bytes(bytes: &[u8], offset: u32) -> Result<&[u8], FontErrorKind> {
    let offset = offset as usize;
    if bytes.len() < offset {
        Err(FontErrorKind::UnexpectedEof)
    } else {
        Ok(&bytes[offset..])
    }
}

/// Horizontal metric record of a single glyph, as raw `hmtx` bits.
#[derive(Debug, Clone, Copy)]
pub struct HorizontalMetrics {
    /// Advance width in font units.
    pub advance: u16,
    /// Left side bearing, as the raw 16-bit value.
    pub lsb: u16,
}

/// Interface of the source font parser consumed by the subsetting engine.
///
/// The engine only needs glyph-level access plus verbatim views of the source
/// tables; full outline interpretation stays with the implementor. The crate
/// ships [`SfntFont`] as the reference implementation.
pub trait FontProgram {
    /// Number of glyphs in the font.
    fn glyph_count(&self) -> u16;

    /// Raw outline blob of a glyph; an empty slice denotes an empty glyph.
    fn glyph_data(&self, glyph_id: u16) -> Result<&[u8], Error>;

    /// Horizontal metric record of a glyph.
    fn metrics(&self, glyph_id: u16) -> Result<HorizontalMetrics, Error>;

    /// Advance-count field declared by the metrics header.
    fn number_of_h_metrics(&self) -> u16;

    /// Verbatim bytes of a source table, if the font has it.
    fn table(&self, tag: TableTag) -> Option<&[u8]>;

    /// All source tables in directory order.
    fn tables(&self) -> Vec<(TableTag, &[u8])>;
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LocaFormat {
    Short,
    Long,
}

impl LocaFormat {
    const fn bytes_per_offset(self) -> usize {
        match self {
            Self::Short => 2,
            Self::Long => 4,
        }
    }
}

#[derive(Debug)]
struct LocaTable<'a> {
    format: LocaFormat,
    bytes: &'a [u8],
}

impl<'a> LocaTable<'a> {
    fn new(format: LocaFormat, glyph_count: u16, bytes: &'a [u8]) -> Result<Self, FontErrorKind> {
        let expected_len = format.bytes_per_offset() * (glyph_count as usize + 1);
        if bytes.len() != expected_len {
            Err(FontErrorKind::UnexpectedTableLen {
                table: TableTag::LOCA,
                expected: expected_len,
                actual: bytes.len(),
            })
        } else {
            Ok(Self { format, bytes })
        }
    }

    fn glyph_range(&self, glyph_id: u16) -> Result<ops::Range<usize>, FontErrorKind> {
        let glyph_id = usize::from(glyph_id);
        Ok(match self.format {
            LocaFormat::Short => {
                let mut bytes = self.bytes;
                skip(&mut bytes, glyph_id * 2)?;
                let start_offset = usize::from(read_u16(&mut bytes)?) * 2;
                let end_offset = usize::from(read_u16(&mut bytes)?) * 2;
                start_offset..end_offset
            }
            LocaFormat::Long => {
                let mut bytes = self.bytes;
                skip(&mut bytes, glyph_id * 4)?;
                let start_offset = read_u32(&mut bytes)? as usize;
                let end_offset = read_u32(&mut bytes)? as usize;
                start_offset..end_offset
            }
        })
    }
}

#[derive(Debug)]
struct HmtxTable<'a> {
    raw: &'a [u8],
    number_of_h_metrics: u16,
}

impl HmtxTable<'_> {
    fn advance_and_lsb(&self, glyph_id: u16) -> Result<(u16, u16), FontErrorKind> {
        let (advance, lsb);
        if glyph_id < self.number_of_h_metrics {
            let offset = u32::from(glyph_id) * 4;
            let mut bytes = offset_bytes(self.raw, offset)?;
            advance = read_u16(&mut bytes)?;
            lsb = read_u16(&mut bytes)?;
        } else {
            // Trailing glyphs share the last explicit advance.
            let advance_offset = u32::from(self.number_of_h_metrics - 1) * 4;
            let mut bytes = offset_bytes(self.raw, advance_offset)?;
            advance = read_u16(&mut bytes)?;

            let lsb_offset = u32::from(self.number_of_h_metrics) * 4
                + u32::from(glyph_id - self.number_of_h_metrics) * 2;
            let mut bytes = offset_bytes(self.raw, lsb_offset)?;
            lsb = read_u16(&mut bytes)?;
        }
        Ok((advance, lsb))
    }
}

/// TrueType-flavored OpenType font parsed from raw bytes.
///
/// Reference implementation of [`FontProgram`]: it reads the table directory
/// and the handful of records the subsetting engine needs (glyph count, offset
/// index, metrics), keeping every table available as a verbatim byte view.
#[derive(Debug)]
pub struct SfntFont<'a> {
    tables: Vec<(TableTag, &'a [u8])>,
    glyph_count: u16,
    number_of_h_metrics: u16,
    loca: LocaTable<'a>,
    hmtx: HmtxTable<'a>,
    glyf: &'a [u8],
}

impl<'a> SfntFont<'a> {
    pub(crate) const SFNT_VERSION: u32 = 0x_0001_0000;
    pub(crate) const SFNT_CHECKSUM: u32 = 0x_b1b0_afba;
    pub(crate) const HEAD_LEN: usize = 54;
    pub(crate) const HEAD_CHECKSUM_OFFSET: usize = 8;
    pub(crate) const HHEA_LEN: usize = 36;
    pub(crate) const LOCA_FORMAT_OFFSET: usize = 50;

    /// Word-wise checksum over `bytes`, which are implicitly zero-padded
    /// to a 4-byte boundary.
    pub(crate) fn checksum(bytes: &[u8]) -> u32 {
        let mut chunks = bytes.chunks_exact(4);
        let mut sum = 0_u32;
        for chunk in chunks.by_ref() {
            let [a, b, c, d] = chunk else { unreachable!() };
            sum = sum.wrapping_add(u32::from_be_bytes([*a, *b, *c, *d]));
        }
        let mut last_word = [0_u8; 4];
        let remainder = chunks.remainder();
        last_word[..remainder.len()].copy_from_slice(remainder);
        sum.wrapping_add(u32::from_be_bytes(last_word))
    }

    /// Parses a TrueType font program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceFontCorrupt`] if a required table is missing or
    /// structurally invalid.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        Self::parse_inner(bytes).map_err(Error::SourceFontCorrupt)
    }

    fn parse_inner(mut bytes: &'a [u8]) -> Result<Self, FontErrorKind> {
        let font_bytes = bytes;
        let sfnt_version = read_u32(&mut bytes)?;
        if sfnt_version != Self::SFNT_VERSION {
            return Err(FontErrorKind::UnexpectedFontVersion(sfnt_version));
        }
        let table_count = read_u16(&mut bytes)?;
        skip(&mut bytes, 6)?; // searchRange, entrySelector, rangeShift

        let mut tables = Vec::with_capacity(usize::from(table_count));
        for _ in 0..table_count {
            let tag = TableTag(read_byte_array::<4>(&mut bytes)?);
            skip(&mut bytes, 4)?; // checksum
            let offset = read_u32(&mut bytes)? as usize;
            let len = read_u32(&mut bytes)? as usize;
            let table_bytes = font_bytes
                .get(offset..(offset + len))
                .ok_or(FontErrorKind::UnexpectedEof)?;
            tables.push((tag, table_bytes));
        }

        let required = |tag: TableTag| {
            tables
                .iter()
                .find(|(t, _)| *t == tag)
                .map(|(_, bytes)| *bytes)
                .ok_or(FontErrorKind::MissingTable(tag))
        };

        let head = required(TableTag::HEAD)?;
        if head.len() != Self::HEAD_LEN {
            return Err(FontErrorKind::UnexpectedTableLen {
                table: TableTag::HEAD,
                expected: Self::HEAD_LEN,
                actual: head.len(),
            });
        }
        let loca_format = Self::parse_loca_format(head)?;
        let glyph_count = Self::parse_glyph_count(required(TableTag::MAXP)?)?;
        let loca = LocaTable::new(loca_format, glyph_count, required(TableTag::LOCA)?)?;

        let hhea = required(TableTag::HHEA)?;
        if hhea.len() != Self::HHEA_LEN {
            return Err(FontErrorKind::UnexpectedTableLen {
                table: TableTag::HHEA,
                expected: Self::HHEA_LEN,
                actual: hhea.len(),
            });
        }
        let number_of_h_metrics =
            u16::from_be_bytes([hhea[Self::HHEA_LEN - 2], hhea[Self::HHEA_LEN - 1]]);
        // `hmtx` must hold at least one full metric record.
        if number_of_h_metrics == 0 {
            return Err(FontErrorKind::NoHorizontalMetrics);
        }
        let hmtx = HmtxTable {
            raw: required(TableTag::HMTX)?,
            number_of_h_metrics,
        };
        let glyf = required(TableTag::GLYF)?;

        Ok(Self {
            tables,
            glyph_count,
            number_of_h_metrics,
            loca,
            hmtx,
            glyf,
        })
    }

    fn parse_loca_format(mut head_bytes: &[u8]) -> Result<LocaFormat, FontErrorKind> {
        let version = read_u32(&mut head_bytes)?;
        if version != 0x_0001_0000 {
            return Err(FontErrorKind::UnexpectedTableVersion {
                table: TableTag::HEAD,
                version,
            });
        }
        skip(&mut head_bytes, Self::LOCA_FORMAT_OFFSET - 4)?;
        let raw_format = read_u16(&mut head_bytes)?;
        match raw_format {
            0 => Ok(LocaFormat::Short),
            1 => Ok(LocaFormat::Long),
            _ => Err(FontErrorKind::UnexpectedLocaFormat(raw_format)),
        }
    }

    fn parse_glyph_count(mut maxp_bytes: &[u8]) -> Result<u16, FontErrorKind> {
        let version = read_u32(&mut maxp_bytes)?;
        if version != 0x_0000_5000 && version != 0x_0001_0000 {
            return Err(FontErrorKind::UnexpectedTableVersion {
                table: TableTag::MAXP,
                version,
            });
        }
        read_u16(&mut maxp_bytes)
    }
}

impl FontProgram for SfntFont<'_> {
    fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    fn glyph_data(&self, glyph_id: u16) -> Result<&[u8], Error> {
        if glyph_id >= self.glyph_count {
            return Err(Error::MalformedFont(FontErrorKind::GlyphOutOfRange {
                glyph_id,
                glyph_count: self.glyph_count,
            }));
        }
        let range = self
            .loca
            .glyph_range(glyph_id)
            .map_err(Error::SourceFontCorrupt)?;
        self.glyf.get(range.clone()).ok_or(Error::SourceFontCorrupt(
            FontErrorKind::MissingGlyph { glyph_id, range },
        ))
    }

    fn metrics(&self, glyph_id: u16) -> Result<HorizontalMetrics, Error> {
        let (advance, lsb) = self
            .hmtx
            .advance_and_lsb(glyph_id)
            .map_err(Error::SourceFontCorrupt)?;
        Ok(HorizontalMetrics { advance, lsb })
    }

    fn number_of_h_metrics(&self) -> u16 {
        self.number_of_h_metrics
    }

    fn table(&self, tag: TableTag) -> Option<&[u8]> {
        self.tables
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, bytes)| *bytes)
    }

    fn tables(&self) -> Vec<(TableTag, &[u8])> {
        self.tables.clone()
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            let ch = if byte.is_ascii_graphic() || byte == b' ' {
                char::from(byte)
            } else {
                char::REPLACEMENT_CHARACTER
            };
            fmt::Write::write_char(formatter, ch)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "TableTag({self})")
    }
}
