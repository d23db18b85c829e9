//! Serialization of [`FontSubset`]s into self-consistent sfnt containers.

use core::iter;

use log::debug;

use crate::{
    errors::{Error, FontErrorKind},
    font::{LocaFormat, SfntFont},
    subset::{FontSubset, SubsetGlyph, SubsetMode},
    TableTag,
};

fn write_u16(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_be_bytes());
}

impl FontSubset<'_> {
    /// Tables rebuilt from scratch on every subset; source copies are never
    /// relayed, and `DSIG` cannot survive a rewrite.
    const REBUILT_TABLES: [TableTag; 7] = [
        TableTag::GLYF,
        TableTag::LOCA,
        TableTag::HEAD,
        TableTag::HHEA,
        TableTag::HMTX,
        TableTag::MAXP,
        TableTag::DSIG,
    ];

    /// Serializes this subset to a TrueType-flavored OpenType font.
    ///
    /// The output carries no `cmap` table; subset fonts are addressed by
    /// glyph ID (e.g. through a PDF `Identity-H` encoding), so no character
    /// mapping is synthesized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceFontCorrupt`] if the source font lacks a table
    /// required for the rebuild, or if its `head` / `hhea` / `maxp` copies
    /// have unexpected lengths.
    pub fn to_truetype(&self, mode: SubsetMode) -> Result<Vec<u8>, Error> {
        self.to_writer(mode).map(FontWriter::into_opentype)
    }

    fn to_writer(&self, mode: SubsetMode) -> Result<FontWriter, Error> {
        let font = self.font();
        let required = |tag: TableTag| font.table(tag).ok_or_else(|| Error::missing_table(tag));
        let sized = |tag: TableTag, expected: usize| {
            let bytes = required(tag)?;
            if bytes.len() == expected {
                Ok(bytes)
            } else {
                Err(Error::SourceFontCorrupt(FontErrorKind::UnexpectedTableLen {
                    table: tag,
                    expected,
                    actual: bytes.len(),
                }))
            }
        };

        let head = sized(TableTag::HEAD, SfntFont::HEAD_LEN)?;
        let hhea = sized(TableTag::HHEA, SfntFont::HHEA_LEN)?;
        let maxp = required(TableTag::MAXP)?;
        if maxp.len() < 6 {
            return Err(Error::SourceFontCorrupt(FontErrorKind::UnexpectedTableLen {
                table: TableTag::MAXP,
                expected: 6,
                actual: maxp.len(),
            }));
        }

        let mut writer = FontWriter::default();
        let number_of_h_metrics =
            writer.write_table(TableTag::HMTX, |buffer| write_hmtx(&self.glyphs, buffer));
        writer.write_table(TableTag::HHEA, |buffer| {
            buffer.extend_from_slice(&hhea[..SfntFont::HHEA_LEN - 2]);
            write_u16(buffer, number_of_h_metrics);
        });
        writer.write_table(TableTag::MAXP, |buffer| {
            // Patch the glyph count (u16 at bytes 4..6), leaving other bytes intact.
            buffer.extend_from_slice(&maxp[..4]);
            // `unwrap()` is safe: the subset cannot hold more glyphs than the source font.
            write_u16(buffer, self.glyphs.len().try_into().unwrap());
            buffer.extend_from_slice(&maxp[6..]);
        });

        match mode {
            SubsetMode::GlyphsOnly => {
                // Hinting tables travel with the outlines they act on.
                for tag in [TableTag::CVT, TableTag::FPGM, TableTag::PREP] {
                    if let Some(content) = font.table(tag) {
                        writer.write_raw_table(tag, content);
                    }
                }
            }
            SubsetMode::AllTables => {
                for (tag, content) in font.tables() {
                    if !Self::REBUILT_TABLES.contains(&tag) {
                        writer.write_raw_table(tag, content);
                    }
                }
            }
        }

        let locations = writer.write_table(TableTag::GLYF, |buffer| {
            let mut locations = vec![0];
            let initial_offset = buffer.len();
            for glyph in &self.glyphs {
                glyph.outline.write(buffer);
                locations.push(buffer.len() - initial_offset);
            }
            locations
        });
        let loca_format =
            writer.write_table(TableTag::LOCA, |buffer| write_loca(&locations, buffer));
        writer.write_table(TableTag::HEAD, |buffer| {
            write_head(head, loca_format, buffer);
        });

        debug!(
            "serialized subset with {} glyphs into {} tables ({} bytes of table data)",
            self.glyphs.len(),
            writer.tables.len(),
            writer.table_data.len()
        );
        Ok(writer)
    }
}

fn write_hmtx(glyphs: &[SubsetGlyph<'_>], writer: &mut Vec<u8>) -> u16 {
    let mut number_of_h_metrics = glyphs.len();
    while let Some([prev, current]) = glyphs[..number_of_h_metrics].last_chunk::<2>() {
        if prev.advance != current.advance {
            break;
        }
        number_of_h_metrics -= 1;
    }

    for (i, glyph) in glyphs.iter().enumerate() {
        if i < number_of_h_metrics {
            write_u16(writer, glyph.advance);
            write_u16(writer, glyph.lsb);
        } else {
            write_u16(writer, glyph.lsb);
        }
    }

    // `unwrap()` is safe: `number_of_h_metrics` <= number of glyphs <= u16::MAX
    number_of_h_metrics.try_into().unwrap()
}

fn write_loca(locations: &[usize], writer: &mut Vec<u8>) -> LocaFormat {
    let all_even = locations.iter().all(|&loc| loc % 2 == 0);
    let in_bounds = locations
        .last()
        .is_none_or(|&loc| loc <= usize::from(u16::MAX) * 2);
    if all_even && in_bounds {
        for &loc in locations {
            #[allow(clippy::cast_possible_truncation)]
            // doesn't happen due to the preceding check
            write_u16(writer, (loc / 2) as u16);
        }
        LocaFormat::Short
    } else {
        for &loc in locations {
            write_u32(writer, u32::try_from(loc).expect("glyph location overflow"));
        }
        LocaFormat::Long
    }
}

fn write_head(original: &[u8], loca_format: LocaFormat, writer: &mut Vec<u8>) {
    writer.extend_from_slice(&original[..SfntFont::HEAD_CHECKSUM_OFFSET]);
    write_u32(writer, 0); // zeroed checksum adjustment, patched after assembly
    writer.extend_from_slice(
        &original[SfntFont::HEAD_CHECKSUM_OFFSET + 4..SfntFont::LOCA_FORMAT_OFFSET],
    );
    write_u16(
        writer,
        match loca_format {
            LocaFormat::Short => 0,
            LocaFormat::Long => 1,
        },
    );
    writer.extend_from_slice(&original[SfntFont::LOCA_FORMAT_OFFSET + 2..]);
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(test, derive(PartialEq))]
struct TableRecord {
    tag: TableTag,
    checksum: u32,
    /// Initially relative to the table data start; always 4-byte aligned.
    offset: u32,
    length: u32,
}

impl TableRecord {
    const BYTE_LEN: usize = 16;

    fn write(&self, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.tag.0);
        write_u32(writer, self.checksum);
        write_u32(writer, self.offset);
        write_u32(writer, self.length);
    }

    fn self_checksum(&self) -> u32 {
        u32::from_be_bytes(self.tag.0)
            .wrapping_add(self.checksum)
            .wrapping_add(self.offset)
            .wrapping_add(self.length)
    }
}

#[derive(Debug, Clone, Default)]
struct FontWriter {
    tables: Vec<TableRecord>,
    /// Contains *aligned* table data.
    table_data: Vec<u8>,
}

impl FontWriter {
    const SFNT_HEADER_LEN: usize = 12;

    fn write_table<T>(&mut self, tag: TableTag, with: impl FnOnce(&mut Vec<u8>) -> T) -> T {
        let offset = self.table_data.len();
        debug_assert_eq!(offset % 4, 0, "unaligned offset: {offset}");

        let output = with(&mut self.table_data);
        let length = self.table_data.len() - offset;
        // Pad the table heap to a 4-byte boundary.
        if length % 4 > 0 {
            let zero_padding = 4 - length % 4;
            self.table_data.extend(iter::repeat_n(0_u8, zero_padding));
        }

        let checksum = SfntFont::checksum(&self.table_data[offset..]);
        self.tables.push(TableRecord {
            tag,
            checksum,
            offset: u32::try_from(offset).expect("table offset overflow"),
            length: u32::try_from(length).expect("table length overflow"),
        });
        output
    }

    fn write_raw_table(&mut self, tag: TableTag, content: &[u8]) {
        self.write_table(tag, |buffer| buffer.extend_from_slice(content));
    }

    fn write_sfnt_header(&self) -> Vec<u8> {
        let mut buffer = vec![];
        write_u32(&mut buffer, SfntFont::SFNT_VERSION);

        // `unwrap()`s are safe: we don't have many tables written.
        let table_count = u16::try_from(self.tables.len()).unwrap();
        write_u16(&mut buffer, table_count);
        let entry_selector = u16::try_from(table_count.ilog2()).unwrap();
        let search_range = 1 << (4 + entry_selector);
        write_u16(&mut buffer, search_range);
        write_u16(&mut buffer, entry_selector);
        let range_shift = 16 * table_count - search_range;
        write_u16(&mut buffer, range_shift);

        debug_assert_eq!(buffer.len(), Self::SFNT_HEADER_LEN);
        buffer
    }

    /// Returns the starting offset of table data.
    fn data_offset(&self) -> usize {
        Self::SFNT_HEADER_LEN + self.tables.len() * TableRecord::BYTE_LEN
    }

    fn into_opentype(mut self) -> Vec<u8> {
        let mut buffer = self.write_sfnt_header();
        self.adjust_data(SfntFont::checksum(&buffer));

        self.tables.sort_unstable_by_key(|record| record.tag.0);
        for record in &self.tables {
            record.write(&mut buffer);
        }
        buffer.extend(self.table_data);
        buffer
    }

    fn adjust_data(&mut self, sfnt_header_checksum: u32) {
        let data_offset = self.data_offset();
        let data_offset_u32 = u32::try_from(data_offset).expect("data_offset overflow");

        let mut file_checksum = sfnt_header_checksum;
        for record in &mut self.tables {
            record.offset += data_offset_u32;
            file_checksum = file_checksum
                .wrapping_add(record.self_checksum())
                .wrapping_add(record.checksum);
        }
        self.patch_head_table(file_checksum, data_offset);
    }

    fn checksum_adjustment_offset(&self) -> usize {
        let head_table = self
            .tables
            .iter()
            .find(|record| record.tag == TableTag::HEAD)
            .expect("head table is always present");
        head_table.offset as usize + SfntFont::HEAD_CHECKSUM_OFFSET
    }

    fn patch_head_table(&mut self, file_checksum: u32, data_offset: usize) {
        let checksum_adjustment = SfntFont::SFNT_CHECKSUM.wrapping_sub(file_checksum);

        // At this point, the table offset already includes the heap offset, so we need to subtract it.
        let offset = self.checksum_adjustment_offset() - data_offset;
        self.table_data[offset..offset + 4].copy_from_slice(&checksum_adjustment.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use allsorts::{binary::read::ReadScope, font_data::FontData, tables::FontTableProvider};
    use test_casing::test_casing;

    use super::*;
    use crate::{
        font::{FontProgram, Glyph},
        tests::FontFixture,
    };

    const MODES: [SubsetMode; 2] = [SubsetMode::GlyphsOnly, SubsetMode::AllTables];

    fn scenario_fixture() -> FontFixture {
        let mut fixture = FontFixture::with_simple_glyphs(300);
        fixture.set_composite(42, &[7, 9]);
        fixture
    }

    #[test]
    fn word_checksum_pads_trailing_bytes() {
        assert_eq!(SfntFont::checksum(&[]), 0);
        assert_eq!(SfntFont::checksum(&[0, 0, 0, 1]), 1);
        assert_eq!(SfntFont::checksum(&[0, 0, 0, 1, 0x80]), 0x8000_0001);
        assert_eq!(
            SfntFont::checksum(&[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 2]),
            1
        );
    }

    #[test]
    fn hmtx_advances_are_compacted() {
        let glyphs: Vec<_> = [(500, 10), (600, 20), (600, 30), (600, 40)]
            .into_iter()
            .map(|(advance, lsb)| SubsetGlyph {
                outline: Glyph::Empty,
                advance,
                lsb,
            })
            .collect();

        let mut buffer = vec![];
        let number_of_h_metrics = write_hmtx(&glyphs, &mut buffer);
        assert_eq!(number_of_h_metrics, 2);
        let expected: &[u8] = &[1, 244, 0, 10, 2, 88, 0, 20, 0, 30, 0, 40];
        assert_eq!(buffer, expected);
    }

    #[test]
    fn loca_format_selection() {
        let mut buffer = vec![];
        assert!(matches!(
            write_loca(&[0, 2, 4], &mut buffer),
            LocaFormat::Short
        ));
        assert_eq!(buffer, [0, 0, 0, 1, 0, 2]);

        buffer.clear();
        assert!(matches!(
            write_loca(&[0, 1, 4], &mut buffer),
            LocaFormat::Long
        ));
        assert_eq!(buffer, [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 4]);

        buffer.clear();
        assert!(matches!(
            write_loca(&[0, 2, 0x2_0002], &mut buffer),
            LocaFormat::Long
        ));
    }

    #[test]
    fn subset_output_parses_back() {
        let bytes = scenario_fixture().build();
        let font = crate::SfntFont::parse(&bytes).unwrap();
        let subset = FontSubset::new(&font, &BTreeSet::from([5, 42])).unwrap();
        assert_eq!(subset.glyph_ids(), [0, 5, 7, 9, 42]);

        let output = subset.to_truetype(SubsetMode::GlyphsOnly).unwrap();
        let reparsed = crate::SfntFont::parse(&output).unwrap();
        assert_eq!(reparsed.glyph_count(), 5);

        // Glyph 42 became glyph 4; its components must point at the new IDs of 7 and 9.
        let composite = Glyph::parse(reparsed.glyph_data(4).unwrap()).unwrap();
        assert_eq!(composite.component_ids().collect::<Vec<_>>(), [2, 3]);
        // The simple glyphs survive byte-for-byte.
        assert_eq!(reparsed.glyph_data(1).unwrap(), font.glyph_data(5).unwrap());
    }

    #[test]
    fn subset_metrics_are_relayed() {
        let bytes = scenario_fixture().build();
        let font = crate::SfntFont::parse(&bytes).unwrap();
        let subset = FontSubset::new(&font, &BTreeSet::from([5, 42])).unwrap();
        let output = subset.to_truetype(SubsetMode::GlyphsOnly).unwrap();
        let reparsed = crate::SfntFont::parse(&output).unwrap();

        for (new_id, &old_id) in subset.glyph_ids().iter().enumerate() {
            let old_metrics = font.metrics(old_id).unwrap();
            let new_metrics = reparsed.metrics(new_id as u16).unwrap();
            assert_eq!(new_metrics.advance, old_metrics.advance);
            assert_eq!(new_metrics.lsb, old_metrics.lsb);
        }
    }

    #[test_casing(2, MODES)]
    #[test]
    fn table_directory_is_consistent(mode: SubsetMode) {
        let bytes = scenario_fixture().build();
        let font = crate::SfntFont::parse(&bytes).unwrap();
        let subset = FontSubset::new(&font, &BTreeSet::from([5, 42])).unwrap();
        let output = subset.to_truetype(mode).unwrap();

        assert_eq!(output.len() % 4, 0);
        assert_eq!(SfntFont::checksum(&output), SfntFont::SFNT_CHECKSUM);

        let table_count = usize::from(u16::from_be_bytes([output[4], output[5]]));
        let mut prev_tag = None;
        for i in 0..table_count {
            let record = &output[12 + i * 16..12 + (i + 1) * 16];
            let tag = TableTag(record[..4].try_into().unwrap());
            assert!(prev_tag < Some(tag), "directory not sorted at {tag}");
            prev_tag = Some(tag);

            let directory_checksum = u32::from_be_bytes(record[4..8].try_into().unwrap());
            let offset = u32::from_be_bytes(record[8..12].try_into().unwrap()) as usize;
            let length = u32::from_be_bytes(record[12..16].try_into().unwrap()) as usize;
            assert_eq!(offset % 4, 0, "unaligned table {tag}");

            let padded_end = offset + length.next_multiple_of(4);
            let mut table_checksum = SfntFont::checksum(&output[offset..padded_end]);
            if tag == TableTag::HEAD {
                // The directory records the checksum computed before the
                // adjustment was patched in.
                let adjustment = u32::from_be_bytes(
                    output[offset + SfntFont::HEAD_CHECKSUM_OFFSET..][..4]
                        .try_into()
                        .unwrap(),
                );
                table_checksum = table_checksum.wrapping_sub(adjustment);
            }
            assert_eq!(table_checksum, directory_checksum, "checksum of {tag}");
        }
    }

    #[test_casing(2, MODES)]
    #[test]
    fn tables_are_readable_with_allsorts(mode: SubsetMode) {
        let bytes = scenario_fixture().build();
        let font = crate::SfntFont::parse(&bytes).unwrap();
        let subset = FontSubset::new(&font, &BTreeSet::from([5, 42])).unwrap();
        let writer = subset.to_writer(mode).unwrap();
        let records = writer.tables.clone();
        let data_offset = writer.data_offset();
        let output = writer.into_opentype();

        let font_file = ReadScope::new(&output).read::<FontData>().unwrap();
        let provider = font_file.table_provider(0).unwrap();
        for record in &records {
            let table_contents = provider
                .read_table_data(u32::from_be_bytes(record.tag.0))
                .unwrap();
            let start = data_offset + record.offset as usize;
            let end = start + record.length as usize;
            assert_eq!(table_contents.as_ref(), &output[start..end]);
        }
    }

    #[test]
    fn loca_is_monotonic_and_covers_glyf() {
        let bytes = scenario_fixture().build();
        let font = crate::SfntFont::parse(&bytes).unwrap();
        let subset = FontSubset::new(&font, &BTreeSet::from([5, 42])).unwrap();
        let output = subset.to_truetype(SubsetMode::GlyphsOnly).unwrap();

        let reparsed = crate::SfntFont::parse(&output).unwrap();
        let loca = reparsed.table(TableTag::LOCA).unwrap();
        let glyf = reparsed.table(TableTag::GLYF).unwrap();
        let loca_format = u16::from_be_bytes(
            reparsed.table(TableTag::HEAD).unwrap()[SfntFont::LOCA_FORMAT_OFFSET..][..2]
                .try_into()
                .unwrap(),
        );

        let offsets: Vec<usize> = match loca_format {
            0 => loca
                .chunks_exact(2)
                .map(|chunk| usize::from(u16::from_be_bytes([chunk[0], chunk[1]])) * 2)
                .collect(),
            1 => loca
                .chunks_exact(4)
                .map(|chunk| u32::from_be_bytes(chunk.try_into().unwrap()) as usize)
                .collect(),
            _ => panic!("unexpected loca format {loca_format}"),
        };
        assert_eq!(offsets.len(), 6);
        assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(*offsets.last().unwrap(), glyf.len());
    }

    #[test]
    fn all_tables_mode_relays_extra_tables() {
        let mut fixture = scenario_fixture();
        fixture.set_table(TableTag::NAME, b"synthetic name table".to_vec());
        fixture.set_table(TableTag::DSIG, vec![0; 8]);
        let bytes = fixture.build();
        let font = crate::SfntFont::parse(&bytes).unwrap();
        let subset = FontSubset::new(&font, &BTreeSet::from([5])).unwrap();

        let glyphs_only = subset.to_truetype(SubsetMode::GlyphsOnly).unwrap();
        let reparsed = crate::SfntFont::parse(&glyphs_only).unwrap();
        assert_eq!(reparsed.table(TableTag::NAME), None);

        let all_tables = subset.to_truetype(SubsetMode::AllTables).unwrap();
        let reparsed = crate::SfntFont::parse(&all_tables).unwrap();
        assert_eq!(
            reparsed.table(TableTag::NAME),
            Some(b"synthetic name table" as &[u8])
        );
        // Signatures cannot survive a rewrite.
        assert_eq!(reparsed.table(TableTag::DSIG), None);
    }
}
