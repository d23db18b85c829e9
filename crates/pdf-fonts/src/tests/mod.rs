//! Shared test fixtures: sample CMap programs and a synthetic sfnt builder.

use std::{
    collections::HashMap,
    sync::{atomic::AtomicUsize, atomic::Ordering, Arc, Mutex},
};

use crate::{
    cmap::{CMapCache, CMapResources},
    TableTag,
};

/// CID-keyed CMap program in the Adobe text format, covering single-byte,
/// two-byte and four-byte codes.
pub(crate) const SAMPLE_CMAP: &[u8] = br"%!PS-Adobe-3.0 Resource-CMap
/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo 3 dict dup begin
  /Registry (Adobe) def
  /Ordering (Japan1) def
  /Supplement 7 def
end def
/CMapName /Test-H def
/CMapType 1 def
/WMode 0 def
3 begincodespacerange
  <20> <7e>
  <8140> <817e>
  <00a1a1a1> <00a1a1ff>
endcodespacerange
2 begincidrange
  <20> <7e> 1
  <8140> <817e> 633
endcidrange
1 begincidchar
  <00a1a1f0> 9000
endcidchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// ToUnicode CMap program exercising `bfchar`, incrementing `bfrange`,
/// multi-scalar destinations and the array destination form.
pub(crate) const SAMPLE_TO_UNICODE: &[u8] = br"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Test-UCS2 def
/CMapType 2 def
1 begincodespacerange
<0000> <ffff>
endcodespacerange
2 beginbfchar
<0001> <0020>
<0014> <00660069>
endbfchar
2 beginbfrange
<0005> <000a> <0041>
<001e> <001f> [<0058> <0059>]
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// In-memory [`CMapResources`] backend with a load counter.
#[derive(Debug, Default)]
pub(crate) struct TestResources {
    files: Mutex<HashMap<String, Vec<u8>>>,
    pub(crate) loads: AtomicUsize,
}

impl TestResources {
    pub(crate) fn insert(&self, name: &str, data: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_owned(), data.to_vec());
    }
}

impl CMapResources for TestResources {
    fn load(&self, name: &str) -> Option<Vec<u8>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.files.lock().unwrap().get(name).cloned()
    }
}

pub(crate) fn test_cache() -> CMapCache {
    let resources = TestResources::default();
    resources.insert("Test-H", SAMPLE_CMAP);
    resources.insert("Test-UCS2", SAMPLE_TO_UNICODE);
    CMapCache::new(Arc::new(resources))
}

pub(crate) fn empty_cache() -> CMapCache {
    CMapCache::new(Arc::new(TestResources::default()))
}

/// Builder of minimal TrueType fonts with synthetic glyph records.
///
/// Every glyph except glyph 0 starts out as a recognizable simple record;
/// individual glyphs can be replaced with composites, and extra verbatim
/// tables can be attached. The built font uses the long `loca` format and one
/// full metric record per glyph.
#[derive(Debug)]
pub(crate) struct FontFixture {
    glyphs: Vec<Vec<u8>>,
    extra_tables: Vec<(TableTag, Vec<u8>)>,
}

impl FontFixture {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    const MORE_COMPONENTS: u16 = 0x0020;

    pub(crate) fn with_simple_glyphs(count: u16) -> Self {
        let glyphs = (0..count)
            .map(|glyph_id| {
                if glyph_id == 0 {
                    vec![] // the missing glyph has no outline
                } else {
                    let mut record = vec![0x00, 0x01]; // numberOfContours = 1
                    record.extend_from_slice(&[0; 8]); // bounding box
                    record.extend_from_slice(&glyph_id.to_be_bytes());
                    record.extend_from_slice(&[0; 2]);
                    record
                }
            })
            .collect();
        Self {
            glyphs,
            extra_tables: vec![],
        }
    }

    /// Replaces a glyph with a composite referencing `components` via
    /// zero-offset word arguments.
    pub(crate) fn set_composite(&mut self, glyph_id: u16, components: &[u16]) {
        let mut record = vec![0xff, 0xff]; // numberOfContours = -1
        record.extend_from_slice(&[0; 8]); // bounding box
        for (i, &component) in components.iter().enumerate() {
            let mut flags = Self::ARG_1_AND_2_ARE_WORDS;
            if i + 1 < components.len() {
                flags |= Self::MORE_COMPONENTS;
            }
            record.extend_from_slice(&flags.to_be_bytes());
            record.extend_from_slice(&component.to_be_bytes());
            record.extend_from_slice(&[0; 4]); // x / y offsets
        }
        self.glyphs[usize::from(glyph_id)] = record;
    }

    pub(crate) fn set_table(&mut self, tag: TableTag, content: Vec<u8>) {
        self.extra_tables.push((tag, content));
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let glyph_count = u16::try_from(self.glyphs.len()).unwrap();

        let mut glyf = vec![];
        let mut loca = 0_u32.to_be_bytes().to_vec();
        for glyph in &self.glyphs {
            glyf.extend_from_slice(glyph);
            loca.extend_from_slice(&u32::try_from(glyf.len()).unwrap().to_be_bytes());
        }

        let mut head = vec![0; 54];
        head[..4].copy_from_slice(&0x_0001_0000_u32.to_be_bytes());
        head[12..16].copy_from_slice(&0x_5f0f_3cf5_u32.to_be_bytes()); // magic number
        head[51] = 1; // long loca format

        let mut hhea = vec![0; 36];
        hhea[..4].copy_from_slice(&0x_0001_0000_u32.to_be_bytes());
        hhea[34..].copy_from_slice(&glyph_count.to_be_bytes());

        let mut maxp = vec![0; 32];
        maxp[..4].copy_from_slice(&0x_0001_0000_u32.to_be_bytes());
        maxp[4..6].copy_from_slice(&glyph_count.to_be_bytes());

        // One full metric record per glyph, with distinct advances.
        let mut hmtx = vec![];
        for glyph_id in 0..glyph_count {
            hmtx.extend_from_slice(&(500 + glyph_id).to_be_bytes());
            hmtx.extend_from_slice(&glyph_id.to_be_bytes());
        }

        let mut tables = vec![
            (TableTag::HEAD, head),
            (TableTag::HHEA, hhea),
            (TableTag::MAXP, maxp),
            (TableTag::HMTX, hmtx),
            (TableTag::LOCA, loca),
            (TableTag::GLYF, glyf),
        ];
        tables.extend(self.extra_tables.iter().cloned());

        let mut buffer = vec![];
        buffer.extend_from_slice(&0x_0001_0000_u32.to_be_bytes());
        buffer.extend_from_slice(&u16::try_from(tables.len()).unwrap().to_be_bytes());
        buffer.extend_from_slice(&[0; 6]); // searchRange, entrySelector, rangeShift
        let mut offset = 12 + tables.len() * 16;
        for (tag, content) in &tables {
            buffer.extend_from_slice(&tag.0);
            buffer.extend_from_slice(&[0; 4]); // checksum
            buffer.extend_from_slice(&u32::try_from(offset).unwrap().to_be_bytes());
            buffer.extend_from_slice(&u32::try_from(content.len()).unwrap().to_be_bytes());
            offset += content.len().next_multiple_of(4);
        }
        for (_, content) in &tables {
            buffer.extend_from_slice(content);
            buffer.resize(buffer.len().next_multiple_of(4), 0);
        }
        buffer
    }
}
