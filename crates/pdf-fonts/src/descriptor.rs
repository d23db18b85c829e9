//! Metadata holders for the embedding document's font-dictionary writer.

/// Identifies the character collection (and revision) a CID belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidSystemInfo {
    /// Issuer of the character collection (e.g. `Adobe`).
    pub registry: String,
    /// Name of the collection within the registry (e.g. `Japan1`).
    pub ordering: String,
    /// Supplement number; additional CIDs bump it without reordering.
    pub supplement: i32,
}

/// Derives the 6-letter subset tag for a flattened glyph list.
///
/// Subset fonts are conventionally named `TAG+BaseName` with a tag of six
/// uppercase letters. The tag is a pure function of the glyph IDs, so
/// subsetting the same set twice yields the same name.
pub fn subset_tag(glyph_ids: &[u16]) -> String {
    // FNV-1a over the glyph IDs, then base-26 digits.
    let mut hash = 0x_cbf2_9ce4_8422_2325_u64;
    for &glyph_id in glyph_ids {
        for byte in glyph_id.to_be_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x_0100_0000_01b3);
        }
    }

    let mut tag = String::with_capacity(6);
    for _ in 0..6 {
        tag.push(char::from(b'A' + (hash % 26) as u8));
        hash /= 26;
    }
    tag
}
