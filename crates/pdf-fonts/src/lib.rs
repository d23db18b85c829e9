//! PDF font plumbing: CMap-based text encodings and TrueType subsetting.
//!
//! The crate covers the two font-shaped jobs a PDF writer or reader runs into:
//!
//! - **CMap translation.** [`CMapEncoding`] converts between raw text byte
//!   codes, CIDs and Unicode, backed by named CMap programs in the Adobe text
//!   format. Programs are parsed once per process through [`CMapCache`] into
//!   immutable, range-compressed tables shared across fonts.
//! - **Font subsetting.** [`FontSubset`] resolves the transitive closure of a
//!   glyph set over composite dependencies, renumbers the retained glyphs and
//!   rebuilds a self-consistent sfnt container with recomputed offsets and
//!   checksums.
//!
//! # Examples
//!
//! Subsetting a TrueType font down to a handful of glyphs:
//!
//! ```
//! # use std::collections::BTreeSet;
//! # use pdf_fonts::{Error, FontSubset, SfntFont, SubsetMode};
//! # fn main() -> Result<(), Error> {
//! # fn font_bytes() -> Vec<u8> { unimplemented!() }
//! # if false {
//! let font_bytes = font_bytes();
//! let font = SfntFont::parse(&font_bytes)?;
//! let subset = FontSubset::new(&font, &BTreeSet::from([5, 42]))?;
//! // Composite dependencies and the missing glyph are pulled in automatically.
//! assert!(subset.glyph_ids().contains(&0));
//! let subset_bytes = subset.to_truetype(SubsetMode::GlyphsOnly)?;
//! # drop(subset_bytes);
//! # }
//! # Ok(())
//! # }
//! ```

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

mod cmap;
mod descriptor;
mod encoding;
mod errors;
mod font;
mod subset;
#[cfg(test)]
pub(crate) mod tests;

pub use crate::{
    cmap::{
        CMapCache, CMapEncoding, CMapResources, CodeTable, UnicodeTable, IDENTITY_H, IDENTITY_V,
    },
    descriptor::{subset_tag, CidSystemInfo},
    encoding::{EncodingChain, ExtraEncoding},
    errors::{CMapErrorKind, Error, FontErrorKind},
    font::{FontProgram, HorizontalMetrics, SfntFont, TableTag},
    subset::{flatten_glyphs, FontSubset, SubsetMode},
};
