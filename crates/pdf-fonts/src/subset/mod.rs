//! Glyph closure resolution and subset construction.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::{
    descriptor::subset_tag,
    errors::{Error, FontErrorKind},
    font::{FontProgram, Glyph},
};

mod write;

/// Table-retention mode of a rebuilt subset container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetMode {
    /// Emit the rebuilt glyph tables plus mandatory metadata (and the hinting
    /// tables travelling with the outlines), nothing else.
    GlyphsOnly,
    /// Relay every original table verbatim, replacing only the glyph-data
    /// tables (and dropping `DSIG`, which cannot survive rewriting).
    AllTables,
}

/// Expands a root glyph set to its full transitive dependency set.
///
/// The returned flattened list contains the roots, glyph 0 (the mandatory
/// fallback) and every transitively referenced composite component, in
/// ascending order without duplicates. The traversal is cycle-safe and
/// idempotent: re-running it on its own output is a no-op.
///
/// # Errors
///
/// Returns [`Error::MalformedFont`] for an empty root set, a root outside the
/// glyph count, or a component reference outside the glyph count; a missing
/// glyph must abort the subset rather than silently drop a dependency.
pub fn flatten_glyphs(font: &dyn FontProgram, roots: &BTreeSet<u16>) -> Result<Vec<u16>, Error> {
    if roots.is_empty() {
        return Err(Error::MalformedFont(FontErrorKind::EmptyGlyphSet));
    }
    let glyph_count = font.glyph_count();
    if let Some(&glyph_id) = roots.iter().find(|&&glyph_id| glyph_id >= glyph_count) {
        return Err(Error::MalformedFont(FontErrorKind::GlyphOutOfRange {
            glyph_id,
            glyph_count,
        }));
    }

    let mut visited: BTreeSet<u16> = roots.clone();
    visited.insert(0);
    let mut frontier: Vec<u16> = visited.iter().copied().collect();
    while let Some(glyph_id) = frontier.pop() {
        let outline = Glyph::parse(font.glyph_data(glyph_id)?).map_err(Error::SourceFontCorrupt)?;
        for component in outline.component_ids() {
            if component >= glyph_count {
                return Err(Error::MalformedFont(FontErrorKind::ComponentOutOfRange {
                    glyph_id,
                    component,
                    glyph_count,
                }));
            }
            if visited.insert(component) {
                frontier.push(component);
            }
        }
    }

    debug!(
        "flattened {} root glyphs into {} glyphs",
        roots.len(),
        visited.len()
    );
    Ok(visited.into_iter().collect())
}

pub(crate) struct SubsetGlyph<'a> {
    pub(crate) outline: Glyph<'a>,
    pub(crate) advance: u16,
    pub(crate) lsb: u16,
}

/// Subset of a font produced by retaining a glyph closure and renumbering it.
///
/// Construction resolves the glyph closure and rewrites composite component
/// references to the new numbering; [`Self::to_truetype()`] then emits a
/// self-consistent binary font program. No state is retained across calls:
/// the subset borrows the source font and is discarded once the output bytes
/// are produced.
pub struct FontSubset<'a> {
    font: &'a dyn FontProgram,
    glyph_ids: Vec<u16>,
    new_ids: BTreeMap<u16, u16>,
    glyphs: Vec<SubsetGlyph<'a>>,
}

impl<'a> FontSubset<'a> {
    /// Resolves the glyph closure of `roots` and prepares the renumbered
    /// glyph records.
    ///
    /// # Errors
    ///
    /// Propagates [`flatten_glyphs()`] errors, plus
    /// [`Error::SourceFontCorrupt`] for unreadable outline or metric records.
    pub fn new(font: &'a dyn FontProgram, roots: &BTreeSet<u16>) -> Result<Self, Error> {
        let glyph_ids = flatten_glyphs(font, roots)?;
        let new_ids: BTreeMap<_, _> = glyph_ids
            .iter()
            .enumerate()
            .map(|(new_id, &old_id)| (old_id, new_id as u16))
            .collect();

        let mut glyphs = Vec::with_capacity(glyph_ids.len());
        for &old_id in &glyph_ids {
            let mut outline =
                Glyph::parse(font.glyph_data(old_id)?).map_err(Error::SourceFontCorrupt)?;
            if let Glyph::Composite { components, .. } = &mut outline {
                for component in components {
                    // The closure included every component, so the lookup
                    // can only fail on a font mutated mid-flight.
                    component.glyph_id = *new_ids.get(&component.glyph_id).ok_or(
                        Error::MalformedFont(FontErrorKind::ComponentOutOfRange {
                            glyph_id: old_id,
                            component: component.glyph_id,
                            glyph_count: font.glyph_count(),
                        }),
                    )?;
                }
            }
            let metrics = font.metrics(old_id)?;
            glyphs.push(SubsetGlyph {
                outline,
                advance: metrics.advance,
                lsb: metrics.lsb,
            });
        }

        Ok(Self {
            font,
            glyph_ids,
            new_ids,
            glyphs,
        })
    }

    /// The flattened glyph list, ascending by source glyph ID. The position
    /// of each entry is its glyph ID in the subset font.
    pub fn glyph_ids(&self) -> &[u16] {
        &self.glyph_ids
    }

    /// New glyph ID of a source glyph, if the subset retains it.
    pub fn new_glyph_id(&self, old_id: u16) -> Option<u16> {
        self.new_ids.get(&old_id).copied()
    }

    /// The 6-letter tag for naming this subset (`TAG+BaseName`).
    pub fn tag(&self) -> String {
        subset_tag(&self.glyph_ids)
    }

    pub(crate) fn font(&self) -> &'a dyn FontProgram {
        self.font
    }
}

impl core::fmt::Debug for FontSubset<'_> {
    fn fmt(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        formatter
            .debug_struct("FontSubset")
            .field("glyph_ids", &self.glyph_ids)
            .finish_non_exhaustive()
    }
}
