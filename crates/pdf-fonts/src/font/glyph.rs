//! `glyf` outline record codec.
//!
//! Only the structure the subsetting engine needs is decoded: enough of a
//! composite record to enumerate and renumber its component glyph IDs. Simple
//! outlines stay opaque byte blobs copied verbatim.

use super::{read_byte_array, read_u16, read_u32};
use crate::errors::FontErrorKind;

#[derive(Debug)]
pub(crate) enum Glyph<'a> {
    Empty,
    Simple(&'a [u8]),
    Composite {
        /// xMin, yMin, xMax, yMax
        header: [u8; 8],
        components: Vec<GlyphComponent>,
        /// Optional instructions after the last component descriptor
        instructions: &'a [u8],
    },
}

impl<'a> Glyph<'a> {
    pub(crate) fn parse(raw: &'a [u8]) -> Result<Self, FontErrorKind> {
        if raw.is_empty() {
            return Ok(Self::Empty);
        }

        let mut bytes = raw;
        let number_of_contours = read_u16(&mut bytes)?;
        if number_of_contours > i16::MAX as u16 {
            let header = read_byte_array::<8>(&mut bytes)?;
            let mut has_more_components = true;
            let mut components = Vec::with_capacity(1);
            while has_more_components {
                let (component, more) = GlyphComponent::parse(&mut bytes)?;
                components.push(component);
                has_more_components = more;
            }
            Ok(Self::Composite {
                header,
                components,
                instructions: bytes,
            })
        } else {
            Ok(Self::Simple(raw))
        }
    }

    /// Glyph IDs referenced by this outline (empty for non-composites).
    pub(crate) fn component_ids(&self) -> impl Iterator<Item = u16> + '_ {
        let components = match self {
            Self::Empty | Self::Simple(_) => &[] as &[GlyphComponent],
            Self::Composite { components, .. } => components,
        };
        components.iter().map(|component| component.glyph_id)
    }

    pub(crate) fn write(&self, writer: &mut Vec<u8>) {
        match self {
            Self::Empty => { /* do nothing */ }
            Self::Simple(bytes) => {
                writer.extend_from_slice(bytes);
            }
            Self::Composite {
                header,
                components,
                instructions,
            } => {
                writer.extend_from_slice(&u16::MAX.to_be_bytes()); // numberOfContours = -1
                writer.extend_from_slice(header);
                for component in components {
                    component.write(writer);
                }
                writer.extend_from_slice(instructions);
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct GlyphComponent {
    pub(crate) flags: u16,
    pub(crate) glyph_id: u16,
    pub(crate) args: ComponentArgs,
    pub(crate) transform: ComponentTransform,
}

impl GlyphComponent {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    const WE_HAVE_A_SCALE: u16 = 0x0008;
    const MORE_COMPONENTS: u16 = 0x0020;
    const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
    const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

    fn parse(bytes: &mut &[u8]) -> Result<(Self, bool), FontErrorKind> {
        let flags = read_u16(bytes)?;
        let glyph_id = read_u16(bytes)?;
        let args = if flags & Self::ARG_1_AND_2_ARE_WORDS != 0 {
            ComponentArgs::Words(read_u32(bytes)?)
        } else {
            ComponentArgs::Bytes(read_u16(bytes)?)
        };
        let transform = if flags & Self::WE_HAVE_A_SCALE != 0 {
            ComponentTransform::Scale(read_u16(bytes)?)
        } else if flags & Self::WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            ComponentTransform::TwoScales([read_u16(bytes)?, read_u16(bytes)?])
        } else if flags & Self::WE_HAVE_A_TWO_BY_TWO != 0 {
            ComponentTransform::Affine([
                read_u16(bytes)?,
                read_u16(bytes)?,
                read_u16(bytes)?,
                read_u16(bytes)?,
            ])
        } else {
            ComponentTransform::None
        };
        let this = Self {
            flags,
            glyph_id,
            args,
            transform,
        };

        let has_more_components = flags & Self::MORE_COMPONENTS != 0;
        Ok((this, has_more_components))
    }

    fn write(&self, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.flags.to_be_bytes());
        writer.extend_from_slice(&self.glyph_id.to_be_bytes());
        match self.args {
            ComponentArgs::Bytes(args) => writer.extend_from_slice(&args.to_be_bytes()),
            ComponentArgs::Words(args) => writer.extend_from_slice(&args.to_be_bytes()),
        }
        match self.transform {
            ComponentTransform::None => { /* do nothing */ }
            ComponentTransform::Scale(val) => writer.extend_from_slice(&val.to_be_bytes()),
            ComponentTransform::TwoScales(vals) => {
                for val in vals {
                    writer.extend_from_slice(&val.to_be_bytes());
                }
            }
            ComponentTransform::Affine(vals) => {
                for val in vals {
                    writer.extend_from_slice(&val.to_be_bytes());
                }
            }
        }
    }
}

/// Component argument pair, kept as raw bits (point indices or offsets).
#[derive(Debug)]
pub(crate) enum ComponentArgs {
    Bytes(u16),
    Words(u32),
}

#[derive(Debug)]
pub(crate) enum ComponentTransform {
    None,
    Scale(u16),
    TwoScales([u16; 2]),
    Affine([u16; 4]),
}
