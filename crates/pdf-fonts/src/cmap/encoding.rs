//! Per-font-reference CMap encoding with an identity fast path.

use std::sync::Arc;

use crate::{
    cmap::{CMapCache, CodeTable, UnicodeTable},
    errors::Error,
};

/// Name of the identity encoding for horizontal writing.
pub const IDENTITY_H: &str = "Identity-H";
/// Name of the identity encoding for vertical writing.
pub const IDENTITY_V: &str = "Identity-V";

#[derive(Debug)]
enum EncodingKind {
    /// Identity encoding: the CID equals the raw code, no lookup performed.
    Direct,
    Table(Arc<CodeTable>),
}

/// Code↔CID view of a font's CMap, consulted when building the PDF font
/// dictionary.
///
/// Instances are cheap: they hold references into the shared [`CMapCache`]
/// and are freely shareable across threads. The two identity encodings
/// ([`IDENTITY_H`] / [`IDENTITY_V`]) never touch the cache and convert codes
/// as a zero-cost passthrough.
///
/// Byte codes are collapsed to unsigned big-endian integers of 1–4 bytes;
/// that integer is the sole numeric key used by all conversions.
#[derive(Debug)]
pub struct CMapEncoding {
    name: String,
    kind: EncodingKind,
    unicode_table: Option<Arc<UnicodeTable>>,
}

impl CMapEncoding {
    /// Creates an encoding from a CMap name alone.
    ///
    /// # Errors
    ///
    /// Propagates cache errors for non-identity names; identity names cannot
    /// fail.
    pub fn new(cache: &CMapCache, name: &str) -> Result<Self, Error> {
        Ok(Self {
            name: name.to_owned(),
            kind: Self::kind(cache, name)?,
            unicode_table: None,
        })
    }

    /// Creates an encoding that additionally resolves CIDs to Unicode via the
    /// ToUnicode table registered under `unicode_map`.
    ///
    /// # Errors
    ///
    /// Propagates cache errors for either resource.
    pub fn with_to_unicode(
        cache: &CMapCache,
        name: &str,
        unicode_map: &str,
    ) -> Result<Self, Error> {
        Ok(Self {
            name: name.to_owned(),
            kind: Self::kind(cache, name)?,
            unicode_table: Some(cache.unicode_table(unicode_map)?),
        })
    }

    fn kind(cache: &CMapCache, name: &str) -> Result<EncodingKind, Error> {
        if name == IDENTITY_H || name == IDENTITY_V {
            Ok(EncodingKind::Direct)
        } else {
            Ok(EncodingKind::Table(cache.code_table(name)?))
        }
    }

    /// Name of the underlying CMap.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Is this one of the two identity encodings?
    pub fn is_direct(&self) -> bool {
        matches!(self.kind, EncodingKind::Direct)
    }

    /// Does this encoding carry a ToUnicode table?
    pub fn has_to_unicode(&self) -> bool {
        self.unicode_table.is_some()
    }

    /// Registry of the character collection.
    pub fn registry(&self) -> &str {
        match &self.kind {
            EncodingKind::Direct => "Adobe",
            EncodingKind::Table(table) => &table.system_info().registry,
        }
    }

    /// Ordering of the character collection.
    pub fn ordering(&self) -> &str {
        match &self.kind {
            EncodingKind::Direct => "Identity",
            EncodingKind::Table(table) => &table.system_info().ordering,
        }
    }

    /// Supplement number of the character collection.
    pub fn supplement(&self) -> i32 {
        match &self.kind {
            EncodingKind::Direct => 0,
            EncodingKind::Table(table) => table.system_info().supplement,
        }
    }

    /// Writing mode: 0 for horizontal, 1 for vertical.
    pub fn writing_mode(&self) -> u8 {
        match &self.kind {
            EncodingKind::Direct => u8::from(self.name == IDENTITY_V),
            EncodingKind::Table(table) => table.writing_mode(),
        }
    }

    /// Byte code of a CID, collapsed to a big-endian integer.
    ///
    /// Returns 0 (the code of the fallback CID) when the CID has no mapping.
    pub fn code_for_cid(&self, cid: u16) -> u32 {
        match &self.kind {
            EncodingKind::Direct => u32::from(cid),
            EncodingKind::Table(table) => table.code(cid).map_or(0, |(code, _)| code),
        }
    }

    /// Byte sequence of a CID's code, in encoding order.
    ///
    /// Identity encodings always produce two bytes; table-backed ones produce
    /// the 1–4 bytes the CMap declares for the code.
    pub fn code_bytes_for_cid(&self, cid: u16) -> Vec<u8> {
        match &self.kind {
            EncodingKind::Direct => cid.to_be_bytes().to_vec(),
            EncodingKind::Table(table) => {
                let (code, byte_len) = table.code(cid).unwrap_or((0, 2));
                code.to_be_bytes()[4 - usize::from(byte_len)..].to_vec()
            }
        }
    }

    /// CID of a byte code collapsed to a big-endian integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEncoding`] when the code has no CID mapping.
    pub fn cid_for_code(&self, code: u32) -> Result<u16, Error> {
        match &self.kind {
            EncodingKind::Direct => {
                u16::try_from(code).map_err(|_| Error::MalformedEncoding { code })
            }
            EncodingKind::Table(table) => {
                table.cid(code).ok_or(Error::MalformedEncoding { code })
            }
        }
    }

    /// Unicode scalar sequence of a CID, if a ToUnicode table is attached and
    /// maps it.
    pub fn unicode(&self, cid: u16) -> Option<String> {
        self.unicode_table.as_ref()?.unicode(cid)
    }
}
