//! CMap programs: immutable code→CID tables with a memoized reverse index,
//! CID→Unicode tables, and the Adobe CMap text parser behind both.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

pub use self::{
    cache::{CMapCache, CMapResources},
    encoding::{CMapEncoding, IDENTITY_H, IDENTITY_V},
};
use crate::{
    descriptor::CidSystemInfo,
    errors::{CMapErrorKind, Error},
};

mod cache;
mod encoding;

const MAX_CODE_LEN: usize = 4;

#[derive(Debug)]
enum Token<'a> {
    Hex(Vec<u8>),
    Literal(String),
    Name(String),
    Number(i64),
    ArrayOpen,
    ArrayClose,
    DictOpen,
    DictClose,
    Word(&'a [u8]),
}

/// Tokenizer over the PostScript-flavored CMap text syntax. Only the token
/// classes the CMap operators use are recognized.
struct Lexer<'a> {
    bytes: &'a [u8],
}

impl<'a> Lexer<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn is_delimiter(byte: u8) -> bool {
        byte.is_ascii_whitespace()
            || matches!(byte, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'/' | b'%')
    }

    fn skip_whitespace(&mut self) {
        loop {
            while let [first, rest @ ..] = self.bytes {
                if first.is_ascii_whitespace() || *first == 0 {
                    self.bytes = rest;
                } else {
                    break;
                }
            }
            if self.bytes.first() == Some(&b'%') {
                let end = self
                    .bytes
                    .iter()
                    .position(|&b| b == b'\n' || b == b'\r')
                    .unwrap_or(self.bytes.len());
                self.bytes = &self.bytes[end..];
            } else {
                break;
            }
        }
    }

    fn take_regular(&mut self) -> &'a [u8] {
        let end = self
            .bytes
            .iter()
            .position(|&b| Self::is_delimiter(b))
            .unwrap_or(self.bytes.len());
        let (word, rest) = self.bytes.split_at(end);
        self.bytes = rest;
        word
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, CMapErrorKind> {
        self.skip_whitespace();
        let Some(&first) = self.bytes.first() else {
            return Ok(None);
        };

        Ok(Some(match first {
            b'<' => {
                if self.bytes.get(1) == Some(&b'<') {
                    self.bytes = &self.bytes[2..];
                    Token::DictOpen
                } else {
                    self.bytes = &self.bytes[1..];
                    Token::Hex(self.read_hex()?)
                }
            }
            b'>' => {
                if self.bytes.get(1) == Some(&b'>') {
                    self.bytes = &self.bytes[2..];
                    Token::DictClose
                } else {
                    return Err(CMapErrorKind::InvalidHex);
                }
            }
            b'(' => {
                self.bytes = &self.bytes[1..];
                Token::Literal(self.read_literal()?)
            }
            b'/' => {
                self.bytes = &self.bytes[1..];
                Token::Name(String::from_utf8_lossy(self.take_regular()).into_owned())
            }
            b'[' => {
                self.bytes = &self.bytes[1..];
                Token::ArrayOpen
            }
            b']' => {
                self.bytes = &self.bytes[1..];
                Token::ArrayClose
            }
            b'0'..=b'9' | b'-' | b'+' => {
                let word = self.take_regular();
                let word = core::str::from_utf8(word).map_err(|_| CMapErrorKind::InvalidNumber)?;
                Token::Number(word.parse().map_err(|_| CMapErrorKind::InvalidNumber)?)
            }
            _ => Token::Word(self.take_regular()),
        }))
    }

    fn read_hex(&mut self) -> Result<Vec<u8>, CMapErrorKind> {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == b'>')
            .ok_or(CMapErrorKind::UnexpectedEof)?;
        let digits = &self.bytes[..end];
        self.bytes = &self.bytes[end + 1..];

        let mut nibbles = Vec::with_capacity(digits.len());
        for &digit in digits {
            if digit.is_ascii_whitespace() {
                continue;
            }
            let nibble = match digit {
                b'0'..=b'9' => digit - b'0',
                b'a'..=b'f' => digit - b'a' + 10,
                b'A'..=b'F' => digit - b'A' + 10,
                _ => return Err(CMapErrorKind::InvalidHex),
            };
            nibbles.push(nibble);
        }
        if nibbles.len() % 2 != 0 {
            return Err(CMapErrorKind::InvalidHex);
        }
        Ok(nibbles.chunks_exact(2).map(|ab| (ab[0] << 4) | ab[1]).collect())
    }

    fn read_literal(&mut self) -> Result<String, CMapErrorKind> {
        let mut value = Vec::new();
        let mut depth = 1_u32;
        let mut iter = self.bytes.iter().enumerate();
        while let Some((i, &byte)) = iter.next() {
            match byte {
                b'\\' => {
                    if let Some((_, &escaped)) = iter.next() {
                        value.push(escaped);
                    }
                }
                b'(' => {
                    depth += 1;
                    value.push(byte);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.bytes = &self.bytes[i + 1..];
                        return Ok(String::from_utf8_lossy(&value).into_owned());
                    }
                    value.push(byte);
                }
                _ => value.push(byte),
            }
        }
        Err(CMapErrorKind::UnexpectedEof)
    }
}

fn expect_hex(lexer: &mut Lexer<'_>) -> Result<Vec<u8>, CMapErrorKind> {
    match lexer.next_token()? {
        Some(Token::Hex(bytes)) => Ok(bytes),
        Some(_) => Err(CMapErrorKind::InvalidHex),
        None => Err(CMapErrorKind::UnexpectedEof),
    }
}

fn expect_number(lexer: &mut Lexer<'_>) -> Result<i64, CMapErrorKind> {
    match lexer.next_token()? {
        Some(Token::Number(value)) => Ok(value),
        Some(_) => Err(CMapErrorKind::InvalidNumber),
        None => Err(CMapErrorKind::UnexpectedEof),
    }
}

fn be_value(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0, |acc, &byte| (acc << 8) | u32::from(byte))
}

fn checked_code(bytes: &[u8]) -> Result<u32, CMapErrorKind> {
    if bytes.is_empty() || bytes.len() > MAX_CODE_LEN {
        return Err(CMapErrorKind::CodeTooLong(bytes.len()));
    }
    Ok(be_value(bytes))
}

/// One contiguous code→CID range.
#[derive(Debug, Clone, Copy)]
struct CidRange {
    lo: u32,
    hi: u32,
    byte_len: u8,
    cid: u16,
}

/// Inverse of a [`CidRange`], produced when deriving the reverse index.
#[derive(Debug, Clone, Copy)]
struct CidSpan {
    cid_lo: u16,
    cid_hi: u16,
    code_lo: u32,
    byte_len: u8,
}

/// Immutable code→CID table of a named CMap program.
///
/// Lookups stay range-compressed: code and CID queries binary-search sorted
/// range lists instead of materializing per-code entries. The CID→code reverse
/// index is derived lazily from the forward ranges on first use and memoized.
#[derive(Debug)]
pub struct CodeTable {
    name: String,
    system_info: CidSystemInfo,
    writing_mode: u8,
    ranges: Vec<CidRange>,
    reverse: OnceCell<Vec<CidSpan>>,
}

#[derive(Debug, Default)]
struct CodeTableBuilder {
    registry: Option<String>,
    ordering: Option<String>,
    supplement: i32,
    writing_mode: u8,
    ranges: Vec<CidRange>,
}

impl CodeTableBuilder {
    fn header_entry(&mut self, key: &str, value: &Token<'_>) {
        match (key, value) {
            ("Registry", Token::Literal(value)) => self.registry = Some(value.clone()),
            ("Ordering", Token::Literal(value)) => self.ordering = Some(value.clone()),
            ("Supplement", Token::Number(value)) => {
                self.supplement = i32::try_from(*value).unwrap_or(0);
            }
            ("WMode", Token::Number(value)) => self.writing_mode = u8::from(*value != 0),
            _ => { /* irrelevant header entry */ }
        }
    }

    fn push_range(&mut self, lo: &[u8], hi: &[u8], cid: i64) -> Result<(), CMapErrorKind> {
        if lo.len() != hi.len() {
            return Err(CMapErrorKind::RangeLengthMismatch);
        }
        let lo_value = checked_code(lo)?;
        let hi_value = checked_code(hi)?;
        if hi_value < lo_value {
            return Err(CMapErrorKind::RangeLengthMismatch);
        }
        let span = i64::from(hi_value - lo_value);
        if cid < 0 || cid + span > i64::from(u16::MAX) {
            return Err(CMapErrorKind::CidOutOfRange(cid));
        }
        self.ranges.push(CidRange {
            lo: lo_value,
            hi: hi_value,
            byte_len: lo.len() as u8,
            cid: cid as u16,
        });
        Ok(())
    }

    fn finish(mut self, name: &str) -> Result<CodeTable, CMapErrorKind> {
        let (Some(registry), Some(ordering)) = (self.registry.take(), self.ordering.take()) else {
            return Err(CMapErrorKind::MissingCidSystemInfo);
        };
        self.ranges.sort_unstable_by_key(|range| range.lo);
        Ok(CodeTable {
            name: name.to_owned(),
            system_info: CidSystemInfo {
                registry,
                ordering,
                supplement: self.supplement,
            },
            writing_mode: self.writing_mode,
            ranges: self.ranges,
            reverse: OnceCell::new(),
        })
    }
}

impl CodeTable {
    /// Parses a named CMap program from its raw text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCMap`] if the program is structurally invalid
    /// or declares no `CIDSystemInfo`.
    pub fn parse(name: &str, data: &[u8]) -> Result<Self, Error> {
        Self::parse_inner(name, data).map_err(|kind| Error::cmap(name, kind))
    }

    fn parse_inner(name: &str, data: &[u8]) -> Result<Self, CMapErrorKind> {
        let mut lexer = Lexer::new(data);
        let mut builder = CodeTableBuilder::default();
        let mut stack: Vec<Token<'_>> = vec![];

        while let Some(token) = lexer.next_token()? {
            match token {
                Token::Word(b"begincodespacerange") => loop {
                    let token = lexer
                        .next_token()?
                        .ok_or(CMapErrorKind::UnterminatedSection("begincodespacerange"))?;
                    let lo = match token {
                        Token::Word(b"endcodespacerange") => break,
                        Token::Hex(lo) => lo,
                        _ => return Err(CMapErrorKind::InvalidHex),
                    };
                    let hi = expect_hex(&mut lexer)?;
                    if lo.len() != hi.len() {
                        return Err(CMapErrorKind::RangeLengthMismatch);
                    }
                    checked_code(&lo)?;
                },
                Token::Word(b"begincidrange") => loop {
                    let token = lexer
                        .next_token()?
                        .ok_or(CMapErrorKind::UnterminatedSection("begincidrange"))?;
                    let lo = match token {
                        Token::Word(b"endcidrange") => break,
                        Token::Hex(lo) => lo,
                        _ => return Err(CMapErrorKind::InvalidHex),
                    };
                    let hi = expect_hex(&mut lexer)?;
                    let cid = expect_number(&mut lexer)?;
                    builder.push_range(&lo, &hi, cid)?;
                },
                Token::Word(b"begincidchar") => loop {
                    let token = lexer
                        .next_token()?
                        .ok_or(CMapErrorKind::UnterminatedSection("begincidchar"))?;
                    let code = match token {
                        Token::Word(b"endcidchar") => break,
                        Token::Hex(code) => code,
                        _ => return Err(CMapErrorKind::InvalidHex),
                    };
                    let cid = expect_number(&mut lexer)?;
                    builder.push_range(&code, &code, cid)?;
                },
                Token::Word(b"usecmap") => return Err(CMapErrorKind::UnsupportedUseCmap),
                Token::Word(b"endcmap") => break,
                Token::Word(b"def") => {
                    let value = stack.pop();
                    let key = stack.pop();
                    if let (Some(Token::Name(key)), Some(value)) = (key, value) {
                        builder.header_entry(&key, &value);
                    }
                    stack.clear();
                }
                Token::DictOpen => loop {
                    match lexer.next_token()? {
                        Some(Token::DictClose) | None => break,
                        Some(Token::Name(key)) => {
                            if let Some(value) = lexer.next_token()? {
                                builder.header_entry(&key, &value);
                            }
                        }
                        Some(_) => { /* skip irrelevant dict entry */ }
                    }
                },
                Token::Word(_) => { /* PostScript furniture (dict, begin, dup, ...) */ }
                operand => stack.push(operand),
            }
        }
        builder.finish(name)
    }

    /// Name the table was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared registry/ordering/supplement triple.
    pub fn system_info(&self) -> &CidSystemInfo {
        &self.system_info
    }

    /// Declared writing mode: 0 for horizontal, 1 for vertical.
    pub fn writing_mode(&self) -> u8 {
        self.writing_mode
    }

    /// Looks up the CID for a byte code collapsed to a big-endian integer.
    ///
    /// With overlapping ranges, the one starting closest to the code wins.
    pub fn cid(&self, code: u32) -> Option<u16> {
        let idx = self.ranges.partition_point(|range| range.lo <= code);
        let range = self.ranges[..idx]
            .iter()
            .rev()
            .find(|range| range.hi >= code)?;
        Some(range.cid + (code - range.lo) as u16)
    }

    /// Looks up the byte code for a CID via the memoized reverse index.
    ///
    /// Returns the code collapsed to a big-endian integer together with its
    /// byte length (1–4).
    pub fn code(&self, cid: u16) -> Option<(u32, u8)> {
        let spans = self.reverse_index();
        let idx = spans.partition_point(|span| span.cid_lo <= cid);
        let span = spans[..idx].iter().rev().find(|span| span.cid_hi >= cid)?;
        Some((span.code_lo + u32::from(cid - span.cid_lo), span.byte_len))
    }

    fn reverse_index(&self) -> &[CidSpan] {
        self.reverse.get_or_init(|| {
            let mut spans: Vec<_> = self
                .ranges
                .iter()
                .map(|range| CidSpan {
                    cid_lo: range.cid,
                    cid_hi: range.cid + (range.hi - range.lo) as u16,
                    code_lo: range.lo,
                    byte_len: range.byte_len,
                })
                .collect();
            spans.sort_unstable_by_key(|span| span.cid_lo);
            spans
        })
    }

    #[cfg(test)]
    pub(crate) fn cids(&self) -> impl Iterator<Item = u16> + '_ {
        self.ranges
            .iter()
            .flat_map(|range| range.cid..=range.cid + (range.hi - range.lo) as u16)
    }
}

#[derive(Debug)]
struct UnicodeRange {
    lo: u16,
    hi: u16,
    units: Vec<u16>,
}

/// Immutable CID→Unicode table parsed from a ToUnicode CMap program.
#[derive(Debug)]
pub struct UnicodeTable {
    name: String,
    singles: HashMap<u16, String>,
    ranges: Vec<UnicodeRange>,
}

impl UnicodeTable {
    /// Parses a named ToUnicode CMap program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCMap`] if the program is structurally invalid.
    pub fn parse(name: &str, data: &[u8]) -> Result<Self, Error> {
        Self::parse_inner(name, data).map_err(|kind| Error::cmap(name, kind))
    }

    fn parse_inner(name: &str, data: &[u8]) -> Result<Self, CMapErrorKind> {
        let mut lexer = Lexer::new(data);
        let mut singles = HashMap::new();
        let mut ranges: Vec<UnicodeRange> = vec![];

        while let Some(token) = lexer.next_token()? {
            match token {
                Token::Word(b"beginbfchar") => loop {
                    let token = lexer
                        .next_token()?
                        .ok_or(CMapErrorKind::UnterminatedSection("beginbfchar"))?;
                    let src = match token {
                        Token::Word(b"endbfchar") => break,
                        Token::Hex(src) => src,
                        _ => return Err(CMapErrorKind::InvalidHex),
                    };
                    let cid = checked_cid(&src)?;
                    let units = utf16_units(&expect_hex(&mut lexer)?)?;
                    singles.insert(cid, decode_utf16(&units)?);
                },
                Token::Word(b"beginbfrange") => loop {
                    let token = lexer
                        .next_token()?
                        .ok_or(CMapErrorKind::UnterminatedSection("beginbfrange"))?;
                    let lo = match token {
                        Token::Word(b"endbfrange") => break,
                        Token::Hex(lo) => lo,
                        _ => return Err(CMapErrorKind::InvalidHex),
                    };
                    let lo = checked_cid(&lo)?;
                    let hi = checked_cid(&expect_hex(&mut lexer)?)?;
                    if hi < lo {
                        return Err(CMapErrorKind::RangeLengthMismatch);
                    }
                    match lexer.next_token()? {
                        Some(Token::Hex(dst)) => {
                            let units = utf16_units(&dst)?;
                            decode_utf16(&units)?;
                            ranges.push(UnicodeRange { lo, hi, units });
                        }
                        Some(Token::ArrayOpen) => {
                            let mut cid = lo;
                            loop {
                                match lexer.next_token()? {
                                    Some(Token::ArrayClose) => break,
                                    Some(Token::Hex(dst)) => {
                                        if cid > hi {
                                            return Err(CMapErrorKind::DestinationCountMismatch);
                                        }
                                        let units = utf16_units(&dst)?;
                                        singles.insert(cid, decode_utf16(&units)?);
                                        cid += 1;
                                    }
                                    Some(_) => return Err(CMapErrorKind::InvalidHex),
                                    None => return Err(CMapErrorKind::UnexpectedEof),
                                }
                            }
                            if cid != hi + 1 {
                                return Err(CMapErrorKind::DestinationCountMismatch);
                            }
                        }
                        Some(_) => return Err(CMapErrorKind::InvalidHex),
                        None => return Err(CMapErrorKind::UnexpectedEof),
                    }
                },
                Token::Word(b"usecmap") => return Err(CMapErrorKind::UnsupportedUseCmap),
                Token::Word(b"endcmap") => break,
                _ => { /* header entries are irrelevant for ToUnicode lookups */ }
            }
        }

        ranges.sort_unstable_by_key(|range| range.lo);
        Ok(Self {
            name: name.to_owned(),
            singles,
            ranges,
        })
    }

    /// Name the table was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up the Unicode scalar sequence mapped to a CID.
    pub fn unicode(&self, cid: u16) -> Option<String> {
        if let Some(value) = self.singles.get(&cid) {
            return Some(value.clone());
        }
        let idx = self.ranges.partition_point(|range| range.lo <= cid);
        let range = self.ranges[..idx].iter().rev().find(|range| range.hi >= cid)?;
        let mut units = range.units.clone();
        let last = units.last_mut()?;
        *last = last.wrapping_add(cid - range.lo);
        String::from_utf16(&units).ok()
    }
}

fn checked_cid(bytes: &[u8]) -> Result<u16, CMapErrorKind> {
    let value = checked_code(bytes)?;
    u16::try_from(value).map_err(|_| CMapErrorKind::CidOutOfRange(i64::from(value)))
}

fn utf16_units(bytes: &[u8]) -> Result<Vec<u16>, CMapErrorKind> {
    if bytes.len() % 2 != 0 {
        return Err(CMapErrorKind::InvalidHex);
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|ab| u16::from_be_bytes([ab[0], ab[1]]))
        .collect())
}

fn decode_utf16(units: &[u16]) -> Result<String, CMapErrorKind> {
    String::from_utf16(units).map_err(|_| CMapErrorKind::InvalidUnicode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{SAMPLE_CMAP, SAMPLE_TO_UNICODE};

    #[test]
    fn parsing_sample_cmap() {
        let table = CodeTable::parse("Test-H", SAMPLE_CMAP).unwrap();
        assert_eq!(table.name(), "Test-H");
        assert_eq!(table.system_info().registry, "Adobe");
        assert_eq!(table.system_info().ordering, "Japan1");
        assert_eq!(table.system_info().supplement, 7);
        assert_eq!(table.writing_mode(), 0);
    }

    #[test]
    fn code_lookups_across_ranges() {
        let table = CodeTable::parse("Test-H", SAMPLE_CMAP).unwrap();
        // Single-byte range: <20>..<7e> starts at CID 1.
        assert_eq!(table.cid(0x20), Some(1));
        assert_eq!(table.cid(0x7e), Some(0x5f));
        // Two-byte range: <8140>..<817e> starts at CID 633.
        assert_eq!(table.cid(0x8140), Some(633));
        assert_eq!(table.cid(0x8173), Some(633 + 0x33));
        // Single mapping from `cidchar`.
        assert_eq!(table.cid(0x_00a1_a1f0), Some(9000));
        // Gaps map to nothing.
        assert_eq!(table.cid(0x1f), None);
        assert_eq!(table.cid(0x817f), None);
    }

    #[test]
    fn reverse_lookups_round_trip() {
        let table = CodeTable::parse("Test-H", SAMPLE_CMAP).unwrap();
        for cid in table.cids() {
            let (code, byte_len) = table.code(cid).unwrap();
            assert!((1..=4).contains(&byte_len), "byte_len = {byte_len}");
            assert_eq!(table.cid(code), Some(cid), "cid = {cid}");
        }
        assert_eq!(table.code(0x5555), None);
    }

    #[test]
    fn overlapping_cid_ranges_prefer_the_closest_start() {
        const OVERLAP_CMAP: &[u8] = br"/CIDSystemInfo 3 dict dup begin
  /Registry (Adobe) def
  /Ordering (Identity) def
  /Supplement 0 def
end def
1 begincodespacerange
  <00> <ff>
endcodespacerange
2 begincidrange
  <00> <64> 1
  <32> <3c> 200
endcidrange
endcmap
";
        let table = CodeTable::parse("Overlap-H", OVERLAP_CMAP).unwrap();
        // Inside both ranges the narrower one, starting at <32>, wins.
        assert_eq!(table.cid(0x37), Some(205));
        // Past its end the wide range applies again.
        assert_eq!(table.cid(0x50), Some(0x51));
        assert_eq!(table.cid(0x00), Some(1));
        assert_eq!(table.cid(0x65), None);
    }

    #[test]
    fn overlapping_cid_spans_in_reverse_lookups() {
        const OVERLAP_CMAP: &[u8] = br"/CIDSystemInfo 3 dict dup begin
  /Registry (Adobe) def
  /Ordering (Identity) def
  /Supplement 0 def
end def
1 begincodespacerange
  <00> <ff>
endcodespacerange
2 begincidrange
  <00> <64> 1
  <80> <8a> 50
endcidrange
endcmap
";
        let table = CodeTable::parse("Overlap-H", OVERLAP_CMAP).unwrap();
        // CIDs 50..=60 are reachable from both ranges; the span starting
        // at CID 50 wins for them.
        assert_eq!(table.code(55), Some((0x85, 1)));
        assert_eq!(table.code(49), Some((0x30, 1)));
        assert_eq!(table.code(61), Some((0x3c, 1)));
        assert_eq!(table.code(150), None);
    }

    #[test]
    fn reverse_lookup_reports_code_width() {
        let table = CodeTable::parse("Test-H", SAMPLE_CMAP).unwrap();
        assert_eq!(table.code(1), Some((0x20, 1)));
        assert_eq!(table.code(633), Some((0x8140, 2)));
        assert_eq!(table.code(9000), Some((0x_00a1_a1f0, 4)));
    }

    #[test]
    fn missing_system_info_fails() {
        let err = CodeTable::parse("X", b"begincmap endcmap").unwrap_err();
        assert!(
            matches!(
                &err,
                Error::MalformedCMap {
                    kind: CMapErrorKind::MissingCidSystemInfo,
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn odd_hex_digits_fail() {
        let cmap = b"1 begincidrange <201> <2ff> 5 endcidrange";
        let err = CodeTable::parse("X", cmap).unwrap_err();
        assert!(
            matches!(
                &err,
                Error::MalformedCMap {
                    kind: CMapErrorKind::InvalidHex,
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn unterminated_section_fails() {
        let cmap = b"1 begincidrange <20> <7e> 1";
        let err = CodeTable::parse("X", cmap).unwrap_err();
        assert!(
            matches!(
                &err,
                Error::MalformedCMap {
                    kind: CMapErrorKind::UnterminatedSection("begincidrange"),
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn cid_overflowing_u16_fails() {
        let cmap = b"1 begincidrange <0000> <ffff> 100 endcidrange";
        let err = CodeTable::parse("X", cmap).unwrap_err();
        assert!(
            matches!(
                &err,
                Error::MalformedCMap {
                    kind: CMapErrorKind::CidOutOfRange(100),
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn usecmap_is_rejected() {
        let cmap = b"/Test-V usecmap";
        let err = CodeTable::parse("X", cmap).unwrap_err();
        assert!(
            matches!(
                &err,
                Error::MalformedCMap {
                    kind: CMapErrorKind::UnsupportedUseCmap,
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn parsing_to_unicode_table() {
        let table = UnicodeTable::parse("Test-UCS2", SAMPLE_TO_UNICODE).unwrap();
        assert_eq!(table.unicode(1).as_deref(), Some(" "));
        // bfrange <0005> <000a> maps onto 'A'..
        assert_eq!(table.unicode(5).as_deref(), Some("A"));
        assert_eq!(table.unicode(10).as_deref(), Some("F"));
        // Ligature mapped to a two-scalar sequence.
        assert_eq!(table.unicode(20).as_deref(), Some("fi"));
        // Array destination form.
        assert_eq!(table.unicode(30).as_deref(), Some("X"));
        assert_eq!(table.unicode(31).as_deref(), Some("Y"));
        assert_eq!(table.unicode(900), None);
    }

    #[test]
    fn overlapping_bfranges_prefer_the_closest_start() {
        let cmap: &[u8] = br"1 begincodespacerange
<0000> <ffff>
endcodespacerange
2 beginbfrange
<0010> <0040> <0041>
<0020> <0028> <0061>
endbfrange
endcmap
";
        let table = UnicodeTable::parse("Overlap-UCS2", cmap).unwrap();
        // CID 0x24 sits in both ranges; the one starting at <0020> wins.
        assert_eq!(table.unicode(0x24).as_deref(), Some("e"));
        // Past its end the wide range applies again.
        assert_eq!(table.unicode(0x30).as_deref(), Some("a"));
        assert_eq!(table.unicode(0x10).as_deref(), Some("A"));
        assert_eq!(table.unicode(0x41), None);
    }

    #[test]
    fn bfrange_array_length_mismatch_fails() {
        let cmap = b"1 beginbfrange <0001> <0003> [<0041> <0042>] endbfrange";
        let err = UnicodeTable::parse("X", cmap).unwrap_err();
        assert!(
            matches!(
                &err,
                Error::MalformedCMap {
                    kind: CMapErrorKind::DestinationCountMismatch,
                    ..
                }
            ),
            "{err:?}"
        );
    }
}
