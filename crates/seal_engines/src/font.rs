#![forbid(unsafe_code)]

//! TrueType reader for embedding: cmap lookup and horizontal metrics only.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::RenderError;

/// Bundled faces used for text outside WinAnsi.
pub const DEJAVU_SANS: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");
pub const DEJAVU_SANS_BOLD: &[u8] = include_bytes!("../fonts/DejaVuSans-Bold.ttf");

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UnicodeFontFile {
    pub base_font: &'static str,
    pub data: &'static [u8],
}

impl fmt::Debug for UnicodeFontFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnicodeFontFile")
            .field("base_font", &self.base_font)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeFonts {
    pub regular: UnicodeFontFile,
    pub bold: UnicodeFontFile,
}

impl UnicodeFonts {
    pub fn dejavu_sans() -> Self {
        Self {
            regular: UnicodeFontFile {
                base_font: "DejaVuSans",
                data: DEJAVU_SANS,
            },
            bold: UnicodeFontFile {
                base_font: "DejaVuSans-Bold",
                data: DEJAVU_SANS_BOLD,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmapTable {
    // Format 4, BMP only.
    Segmented(usize),
    // Format 12, full Unicode.
    Groups(usize),
}

#[derive(Clone)]
pub struct TrueTypeFont {
    file: UnicodeFontFile,
    units_per_em: u16,
    bbox: [i16; 4],
    ascent: i16,
    descent: i16,
    num_h_metrics: u16,
    hmtx: usize,
    cmap: CmapTable,
}

impl fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("base_font", &self.file.base_font)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

fn u16_at(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at.checked_add(2)?)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn u32_at(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at.checked_add(4)?)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn malformed(what: &str) -> RenderError {
    RenderError::Font(format!("malformed font: {what}"))
}

impl TrueTypeFont {
    pub fn parse(file: UnicodeFontFile) -> Result<Self, RenderError> {
        let data = file.data;
        let num_tables = u16_at(data, 4).ok_or_else(|| malformed("header"))?;

        let mut tables: BTreeMap<[u8; 4], usize> = BTreeMap::new();
        for i in 0..usize::from(num_tables) {
            let rec = 12 + 16 * i;
            let tag = data
                .get(rec..rec + 4)
                .and_then(|t| <[u8; 4]>::try_from(t).ok())
                .ok_or_else(|| malformed("table directory"))?;
            let offset = u32_at(data, rec + 8).ok_or_else(|| malformed("table directory"))?;
            let length = u32_at(data, rec + 12).ok_or_else(|| malformed("table directory"))?;
            let (offset, length) = (offset as usize, length as usize);
            if offset.checked_add(length).map_or(true, |end| end > data.len()) {
                return Err(malformed("table out of bounds"));
            }
            tables.insert(tag, offset);
        }
        let table = |tag: &[u8; 4]| {
            tables.get(tag).copied().ok_or_else(|| {
                RenderError::Font(format!(
                    "font lacks {} table",
                    String::from_utf8_lossy(tag)
                ))
            })
        };
        let field = |at: usize| u16_at(data, at).ok_or_else(|| malformed("truncated table"));

        let head = table(b"head")?;
        let hhea = table(b"hhea")?;
        let hmtx = table(b"hmtx")?;
        let cmap = table(b"cmap")?;

        let units_per_em = field(head + 18)?;
        let num_h_metrics = field(hhea + 34)?;
        if units_per_em == 0 || num_h_metrics == 0 {
            return Err(malformed("zero metrics"));
        }
        let bbox = [
            field(head + 36)? as i16,
            field(head + 38)? as i16,
            field(head + 40)? as i16,
            field(head + 42)? as i16,
        ];
        let cmap = select_cmap(data, cmap)
            .ok_or_else(|| RenderError::Font("font has no unicode cmap subtable".to_string()))?;

        Ok(Self {
            file,
            units_per_em,
            bbox,
            ascent: field(hhea + 4)? as i16,
            descent: field(hhea + 6)? as i16,
            num_h_metrics,
            hmtx,
            cmap,
        })
    }

    pub fn file(&self) -> UnicodeFontFile {
        self.file
    }

    /// Glyph for `ch`, or `None` when the face has no outline for it.
    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        let data = self.file.data;
        let code = u32::from(ch);
        let gid = match self.cmap {
            CmapTable::Groups(sub) => {
                let groups = u32_at(data, sub + 12)? as usize;
                let mut found = None;
                for i in 0..groups {
                    let group = sub + 16 + 12 * i;
                    let start = u32_at(data, group)?;
                    let end = u32_at(data, group + 4)?;
                    if (start..=end).contains(&code) {
                        let first = u32_at(data, group + 8)?;
                        found = u16::try_from(first + (code - start)).ok();
                        break;
                    }
                }
                found?
            }
            CmapTable::Segmented(sub) => {
                let code = u16::try_from(code).ok()?;
                let seg_count = usize::from(u16_at(data, sub + 6)? / 2);
                let ends = sub + 14;
                let starts = ends + 2 * seg_count + 2;
                let deltas = starts + 2 * seg_count;
                let range_offsets = deltas + 2 * seg_count;
                let mut found = None;
                for i in 0..seg_count {
                    if code > u16_at(data, ends + 2 * i)? {
                        continue;
                    }
                    let start = u16_at(data, starts + 2 * i)?;
                    if code < start {
                        break;
                    }
                    let delta = u16_at(data, deltas + 2 * i)?;
                    let range_offset = u16_at(data, range_offsets + 2 * i)?;
                    found = Some(if range_offset == 0 {
                        code.wrapping_add(delta)
                    } else {
                        let at = range_offsets
                            + 2 * i
                            + usize::from(range_offset)
                            + 2 * usize::from(code - start);
                        match u16_at(data, at)? {
                            0 => 0,
                            glyph => glyph.wrapping_add(delta),
                        }
                    });
                    break;
                }
                found?
            }
        };
        (gid != 0).then_some(gid)
    }

    /// Advance width in 1/1000 em, the unit of PDF glyph widths.
    pub fn advance(&self, gid: u16) -> u32 {
        let index = gid.min(self.num_h_metrics - 1);
        let raw = u16_at(self.file.data, self.hmtx + 4 * usize::from(index)).unwrap_or(0);
        u32::from(raw) * 1000 / u32::from(self.units_per_em)
    }

    fn scaled(&self, v: i16) -> i64 {
        i64::from(v) * 1000 / i64::from(self.units_per_em)
    }

    pub fn bbox(&self) -> [i64; 4] {
        self.bbox.map(|v| self.scaled(v))
    }

    pub fn ascent(&self) -> i64 {
        self.scaled(self.ascent)
    }

    pub fn descent(&self) -> i64 {
        self.scaled(self.descent)
    }
}

fn select_cmap(data: &[u8], cmap: usize) -> Option<CmapTable> {
    let count = u16_at(data, cmap + 2)?;
    let mut segmented = None;
    for i in 0..usize::from(count) {
        let rec = cmap + 4 + 8 * i;
        let platform = u16_at(data, rec)?;
        let encoding = u16_at(data, rec + 2)?;
        let sub = cmap + u32_at(data, rec + 4)? as usize;
        let unicode = platform == 0 || (platform == 3 && (encoding == 1 || encoding == 10));
        if !unicode {
            continue;
        }
        match u16_at(data, sub)? {
            12 => return Some(CmapTable::Groups(sub)),
            4 => {
                segmented.get_or_insert(CmapTable::Segmented(sub));
            }
            _ => {}
        }
    }
    segmented
}
