#![forbid(unsafe_code)]

//! Paginated PDF layout of a composed audit trail.

use std::collections::BTreeMap;
use std::io::Write;

use encoding_rs::WINDOWS_1252;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use seal_kernel_contracts::audit_doc::{
    Block, ComposedDocument, FontWeight, ImageBox, Table, TextAlign, TextBox,
};
use seal_kernel_contracts::Validate;

use crate::error::RenderError;
use crate::font::TrueTypeFont;
use crate::style::{AuditTrailStyle, Rgb};

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";
const FONT_UNICODE_REGULAR: &str = "F3";
const FONT_UNICODE_BOLD: &str = "F4";

#[derive(Debug, Clone)]
pub struct PdfRenderer {
    style: AuditTrailStyle,
}

impl PdfRenderer {
    pub fn new(style: AuditTrailStyle) -> Self {
        Self { style }
    }

    /// Serializes the tree. Identical trees give identical bytes.
    pub fn render(&self, composed: &ComposedDocument) -> Result<Vec<u8>, RenderError> {
        composed.validate()?;

        let mut doc = Document::with_version("1.7");
        let mut layout = Layout::new(&self.style, Fonts::load(&self.style)?);
        for section in &composed.sections {
            for block in &section.blocks {
                match block {
                    Block::Text(text) => {
                        let (x, width) = (layout.content_x(), layout.content_width());
                        layout.text_box(text, x, width)?;
                    }
                    Block::Table(table) => layout.table(table)?,
                    Block::Image(image) => layout.image(&mut doc, image)?,
                    Block::Divider => layout.divider(),
                }
            }
        }
        let (pages, fonts) = layout.finish();

        let mut font_resources = dictionary! {
            FONT_REGULAR => Object::Reference(doc.add_object(standard_font("Helvetica"))),
            FONT_BOLD => Object::Reference(doc.add_object(standard_font("Helvetica-Bold"))),
        };
        if let Some(faces) = &fonts.unicode {
            for (i, name) in [FONT_UNICODE_REGULAR, FONT_UNICODE_BOLD].iter().enumerate() {
                if !fonts.used[i].is_empty() {
                    let id = add_unicode_font(&mut doc, &faces[i], &fonts.used[i])?;
                    font_resources.set(*name, Object::Reference(id));
                }
            }
        }
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let content = Content {
                operations: page.operations,
            }
            .encode()
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
            let content_id = doc.add_object(flate_stream(Dictionary::new(), &content)?);

            let mut xobjects = Dictionary::new();
            for (name, id) in &page.images {
                xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
            }
            let resources = dictionary! {
                "Font" => font_resources.clone(),
                "XObject" => xobjects,
            };
            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    self.style.page_width.into(),
                    self.style.page_height.into(),
                ],
                "Contents" => Object::Reference(content_id),
                "Resources" => resources,
            };
            if !page.annotations.is_empty() {
                page_dict.set(
                    "Annots",
                    page.annotations
                        .into_iter()
                        .map(Object::Dictionary)
                        .collect::<Vec<_>>(),
                );
            }
            kids.push(Object::Reference(doc.add_object(page_dict)));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => info_string(&composed.info.title),
            "Creator" => info_string(&composed.info.creator),
            "Producer" => info_string(&composed.info.creator),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.trailer.set("Info", Object::Reference(info_id));

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        tracing::debug!(
            bytes = out.len(),
            unicode_glyphs = fonts.used.iter().map(BTreeMap::len).sum::<usize>(),
            "audit trail rendered"
        );
        Ok(out)
    }
}

fn standard_font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Embeds `font` as a Type0/Identity-H font. Glyph ids are the character codes.
fn add_unicode_font(
    doc: &mut Document,
    font: &TrueTypeFont,
    used: &BTreeMap<u16, char>,
) -> Result<ObjectId, RenderError> {
    let file = font.file();
    let font_file_id = doc.add_object(flate_stream(
        dictionary! { "Length1" => file.data.len() as i64 },
        file.data,
    )?);
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => file.base_font,
        "Flags" => 32i64,
        "FontBBox" => font.bbox().iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
        "ItalicAngle" => 0i64,
        "Ascent" => font.ascent(),
        "Descent" => font.descent(),
        "CapHeight" => font.ascent(),
        "StemV" => 80i64,
        "FontFile2" => Object::Reference(font_file_id),
    });
    let widths: Vec<Object> = used
        .keys()
        .flat_map(|gid| {
            [
                Object::Integer(i64::from(*gid)),
                Object::Array(vec![Object::Integer(i64::from(font.advance(*gid)))]),
            ]
        })
        .collect();
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => file.base_font,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::String(b"Adobe".to_vec(), StringFormat::Literal),
            "Ordering" => Object::String(b"Identity".to_vec(), StringFormat::Literal),
            "Supplement" => 0i64,
        },
        "FontDescriptor" => Object::Reference(descriptor_id),
        "DW" => 1000i64,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });
    let to_unicode_id = doc.add_object(flate_stream(
        Dictionary::new(),
        to_unicode_cmap(used).as_bytes(),
    )?);
    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => file.base_font,
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => Object::Reference(to_unicode_id),
    }))
}

/// Maps glyph ids back to text so copy and search work on the signed PDF.
fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut out = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    let entries: Vec<(&u16, &char)> = used.iter().collect();
    for chunk in entries.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            out.push_str(&format!("<{gid:04X}> <{utf16}>\n"));
        }
        out.push_str("endbfchar\n");
    }
    out.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    out
}

fn flate_stream(mut dict: Dictionary, raw: &[u8]) -> Result<Stream, RenderError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    let compressed = encoder.finish()?;
    dict.set("Filter", "FlateDecode");
    Ok(Stream::new(dict, compressed))
}

/// WinAnsi bytes, or `None` when `text` has characters outside the code page.
fn encode_win_ansi(text: &str) -> Option<Vec<u8>> {
    let (bytes, _, unmappable) = WINDOWS_1252.encode(text);
    (!unmappable).then(|| bytes.into_owned())
}

/// Text string for the info dictionary: UTF-16BE with BOM once outside WinAnsi.
fn info_string(text: &str) -> Object {
    let bytes = encode_win_ansi(text).unwrap_or_else(|| {
        let mut utf16 = vec![0xFE, 0xFF];
        utf16.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
        utf16
    });
    Object::String(bytes, StringFormat::Literal)
}

/// Which font program draws a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    WinAnsi,
    Unicode,
}

fn weight_index(weight: FontWeight) -> usize {
    match weight {
        FontWeight::Regular => 0,
        FontWeight::Bold => 1,
    }
}

#[derive(Debug)]
struct Fonts {
    unicode: Option<[TrueTypeFont; 2]>,
    // Glyph id -> character, per weight.
    used: [BTreeMap<u16, char>; 2],
}

impl Fonts {
    fn load(style: &AuditTrailStyle) -> Result<Self, RenderError> {
        let unicode = match style.unicode_fonts {
            Some(files) => Some([
                TrueTypeFont::parse(files.regular)?,
                TrueTypeFont::parse(files.bold)?,
            ]),
            None => None,
        };
        Ok(Self {
            unicode,
            used: Default::default(),
        })
    }

    fn unicode(&self, weight: FontWeight) -> Option<&TrueTypeFont> {
        self.unicode.as_ref().map(|faces| &faces[weight_index(weight)])
    }

    /// Helvetica when WinAnsi covers `text`, else the embedded face. A character
    /// neither can draw is an error, never a substitute glyph.
    fn face_for(&self, text: &str, weight: FontWeight) -> Result<Face, RenderError> {
        if encode_win_ansi(text).is_some() {
            return Ok(Face::WinAnsi);
        }
        let font = self.unicode(weight);
        match text
            .chars()
            .find(|ch| font.and_then(|f| f.glyph_id(*ch)).is_none())
        {
            Some(ch) => Err(RenderError::UnsupportedCharacter(ch)),
            None => Ok(Face::Unicode),
        }
    }

    fn measure(&self, text: &str, face: Face, weight: FontWeight, size: f32) -> f32 {
        match (face, self.unicode(weight)) {
            (Face::Unicode, Some(font)) => {
                let units: u32 = text
                    .chars()
                    .filter_map(|ch| font.glyph_id(ch))
                    .map(|gid| font.advance(gid))
                    .sum();
                units as f32 * size / 1000.0
            }
            _ => helvetica_width(text, weight, size),
        }
    }

    fn encode(&mut self, text: &str, face: Face, weight: FontWeight) -> Object {
        let index = weight_index(weight);
        match (face, &self.unicode) {
            (Face::Unicode, Some(faces)) => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    if let Some(gid) = faces[index].glyph_id(ch) {
                        bytes.extend_from_slice(&gid.to_be_bytes());
                        self.used[index].entry(gid).or_insert(ch);
                    }
                }
                Object::String(bytes, StringFormat::Hexadecimal)
            }
            _ => Object::String(
                encode_win_ansi(text).unwrap_or_default(),
                StringFormat::Literal,
            ),
        }
    }

    fn resource_name(face: Face, weight: FontWeight) -> &'static str {
        match (face, weight) {
            (Face::WinAnsi, FontWeight::Regular) => FONT_REGULAR,
            (Face::WinAnsi, FontWeight::Bold) => FONT_BOLD,
            (Face::Unicode, FontWeight::Regular) => FONT_UNICODE_REGULAR,
            (Face::Unicode, FontWeight::Bold) => FONT_UNICODE_BOLD,
        }
    }
}

#[derive(Debug, Default)]
struct PageBuild {
    operations: Vec<Operation>,
    annotations: Vec<Dictionary>,
    images: Vec<(String, ObjectId)>,
}

#[derive(Debug, Clone, PartialEq)]
struct Run {
    text: String,
    weight: FontWeight,
    face: Face,
    link: Option<String>,
}

type Line = Vec<Run>;

struct Layout<'a> {
    style: &'a AuditTrailStyle,
    fonts: Fonts,
    pages: Vec<PageBuild>,
    cursor_y: f32,
    image_count: usize,
}

impl<'a> Layout<'a> {
    fn new(style: &'a AuditTrailStyle, fonts: Fonts) -> Self {
        let mut layout = Self {
            style,
            fonts,
            pages: Vec::new(),
            cursor_y: 0.0,
            image_count: 0,
        };
        layout.new_page();
        layout
    }

    fn top(&self) -> f32 {
        self.style.page_height - self.style.margin
    }

    fn content_x(&self) -> f32 {
        self.style.margin
    }

    fn content_width(&self) -> f32 {
        self.style.content_width()
    }

    fn new_page(&mut self) {
        let s = self.style;
        let [r, g, b] = s.band_color.components();
        let mut page = PageBuild::default();
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new(
                "re",
                vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    s.page_width.into(),
                    s.band_height.into(),
                ],
            ),
            Operation::new(
                "re",
                vec![
                    Object::Integer(0),
                    (s.page_height - s.band_height).into(),
                    s.page_width.into(),
                    s.band_height.into(),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
        self.pages.push(page);
        self.cursor_y = self.top();
    }

    fn page(&mut self) -> &mut PageBuild {
        if self.pages.is_empty() {
            self.new_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn at_page_top(&self) -> bool {
        (self.cursor_y - self.top()).abs() < f32::EPSILON
    }

    /// Breaks the page unless `height` still fits above the bottom margin.
    fn ensure_space(&mut self, height: f32) {
        if self.cursor_y - height < self.style.margin && !self.at_page_top() {
            self.new_page();
        }
    }

    fn finish(self) -> (Vec<PageBuild>, Fonts) {
        (self.pages, self.fonts)
    }

    fn text_box(&mut self, text: &TextBox, x: f32, width: f32) -> Result<(), RenderError> {
        let inner = (width - text.padding.left - text.padding.right).max(1.0);
        let lines = wrap_box(&self.fonts, text, inner)?;
        let line_height = text.font_size * text.line_spacing;

        self.ensure_space(text.padding.top + line_height);
        self.cursor_y -= text.padding.top;
        for line in &lines {
            self.ensure_space(line_height);
            self.draw_line(line, text, x + text.padding.left, inner);
            self.cursor_y -= line_height;
        }
        self.cursor_y -= text.padding.bottom;
        Ok(())
    }

    fn draw_line(&mut self, line: &Line, text: &TextBox, x: f32, width: f32) {
        let size = text.font_size;
        let baseline = self.cursor_y - size;
        let line_width: f32 = line
            .iter()
            .map(|r| self.fonts.measure(&r.text, r.face, r.weight, size))
            .sum();
        let mut pen = match text.align {
            TextAlign::Left => x,
            TextAlign::Right => x + (width - line_width).max(0.0),
        };
        let text_color = self.style.text_color;
        let link_color = self.style.link_color;

        for run in line {
            let run_width = self.fonts.measure(&run.text, run.face, run.weight, size);
            let color = if run.link.is_some() {
                link_color
            } else {
                text_color
            };
            let font = Fonts::resource_name(run.face, run.weight);
            let encoded = self.fonts.encode(&run.text, run.face, run.weight);
            let ops = text_operations(encoded, font, size, color, pen, baseline);
            let page = self.page();
            page.operations.extend(ops);
            if let Some(url) = &run.link {
                page.annotations.push(link_annotation(
                    url,
                    [pen, baseline - 2.0, pen + run_width, baseline + size],
                ));
            }
            pen += run_width;
        }
    }

    fn table(&mut self, table: &Table) -> Result<(), RenderError> {
        for row in &table.rows {
            let columns = row.len().max(1) as f32;
            let column_width = self.content_width() / columns;
            let cell_width =
                column_width - table.cell_padding.left - table.cell_padding.right;
            let mut row_height = 0.0f32;
            for cell in row {
                row_height = row_height.max(box_height(&self.fonts, cell, cell_width)?);
            }
            let row_height = row_height + table.cell_padding.top + table.cell_padding.bottom;
            self.ensure_space(row_height);

            let row_top = self.cursor_y;
            let mut lowest = row_top;
            for (i, cell) in row.iter().enumerate() {
                self.cursor_y = row_top - table.cell_padding.top;
                let x = self.content_x() + column_width * i as f32 + table.cell_padding.left;
                let page_before = self.pages.len();
                self.text_box(cell, x, cell_width)?;
                if self.pages.len() != page_before {
                    lowest = self.cursor_y;
                } else {
                    lowest = lowest.min(self.cursor_y);
                }
            }
            self.cursor_y = lowest - table.cell_padding.bottom;
        }
        Ok(())
    }

    fn image(&mut self, doc: &mut Document, image: &ImageBox) -> Result<(), RenderError> {
        let (width, height) = fit_within(
            image.width,
            image.height,
            self.content_width(),
            (self.top() - self.style.margin - image.margin_bottom).max(1.0),
        );
        self.ensure_space(height + image.margin_bottom);
        let raster = &image.raster;
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(raster.width_px),
            "Height" => i64::from(raster.height_px),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        };
        let id = doc.add_object(flate_stream(dict, &raster.rgb)?);
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let x = self.content_x();
        let y = self.cursor_y - height;
        let page = self.page();
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        page.images.push((name, id));
        self.cursor_y = y - image.margin_bottom;
        Ok(())
    }

    fn divider(&mut self) {
        self.ensure_space(1.0 + self.style.divider_margin_bottom);
        let [r, g, b] = self.style.divider_color.components();
        let x0 = self.content_x();
        let x1 = x0 + self.content_width();
        let y = self.cursor_y - 0.5;
        self.page().operations.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", vec![r.into(), g.into(), b.into()]),
            Operation::new("w", vec![Object::Integer(1)]),
            Operation::new("m", vec![x0.into(), y.into()]),
            Operation::new("l", vec![x1.into(), y.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        self.cursor_y -= 1.0 + self.style.divider_margin_bottom;
    }
}

/// Shrinks a box, aspect ratio kept, until it fits `max_width` x `max_height`.
fn fit_within(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    let scale = (max_width / width).min(max_height / height).min(1.0);
    if !scale.is_finite() || scale <= 0.0 {
        return (width, height);
    }
    (width * scale, height * scale)
}

fn text_operations(
    encoded: Object,
    font: &str,
    size: f32,
    color: Rgb,
    x: f32,
    y: f32,
) -> Vec<Operation> {
    let [r, g, b] = color.components();
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![encoded]),
        Operation::new("ET", vec![]),
    ]
}

fn link_annotation(url: &str, rect: [f32; 4]) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect.iter().map(|v| Object::from(*v)).collect::<Vec<_>>(),
        "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::String(url.as_bytes().to_vec(), StringFormat::Literal),
        },
    }
}

fn box_height(fonts: &Fonts, text: &TextBox, width: f32) -> Result<f32, RenderError> {
    let inner = (width - text.padding.left - text.padding.right).max(1.0);
    let lines = wrap_box(fonts, text, inner)?.len() as f32;
    Ok(text.padding.top + lines * text.font_size * text.line_spacing + text.padding.bottom)
}

/// Splits spans at `\n`, then greedily wraps each logical line to `width`.
fn wrap_box(fonts: &Fonts, text: &TextBox, width: f32) -> Result<Vec<Line>, RenderError> {
    let mut logical: Vec<Line> = vec![Vec::new()];
    for span in &text.spans {
        for (i, part) in span.text.split('\n').enumerate() {
            if i > 0 {
                logical.push(Vec::new());
            }
            if !part.is_empty() {
                let face = fonts.face_for(part, span.weight)?;
                if let Some(line) = logical.last_mut() {
                    line.push(Run {
                        text: part.to_string(),
                        weight: span.weight,
                        face,
                        link: span.link.clone(),
                    });
                }
            }
        }
    }
    Ok(logical
        .into_iter()
        .filter(|line| line.iter().any(|r| !r.text.is_empty()))
        .flat_map(|line| wrap_line(fonts, line, text.font_size, width))
        .collect())
}

fn wrap_line(fonts: &Fonts, line: Line, size: f32, width: f32) -> Vec<Line> {
    let measure = |text: &str, run: &Run| fonts.measure(text, run.face, run.weight, size);
    let mut out: Vec<Line> = Vec::new();
    let mut current: Line = Vec::new();
    let mut current_width = 0.0f32;

    for run in line {
        for piece in run.text.split_inclusive(' ') {
            let fit_width = measure(piece.trim_end(), &run);
            if current_width + fit_width > width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            let piece = if current.is_empty() {
                piece.trim_start()
            } else {
                piece
            };
            if measure(piece.trim_end(), &run) > width {
                for ch in piece.chars() {
                    let mut buf = [0; 4];
                    let ch_text: &str = ch.encode_utf8(&mut buf);
                    let ch_width = measure(ch_text, &run);
                    if current_width + ch_width > width && !current.is_empty() {
                        out.push(std::mem::take(&mut current));
                        current_width = 0.0;
                    }
                    push_run(&mut current, &ch.to_string(), &run);
                    current_width += ch_width;
                }
                continue;
            }
            if !piece.is_empty() {
                push_run(&mut current, piece, &run);
                current_width += measure(piece, &run);
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn push_run(line: &mut Line, text: &str, like: &Run) {
    if let Some(last) = line.last_mut() {
        if last.weight == like.weight && last.face == like.face && last.link == like.link {
            last.text.push_str(text);
            return;
        }
    }
    line.push(Run {
        text: text.to_string(),
        weight: like.weight,
        face: like.face,
        link: like.link.clone(),
    });
}

/// Width in points using the standard Helvetica metrics.
fn helvetica_width(text: &str, weight: FontWeight, size: f32) -> f32 {
    let table = match weight {
        FontWeight::Regular => &HELVETICA_WIDTHS,
        FontWeight::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                u32::from(table[(code - 32) as usize])
            } else {
                556
            }
        })
        .sum();
    units as f32 * size / 1000.0
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
