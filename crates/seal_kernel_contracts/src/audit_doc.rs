#![forbid(unsafe_code)]

//! Structural, unsigned representation of an audit trail. Producing this tree
//! performs no I/O; turning it into bytes is the renderer's job.

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, SchemaVersion, Validate};

pub const AUDIT_DOC_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Padding {
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn bottom(bottom: f32) -> Self {
        Self {
            bottom,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub weight: FontWeight,
    pub link: Option<String>,
}

impl Span {
    pub fn regular(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: FontWeight::Regular,
            link: None,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: FontWeight::Bold,
            link: None,
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: FontWeight::Regular,
            link: Some(url.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub spans: Vec<Span>,
    pub font_size: f32,
    pub line_spacing: f32,
    pub align: TextAlign,
    pub padding: Padding,
}

impl TextBox {
    /// Visible lines, in order. Empty lines are dropped.
    pub fn lines(&self) -> Vec<String> {
        let joined: String = self.spans.iter().map(|s| s.text.as_str()).collect();
        joined
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<TextBox>>,
    pub cell_padding: Padding,
}

/// Decoded 8-bit RGB pixels, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterImage {
    pub width_px: u32,
    pub height_px: u32,
    pub rgb: Vec<u8>,
}

impl Validate for RasterImage {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.width_px == 0 || self.height_px == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "raster_image.dimensions",
                reason: "must be > 0",
            });
        }
        let expected = (self.width_px as usize)
            .saturating_mul(self.height_px as usize)
            .saturating_mul(3);
        if self.rgb.len() != expected {
            return Err(ContractViolation::InvalidValue {
                field: "raster_image.rgb",
                reason: "length must equal width * height * 3",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBox {
    pub width: f32,
    pub height: f32,
    pub raster: RasterImage,
    pub margin_bottom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    Text(TextBox),
    Table(Table),
    Image(ImageBox),
    Divider,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Cover,
    Documents,
    Submitter { uuid: String },
    EventLog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: String,
    pub creator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedDocument {
    pub schema_version: SchemaVersion,
    pub info: DocumentInfo,
    pub sections: Vec<Section>,
}

impl ComposedDocument {
    pub fn new(info: DocumentInfo) -> Self {
        Self {
            schema_version: AUDIT_DOC_CONTRACT_VERSION,
            info,
            sections: Vec::new(),
        }
    }

    pub fn section(&self, kind: &SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| &s.kind == kind)
    }

    /// Every visible text line in reading order (tables row by row, cells left to right).
    pub fn text_lines(&self) -> Vec<String> {
        self.sections.iter().flat_map(section_lines).collect()
    }
}

pub fn section_lines(section: &Section) -> Vec<String> {
    let mut out = Vec::new();
    for block in &section.blocks {
        match block {
            Block::Text(text) => out.extend(text.lines()),
            Block::Table(table) => {
                for row in &table.rows {
                    for cell in row {
                        out.extend(cell.lines());
                    }
                }
            }
            Block::Image(_) | Block::Divider => {}
        }
    }
    out
}

impl Validate for ComposedDocument {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != AUDIT_DOC_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "composed_document.schema_version",
                reason: "must match AUDIT_DOC_CONTRACT_VERSION",
            });
        }
        if !matches!(self.sections.first().map(|s| &s.kind), Some(SectionKind::Cover)) {
            return Err(ContractViolation::InvalidValue {
                field: "composed_document.sections",
                reason: "must start with the cover section",
            });
        }
        for section in &self.sections {
            for block in &section.blocks {
                match block {
                    Block::Image(image) => {
                        image.raster.validate()?;
                        if !(image.width > 0.0 && image.height > 0.0) {
                            return Err(ContractViolation::InvalidValue {
                                field: "composed_document.image",
                                reason: "display size must be > 0",
                            });
                        }
                    }
                    Block::Table(table) => {
                        if table.rows.iter().any(Vec::is_empty) {
                            return Err(ContractViolation::InvalidValue {
                                field: "composed_document.table.rows",
                                reason: "rows must not be empty",
                            });
                        }
                    }
                    Block::Text(text) => {
                        if !(text.font_size > 0.0) {
                            return Err(ContractViolation::InvalidValue {
                                field: "composed_document.text.font_size",
                                reason: "must be > 0",
                            });
                        }
                    }
                    Block::Divider => {}
                }
            }
        }
        Ok(())
    }
}
