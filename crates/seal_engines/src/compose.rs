#![forbid(unsafe_code)]

//! Submission data to audit-trail document tree. Pure: no I/O, no clock.

use std::collections::BTreeMap;

use seal_kernel_contracts::audit_doc::{
    Block, ComposedDocument, DocumentInfo, FontWeight, ImageBox, Padding, Section, SectionKind,
    Span, Table, TextAlign, TextBox,
};
use seal_kernel_contracts::submission::{
    AccountSettings, FieldType, SubmissionEvent, SubmissionEventType, Submission,
    SubmittedValue, Submitter, TemplateField, TemplateSubmitter,
};
use seal_kernel_contracts::Validate;

use crate::content_hash::collect_checksums;
use crate::error::{CompositionError, DataIntegrityWarning};
use crate::format::{format_currency, format_date_value, format_timestamp, titleize};
use crate::image::{bounded_dimensions, ImageProcessor};
use crate::style::AuditTrailStyle;

#[derive(Debug, Clone, Copy)]
pub struct AuditTrailInput<'a> {
    pub submission: &'a Submission,
    pub account: &'a AccountSettings,
    /// Public verification page; omitted from the cover when `None`.
    pub verify_url: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub document: ComposedDocument,
    pub warnings: Vec<DataIntegrityWarning>,
}

#[derive(Debug, Clone)]
pub struct AuditTrailComposer {
    style: AuditTrailStyle,
}

/// How one submitted value is shown. Every field type maps to exactly one variant.
#[derive(Debug, Clone, PartialEq)]
enum FieldRendering {
    Image {
        attachment_uuid: String,
        width: f32,
    },
    Attachments {
        paid: Option<String>,
        attachment_uuids: Vec<String>,
    },
    Checkbox(String),
    Literal(String),
}

impl AuditTrailComposer {
    pub fn new(style: AuditTrailStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &AuditTrailStyle {
        &self.style
    }

    pub fn compose(
        &self,
        input: &AuditTrailInput<'_>,
        images: &dyn ImageProcessor,
    ) -> Result<Composition, CompositionError> {
        input.submission.validate()?;
        input.account.validate()?;

        let submission = input.submission;
        let mut warnings = Vec::new();
        let mut document = ComposedDocument::new(DocumentInfo {
            title: format!("{} - {}", self.style.labels.title, submission.template.name),
            creator: self.style.creator(),
        });

        document.sections.push(self.cover_section(input));
        if let Some(section) = self.documents_section(input, &mut warnings) {
            document.sections.push(section);
        }
        for item in &submission.template.submitters {
            let Some(submitter) = submission.submitter_by_uuid(&item.uuid) else {
                continue;
            };
            let section = self.submitter_section(input, item, submitter, images, &mut warnings)?;
            document.sections.push(section);
        }
        document
            .sections
            .push(self.event_log_section(input, &mut warnings));

        document.validate()?;

        for warning in &warnings {
            tracing::warn!(
                submission_id = submission.id.0,
                warning = %warning,
                "audit trail composed with missing evidence"
            );
        }
        Ok(Composition { document, warnings })
    }

    pub fn cover_section(&self, input: &AuditTrailInput<'_>) -> Section {
        let style = &self.style;
        let mut section = Section::new(SectionKind::Cover);
        section.push(Block::Text(TextBox {
            spans: vec![Span {
                text: style.product_name.to_string(),
                weight: FontWeight::Bold,
                link: Some(style.product_url.to_string()),
            }],
            font_size: 20.0,
            line_spacing: style.line_spacing,
            align: TextAlign::Left,
            padding: Padding::default(),
        }));
        section.push(Block::Text(TextBox {
            spans: vec![Span::regular(style.labels.title)],
            font_size: style.title_font_size,
            line_spacing: style.line_spacing,
            align: TextAlign::Right,
            padding: Padding::new(0.0, 0.0, 10.0, 0.0),
        }));
        section.push(Block::Text(TextBox {
            spans: vec![Span::regular(format!(
                "{}: {}",
                style.labels.envelope_id, input.submission.id.0
            ))],
            font_size: style.subtitle_font_size,
            line_spacing: style.line_spacing,
            align: TextAlign::Left,
            padding: Padding::new(10.0, 0.0, 10.0, 0.0),
        }));
        if !input.submission.source_embed {
            if let Some(url) = input.verify_url {
                section.push(Block::Text(TextBox {
                    spans: vec![Span::link(style.labels.verify, url)],
                    font_size: style.font_size,
                    line_spacing: style.line_spacing,
                    align: TextAlign::Right,
                    padding: Padding::bottom(10.0),
                }));
            }
        }
        section.push(Block::Divider);
        section
    }

    /// `None` when the last completed submitter produced no result documents.
    pub fn documents_section(
        &self,
        input: &AuditTrailInput<'_>,
        warnings: &mut Vec<DataIntegrityWarning>,
    ) -> Option<Section> {
        let checksums = collect_checksums(input.submission, warnings);
        if checksums.is_empty() {
            return None;
        }
        let labels = &self.style.labels;
        let rows = checksums
            .into_iter()
            .map(|c| {
                let name = match c.url {
                    Some(url) => Span::link(c.filename, url),
                    None => Span::regular(c.filename),
                };
                let details = vec![
                    Span::bold(format!("{}:\n", labels.original_sha256)),
                    Span::regular(c.original_sha256),
                    Span::regular("\n"),
                    Span::bold(format!("{}:\n", labels.result_sha256)),
                    Span::regular(c.result_sha256),
                    Span::regular("\n"),
                    Span::bold(format!("{}: ", labels.generated_at)),
                    Span::regular(format_timestamp(c.generated_at, &input.account.timezone)),
                ];
                vec![
                    self.body_box(vec![name], self.style.line_spacing, Padding::default()),
                    self.body_box(details, self.style.box_line_spacing, Padding::default()),
                ]
            })
            .collect();

        let mut section = Section::new(SectionKind::Documents);
        section.push(Block::Table(Table {
            rows,
            cell_padding: Padding::bottom(self.style.cell_padding_bottom),
        }));
        section.push(Block::Divider);
        Some(section)
    }

    pub fn submitter_section(
        &self,
        input: &AuditTrailInput<'_>,
        item: &TemplateSubmitter,
        submitter: &Submitter,
        images: &dyn ImageProcessor,
        warnings: &mut Vec<DataIntegrityWarning>,
    ) -> Result<Section, CompositionError> {
        let submission = input.submission;
        let mut section = Section::new(SectionKind::Submitter {
            uuid: submitter.uuid.clone(),
        });

        let mut identity = Vec::new();
        if submission.template.submitters.len() > 1 {
            identity.push(Span::regular(format!("{}\n", item.name)));
        }
        if let Some(email) = present(&submitter.email) {
            identity.push(Span::bold(format!("{email}\n")));
        }
        if let Some(name) = present(&submitter.name) {
            identity.push(Span::regular(format!("{name}\n")));
        }
        if let Some(phone) = present(&submitter.phone) {
            identity.push(Span::regular(format!("{phone}\n")));
        }
        section.push(Block::Text(self.body_box(
            identity,
            self.style.box_line_spacing,
            Padding::new(0.0, 20.0, 0.0, 0.0),
        )));

        section.push(Block::Text(self.body_box(
            self.verification_spans(submission, submitter, warnings),
            self.style.box_line_spacing,
            Padding::new(10.0, 20.0, 20.0, 0.0),
        )));

        let mut counters: BTreeMap<FieldType, u32> = BTreeMap::new();
        for field in submission
            .template
            .fields
            .iter()
            .filter(|f| f.submitter_uuid == submitter.uuid)
        {
            let counter = counters.entry(field.field_type).or_insert(0);
            *counter += 1;
            let ordinal = *counter;

            let Some(value) = submitter.value(&field.uuid) else {
                continue;
            };
            if value.is_blank() {
                continue;
            }

            section.push(Block::Text(TextBox {
                spans: vec![Span::regular(self.field_label(field, ordinal))],
                font_size: 6.0,
                line_spacing: self.style.box_line_spacing,
                align: TextAlign::Left,
                padding: Padding::bottom(5.0),
            }));
            let rendering = self.classify(field, value)?;
            self.render_value(field, rendering, submitter, images, warnings, &mut section)?;
        }

        section.push(Block::Divider);
        Ok(section)
    }

    pub fn event_log_section(
        &self,
        input: &AuditTrailInput<'_>,
        warnings: &mut Vec<DataIntegrityWarning>,
    ) -> Section {
        let submission = input.submission;
        let mut section = Section::new(SectionKind::EventLog);
        section.push(Block::Text(TextBox {
            spans: vec![Span::regular(self.style.labels.event_log)],
            font_size: self.style.section_title_font_size,
            line_spacing: self.style.line_spacing,
            align: TextAlign::Left,
            padding: Padding::new(10.0, 0.0, 20.0, 0.0),
        }));

        let mut events: Vec<&SubmissionEvent> = submission.events.iter().collect();
        events.sort_by_key(|e| e.timestamp);
        if events.is_empty() {
            return section;
        }

        let rows = events
            .into_iter()
            .map(|event| {
                let target = match submission.submitter_by_uuid(&event.submitter_uuid) {
                    Some(submitter) => event_target(event.event_type, submitter),
                    None => {
                        warnings.push(DataIntegrityWarning::UnknownEventSubmitter {
                            submitter_uuid: event.submitter_uuid.clone(),
                        });
                        String::new()
                    }
                };
                let preposition = if event.event_type.is_send() {
                    self.style.labels.to
                } else {
                    self.style.labels.by
                };
                vec![
                    self.body_box(
                        vec![Span::regular(format_timestamp(
                            event.timestamp,
                            &input.account.timezone,
                        ))],
                        self.style.line_spacing,
                        Padding::default(),
                    ),
                    self.body_box(
                        vec![
                            Span::bold(event.event_type.human_name()),
                            Span::regular(format!(" {preposition} ")),
                            Span::regular(target),
                        ],
                        self.style.line_spacing,
                        Padding::default(),
                    ),
                ]
            })
            .collect();
        section.push(Block::Table(Table {
            rows,
            cell_padding: Padding::bottom(20.0),
        }));
        section
    }

    fn verification_spans(
        &self,
        submission: &Submission,
        submitter: &Submitter,
        warnings: &mut Vec<DataIntegrityWarning>,
    ) -> Vec<Span> {
        let labels = &self.style.labels;
        let events_of = |ty: SubmissionEventType| {
            submission
                .events
                .iter()
                .find(|e| e.submitter_uuid == submitter.uuid && e.event_type == ty)
        };

        let mut spans = Vec::new();
        if present(&submitter.email).is_some() && events_of(SubmissionEventType::ClickEmail).is_some()
        {
            spans.push(Span::regular(format!(
                "{}: {}\n",
                labels.email_verification, labels.verified
            )));
        }
        let phone_verified = present(&submitter.phone).is_some()
            && submission.template.fields.iter().any(|f| {
                f.field_type == FieldType::Phone
                    && f.submitter_uuid == submitter.uuid
                    && submitter.value(&f.uuid).is_some_and(|v| !v.is_blank())
            });
        if phone_verified {
            spans.push(Span::regular(format!(
                "{}: {}\n",
                labels.phone_verification, labels.verified
            )));
        }

        match events_of(SubmissionEventType::CompleteForm) {
            Some(completed) => {
                let data = &completed.data;
                for (label, value) in [
                    (labels.ip, &data.ip),
                    (labels.session_id, &data.sid),
                    (labels.user_agent, &data.ua),
                ] {
                    if let Some(value) = present(value) {
                        spans.push(Span::regular(format!("{label}: {value}\n")));
                    }
                }
            }
            None => warnings.push(DataIntegrityWarning::MissingCompletionEvent {
                submitter_uuid: submitter.uuid.clone(),
            }),
        }
        spans
    }

    fn field_label(&self, field: &TemplateField, ordinal: u32) -> String {
        match present(&field.name) {
            Some(name) => name.to_uppercase(),
            None => format!(
                "{} {} {}",
                field.field_type.as_str(),
                self.style.labels.field,
                ordinal
            )
            .to_uppercase(),
        }
    }

    fn classify(
        &self,
        field: &TemplateField,
        value: &SubmittedValue,
    ) -> Result<FieldRendering, CompositionError> {
        let rendering = match field.field_type {
            FieldType::Image | FieldType::Signature | FieldType::Initials => {
                let SubmittedValue::Text(uuid) = value else {
                    return Err(CompositionError::MalformedValue {
                        field_uuid: field.uuid.clone(),
                        reason: "image value must reference a single attachment",
                    });
                };
                let width = if field.field_type == FieldType::Initials {
                    self.style.initials_width
                } else {
                    self.style.image_width
                };
                FieldRendering::Image {
                    attachment_uuid: uuid.clone(),
                    width,
                }
            }
            FieldType::File => FieldRendering::Attachments {
                paid: None,
                attachment_uuids: value.entries(),
            },
            FieldType::Payment => FieldRendering::Attachments {
                paid: field.preferences.price.map(|price| {
                    let symbol = field
                        .preferences
                        .currency
                        .as_deref()
                        .and_then(|code| self.style.currency_symbol(code));
                    format_currency(price, symbol)
                }),
                attachment_uuids: value.entries(),
            },
            FieldType::Checkbox => FieldRendering::Checkbox(titleize(&scalar_text(value))),
            FieldType::Date => {
                let format = field
                    .preferences
                    .format
                    .as_deref()
                    .unwrap_or(self.style.default_date_format);
                let text = match value {
                    SubmittedValue::Text(raw) => format_date_value(raw, format),
                    SubmittedValue::List(items) => items
                        .iter()
                        .map(|raw| format_date_value(raw, format))
                        .collect::<Vec<_>>()
                        .join(", "),
                    SubmittedValue::Bool(_) | SubmittedValue::Number(_) => scalar_text(value),
                };
                FieldRendering::Literal(text)
            }
            FieldType::Text
            | FieldType::Number
            | FieldType::Select
            | FieldType::Radio
            | FieldType::Multiple
            | FieldType::Cells
            | FieldType::Phone => FieldRendering::Literal(scalar_text(value)),
        };
        Ok(rendering)
    }

    fn render_value(
        &self,
        field: &TemplateField,
        rendering: FieldRendering,
        submitter: &Submitter,
        images: &dyn ImageProcessor,
        warnings: &mut Vec<DataIntegrityWarning>,
        section: &mut Section,
    ) -> Result<(), CompositionError> {
        match rendering {
            FieldRendering::Image {
                attachment_uuid,
                width,
            } => self.render_image(
                field,
                &attachment_uuid,
                width,
                submitter,
                images,
                warnings,
                section,
            ),
            FieldRendering::Attachments {
                paid,
                attachment_uuids,
            } => {
                self.render_attachments(field, paid, &attachment_uuids, submitter, warnings, section);
                Ok(())
            }
            FieldRendering::Checkbox(text) | FieldRendering::Literal(text) => {
                let text = if text.trim().is_empty() {
                    self.style.labels.not_available.to_string()
                } else {
                    text
                };
                section.push(Block::Text(self.body_box(
                    vec![Span::regular(text)],
                    self.style.line_spacing,
                    Padding::bottom(10.0),
                )));
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_image(
        &self,
        field: &TemplateField,
        attachment_uuid: &str,
        width: f32,
        submitter: &Submitter,
        images: &dyn ImageProcessor,
        warnings: &mut Vec<DataIntegrityWarning>,
        section: &mut Section,
    ) -> Result<(), CompositionError> {
        let Some(attachment) = submitter.attachment(attachment_uuid) else {
            warnings.push(DataIntegrityWarning::MissingAttachment {
                field_uuid: field.uuid.clone(),
                attachment_uuid: attachment_uuid.to_string(),
            });
            return Ok(());
        };
        let image_error = |source| CompositionError::Image {
            field_uuid: field.uuid.clone(),
            source,
        };
        let decoded = images.decode_oriented(&attachment.bytes).map_err(image_error)?;
        let (w, h) = bounded_dimensions(
            decoded.width_px,
            decoded.height_px,
            self.style.max_image_px,
        );
        let raster = images.resize(&decoded, w, h).map_err(image_error)?;
        if raster.width_px == 0 || raster.height_px == 0 {
            return Err(CompositionError::MalformedValue {
                field_uuid: field.uuid.clone(),
                reason: "image has no pixels",
            });
        }
        let height = raster.height_px as f32 * (width / raster.width_px as f32);
        section.push(Block::Image(ImageBox {
            width,
            height,
            raster,
            margin_bottom: 10.0,
        }));
        Ok(())
    }

    fn render_attachments(
        &self,
        field: &TemplateField,
        paid: Option<String>,
        attachment_uuids: &[String],
        submitter: &Submitter,
        warnings: &mut Vec<DataIntegrityWarning>,
        section: &mut Section,
    ) {
        if field.field_type == FieldType::Payment {
            match paid {
                Some(amount) => section.push(Block::Text(self.body_box(
                    vec![Span::regular(format!("{} {amount}\n", self.style.labels.paid))],
                    self.style.line_spacing,
                    Padding::bottom(10.0),
                ))),
                None => warnings.push(DataIntegrityWarning::MissingPaymentPrice {
                    field_uuid: field.uuid.clone(),
                }),
            }
        }

        let mut spans = Vec::new();
        for uuid in attachment_uuids {
            match submitter.attachment(uuid) {
                Some(attachment) => {
                    let text = format!("{}\n", attachment.filename);
                    spans.push(match &attachment.url {
                        Some(url) => Span::link(text, url.clone()),
                        None => Span::regular(text),
                    });
                }
                None => warnings.push(DataIntegrityWarning::MissingAttachment {
                    field_uuid: field.uuid.clone(),
                    attachment_uuid: uuid.clone(),
                }),
            }
        }
        if !spans.is_empty() {
            section.push(Block::Text(self.body_box(
                spans,
                self.style.line_spacing,
                Padding::bottom(10.0),
            )));
        }
    }

    fn body_box(&self, spans: Vec<Span>, line_spacing: f32, padding: Padding) -> TextBox {
        TextBox {
            spans,
            font_size: self.style.font_size,
            line_spacing,
            align: TextAlign::Left,
            padding,
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn scalar_text(value: &SubmittedValue) -> String {
    match value {
        SubmittedValue::Bool(b) => b.to_string(),
        SubmittedValue::Text(s) => s.clone(),
        SubmittedValue::Number(n) => n.to_string(),
        SubmittedValue::List(items) => items.join(", "),
    }
}

fn event_target(event_type: SubmissionEventType, submitter: &Submitter) -> String {
    let target = if event_type.targets_phone() {
        present(&submitter.phone)
    } else {
        present(&submitter.name)
            .or_else(|| present(&submitter.email))
            .or_else(|| present(&submitter.phone))
    };
    target.unwrap_or_default().to_string()
}
