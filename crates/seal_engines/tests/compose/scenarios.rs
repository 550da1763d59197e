#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use seal_engines::content_hash::{encode_digest, sha256_digest};
use seal_engines::image::ImageProcessor;
use seal_engines::{
    AuditTrailComposer, AuditTrailInput, AuditTrailStyle, Composition, DataIntegrityWarning,
    ImageProcessingError, PdfRenderer,
};
use seal_kernel_contracts::audit_doc::{section_lines, Block, RasterImage, SectionKind};
use seal_kernel_contracts::submission::{
    AccountSettings, AccountTimezone, Document, EventData, FieldPreferences, FieldType,
    Submission, SubmissionEvent, SubmissionEventType, SubmittedValue, Submitter,
    SubmitterAttachment, Template, TemplateField, TemplateSubmitter,
};
use seal_kernel_contracts::{AccountId, SubmissionId, SubmitterId, UnixTimeMs};

const T0: i64 = 1_704_465_000_000;

struct TinyImages;

impl ImageProcessor for TinyImages {
    fn decode_oriented(&self, _bytes: &[u8]) -> Result<RasterImage, ImageProcessingError> {
        Ok(RasterImage {
            width_px: 2,
            height_px: 2,
            rgb: vec![200; 12],
        })
    }
}

fn account() -> AccountSettings {
    AccountSettings::v1(AccountId(9), AccountTimezone::utc(), "en".to_string(), None).unwrap()
}

fn submitter(uuid: &str, name: Option<&str>, email: Option<&str>) -> Submitter {
    Submitter {
        id: SubmitterId(1),
        uuid: uuid.to_string(),
        name: name.map(ToString::to_string),
        email: email.map(ToString::to_string),
        phone: None,
        completed_at: Some(UnixTimeMs(T0)),
        attachments: vec![],
        values: BTreeMap::new(),
        documents: vec![],
    }
}

fn text_field(uuid: &str, submitter_uuid: &str, name: &str) -> TemplateField {
    TemplateField::v1(
        uuid.to_string(),
        FieldType::Text,
        submitter_uuid.to_string(),
        Some(name.to_string()),
        FieldPreferences::default(),
    )
    .unwrap()
}

fn event(submitter_uuid: &str, ty: SubmissionEventType, at: i64, ip: Option<&str>) -> SubmissionEvent {
    SubmissionEvent::v1(
        submitter_uuid.to_string(),
        ty,
        UnixTimeMs(at),
        EventData {
            ip: ip.map(ToString::to_string),
            sid: None,
            ua: None,
        },
    )
    .unwrap()
}

fn template(
    submitters: Vec<(&str, &str)>,
    fields: Vec<TemplateField>,
    documents: Vec<Document>,
) -> Template {
    Template {
        name: "NDA".to_string(),
        submitters: submitters
            .into_iter()
            .map(|(uuid, name)| TemplateSubmitter {
                uuid: uuid.to_string(),
                name: name.to_string(),
            })
            .collect(),
        fields,
        documents,
        schema: vec![],
    }
}

fn compose(submission: &Submission) -> Composition {
    let account = account();
    let input = AuditTrailInput {
        submission,
        account: &account,
        verify_url: Some("https://sign.example/verify"),
    };
    AuditTrailComposer::new(AuditTrailStyle::mvp_v1())
        .compose(&input, &TinyImages)
        .unwrap()
}

fn submitter_section_lines(composition: &Composition, uuid: &str) -> Vec<String> {
    section_lines(
        composition
            .document
            .section(&SectionKind::Submitter {
                uuid: uuid.to_string(),
            })
            .unwrap(),
    )
}

fn jane_submission(events: Vec<SubmissionEvent>) -> Submission {
    let mut jane = submitter("s1", Some("Jane Doe"), Some("jane@x.com"));
    jane.values
        .insert("f1".to_string(), SubmittedValue::Text("Jane Doe".to_string()));
    Submission::v1(
        SubmissionId(1001),
        AccountId(9),
        template(vec![("s1", "First Party")], vec![text_field("f1", "s1", "Full Name")], vec![]),
        vec![jane],
        events,
        false,
    )
    .unwrap()
}

#[test]
fn at_compose_sc_01_single_submitter_summary() {
    let submission = jane_submission(vec![event(
        "s1",
        SubmissionEventType::CompleteForm,
        T0,
        Some("1.2.3.4"),
    )]);
    let composition = compose(&submission);
    let lines = submitter_section_lines(&composition, "s1");

    for expected in ["Jane Doe", "jane@x.com", "FULL NAME", "IP: 1.2.3.4"] {
        assert!(lines.contains(&expected.to_string()), "missing {expected}: {lines:?}");
    }
    assert!(!lines.iter().any(|l| l.starts_with("Email verification")));
    assert!(!lines.contains(&"First Party".to_string()));
    assert!(composition.warnings.is_empty());
}

#[test]
fn at_compose_sc_02_email_click_marks_email_verified() {
    let submission = jane_submission(vec![
        event("s1", SubmissionEventType::ClickEmail, T0 - 1000, None),
        event("s1", SubmissionEventType::CompleteForm, T0, Some("1.2.3.4")),
    ]);
    let lines = submitter_section_lines(&compose(&submission), "s1");
    assert!(lines.contains(&"Email verification: Verified".to_string()));
}

#[test]
fn at_compose_sc_03_payment_prints_paid_amount_before_files() {
    let mut payer = submitter("s1", Some("Jane Doe"), None);
    payer.attachments.push(SubmitterAttachment {
        uuid: "rcpt".to_string(),
        filename: "receipt.pdf".to_string(),
        url: Some("https://files.example/rcpt".to_string()),
        bytes: vec![],
    });
    payer.values.insert(
        "pay".to_string(),
        SubmittedValue::List(vec!["rcpt".to_string()]),
    );
    let payment = TemplateField::v1(
        "pay".to_string(),
        FieldType::Payment,
        "s1".to_string(),
        None,
        FieldPreferences {
            currency: Some("EUR".to_string()),
            price: Some(Decimal::from_str("25.00").unwrap()),
            format: None,
        },
    )
    .unwrap();
    let submission = Submission::v1(
        SubmissionId(1002),
        AccountId(9),
        template(vec![("s1", "Payer")], vec![payment], vec![]),
        vec![payer],
        vec![event("s1", SubmissionEventType::CompleteForm, T0, None)],
        false,
    )
    .unwrap();

    let lines = submitter_section_lines(&compose(&submission), "s1");
    let paid = lines.iter().position(|l| l == "Paid €25.00").unwrap();
    let file = lines.iter().position(|l| l == "receipt.pdf").unwrap();
    assert!(paid < file);
    assert!(lines.contains(&"PAYMENT FIELD 1".to_string()));
}

#[test]
fn at_compose_sc_04_name_labels_only_with_several_submitters() {
    let a = submitter("s1", Some("Jane Doe"), Some("jane@x.com"));
    let b = submitter("s2", Some("John Roe"), Some("john@x.com"));
    let submission = Submission::v1(
        SubmissionId(1003),
        AccountId(9),
        template(vec![("s1", "First Party"), ("s2", "Second Party")], vec![], vec![]),
        vec![b, a],
        vec![],
        false,
    )
    .unwrap();
    let composition = compose(&submission);

    let first = submitter_section_lines(&composition, "s1");
    let second = submitter_section_lines(&composition, "s2");
    assert_eq!(first.first().map(String::as_str), Some("First Party"));
    assert_eq!(second.first().map(String::as_str), Some("Second Party"));

    // Template order decides section order, not submission order.
    let kinds: Vec<&SectionKind> = composition.document.sections.iter().map(|s| &s.kind).collect();
    let s1_at = kinds
        .iter()
        .position(|k| **k == SectionKind::Submitter { uuid: "s1".to_string() })
        .unwrap();
    let s2_at = kinds
        .iter()
        .position(|k| **k == SectionKind::Submitter { uuid: "s2".to_string() })
        .unwrap();
    assert!(s1_at < s2_at);
}

#[test]
fn at_compose_sc_05_result_digest_matches_result_bytes() {
    let original = Document {
        uuid: "doc1".to_string(),
        filename: "nda.pdf".to_string(),
        url: None,
        is_image: false,
        bytes: b"original bytes".to_vec(),
        sha256: None,
        created_at: UnixTimeMs(T0 - 10_000),
    };
    let mut result = original.clone();
    result.filename = "nda-signed.pdf".to_string();
    result.bytes = b"%PDF-1.7 signed result".to_vec();
    result.created_at = UnixTimeMs(T0);

    let mut jane = submitter("s1", Some("Jane Doe"), None);
    jane.documents.push(result.clone());
    let submission = Submission::v1(
        SubmissionId(1004),
        AccountId(9),
        template(vec![("s1", "First Party")], vec![], vec![original.clone()]),
        vec![jane],
        vec![],
        false,
    )
    .unwrap();
    let composition = compose(&submission);
    let lines = section_lines(composition.document.section(&SectionKind::Documents).unwrap());

    let result_at = lines.iter().position(|l| l == "Result SHA256:").unwrap();
    assert_eq!(lines[result_at + 1], encode_digest(&sha256_digest(&result.bytes)));
    let original_at = lines.iter().position(|l| l == "Original SHA256:").unwrap();
    assert_eq!(lines[original_at + 1], encode_digest(&sha256_digest(&original.bytes)));
    assert!(lines.contains(&"Generated at: January 05, 2024 14:30 UTC".to_string()));
}

#[test]
fn at_compose_sc_06_missing_original_is_absorbed_as_warning() {
    let result = Document {
        uuid: "generated".to_string(),
        filename: "out.pdf".to_string(),
        url: None,
        is_image: false,
        bytes: b"out".to_vec(),
        sha256: None,
        created_at: UnixTimeMs(T0),
    };
    let mut jane = submitter("s1", Some("Jane Doe"), None);
    jane.documents.push(result);
    let submission = Submission::v1(
        SubmissionId(1005),
        AccountId(9),
        template(vec![("s1", "First Party")], vec![], vec![]),
        vec![jane],
        vec![],
        false,
    )
    .unwrap();
    let composition = compose(&submission);
    assert!(composition
        .warnings
        .contains(&DataIntegrityWarning::MissingOriginalDocument {
            document_uuid: "generated".to_string()
        }));
    assert!(composition
        .warnings
        .contains(&DataIntegrityWarning::MissingCompletionEvent {
            submitter_uuid: "s1".to_string()
        }));
    assert!(composition.document.section(&SectionKind::Documents).is_some());
}

#[test]
fn at_compose_sc_07_event_log_is_chronological_with_direction() {
    let mut jane = submitter("s1", Some("Jane Doe"), Some("jane@x.com"));
    jane.phone = Some("+15550100".to_string());
    let submission = Submission::v1(
        SubmissionId(1006),
        AccountId(9),
        template(vec![("s1", "First Party")], vec![], vec![]),
        vec![jane],
        vec![
            event("s1", SubmissionEventType::CompleteForm, T0 + 60_000, None),
            event("s1", SubmissionEventType::SendSms, T0, None),
            event("s1", SubmissionEventType::SendEmail, T0 - 60_000, None),
        ],
        false,
    )
    .unwrap();
    let composition = compose(&submission);
    let lines = section_lines(composition.document.section(&SectionKind::EventLog).unwrap());
    assert_eq!(
        lines,
        vec![
            "Event Log".to_string(),
            "January 05, 2024 14:29 UTC".to_string(),
            "Email sent to Jane Doe".to_string(),
            "January 05, 2024 14:30 UTC".to_string(),
            "SMS sent to +15550100".to_string(),
            "January 05, 2024 14:31 UTC".to_string(),
            "Submission completed by Jane Doe".to_string(),
        ]
    );
}

#[test]
fn at_compose_sc_08_identical_input_gives_identical_document_and_bytes() {
    let submission = jane_submission(vec![event(
        "s1",
        SubmissionEventType::CompleteForm,
        T0,
        Some("1.2.3.4"),
    )]);
    let a = compose(&submission);
    let b = compose(&submission);
    assert_eq!(a, b);
    assert_eq!(a.document.text_lines(), b.document.text_lines());
    assert_eq!(
        serde_json::to_string(&a.document).unwrap(),
        serde_json::to_string(&b.document).unwrap()
    );

    let renderer = PdfRenderer::new(AuditTrailStyle::mvp_v1());
    assert_eq!(
        renderer.render(&a.document).unwrap(),
        renderer.render(&b.document).unwrap()
    );
}

#[test]
fn at_compose_sc_09_signature_images_are_embedded() {
    let mut jane = submitter("s1", Some("Jane Doe"), None);
    jane.attachments.push(SubmitterAttachment {
        uuid: "sigimg".to_string(),
        filename: "signature.png".to_string(),
        url: None,
        bytes: vec![1],
    });
    jane.values
        .insert("sig".to_string(), SubmittedValue::Text("sigimg".to_string()));
    let field = TemplateField::v1(
        "sig".to_string(),
        FieldType::Signature,
        "s1".to_string(),
        None,
        FieldPreferences::default(),
    )
    .unwrap();
    let submission = Submission::v1(
        SubmissionId(1007),
        AccountId(9),
        template(vec![("s1", "First Party")], vec![field], vec![]),
        vec![jane],
        vec![],
        false,
    )
    .unwrap();
    let composition = compose(&submission);
    let section = composition
        .document
        .section(&SectionKind::Submitter {
            uuid: "s1".to_string(),
        })
        .unwrap();
    assert!(section
        .blocks
        .iter()
        .any(|b| matches!(b, Block::Image(img) if img.width == 200.0 && img.height == 200.0)));

    let bytes = PdfRenderer::new(AuditTrailStyle::mvp_v1())
        .render(&composition.document)
        .unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn at_compose_sc_10_cyrillic_submitter_in_offset_zone_renders_readably() {
    let account = AccountSettings::v1(
        AccountId(9),
        AccountTimezone {
            utc_offset_minutes: 240,
            abbreviation: "+04".to_string(),
        },
        "ru".to_string(),
        None,
    )
    .unwrap();
    let mut ivan = submitter("s1", Some("Иван Петров"), Some("ivan@x.com"));
    ivan.values
        .insert("f1".to_string(), SubmittedValue::Text("Иван Петров".to_string()));
    let submission = Submission::v1(
        SubmissionId(1010),
        AccountId(9),
        template(vec![("s1", "Сторона")], vec![text_field("f1", "s1", "ФИО")], vec![]),
        vec![ivan],
        vec![event("s1", SubmissionEventType::CompleteForm, T0, None)],
        false,
    )
    .unwrap();
    let input = AuditTrailInput {
        submission: &submission,
        account: &account,
        verify_url: None,
    };
    let composition = AuditTrailComposer::new(AuditTrailStyle::mvp_v1())
        .compose(&input, &TinyImages)
        .unwrap();

    let lines = submitter_section_lines(&composition, "s1");
    assert!(lines.contains(&"Иван Петров".to_string()));
    assert!(lines.contains(&"ФИО".to_string()));
    let events = section_lines(
        composition
            .document
            .section(&SectionKind::EventLog)
            .unwrap(),
    );
    assert!(events.contains(&"January 05, 2024 18:30 +04".to_string()));

    let bytes = PdfRenderer::new(AuditTrailStyle::mvp_v1())
        .render(&composition.document)
        .unwrap();
    assert!(bytes.windows(5).any(|w| w == b"Type0"));
    assert!(bytes.windows(10).any(|w| w == b"Identity-H"));
}
