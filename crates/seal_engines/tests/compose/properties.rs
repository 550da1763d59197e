#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use proptest::{prelude::*, test_runner::Config as ProptestConfig};
use seal_engines::format::format_timestamp;
use seal_engines::image::ImageProcessor;
use seal_engines::{AuditTrailComposer, AuditTrailInput, AuditTrailStyle, Composition, ImageProcessingError};
use seal_kernel_contracts::audit_doc::{section_lines, Block, RasterImage, SectionKind};
use seal_kernel_contracts::submission::{
    AccountSettings, AccountTimezone, EventData, FieldPreferences, FieldType, Submission,
    SubmissionEvent, SubmissionEventType, SubmittedValue, Submitter, Template, TemplateField,
    TemplateSubmitter,
};
use seal_kernel_contracts::{AccountId, SubmissionId, SubmitterId, UnixTimeMs};

const T0: i64 = 1_704_465_000_000;

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 50,
        timeout: 5000,
        fork: false,
        failure_persistence: None,
        source_file: None,
        ..ProptestConfig::default()
    }
}

struct NoImages;

impl ImageProcessor for NoImages {
    fn decode_oriented(&self, _bytes: &[u8]) -> Result<RasterImage, ImageProcessingError> {
        Err(ImageProcessingError("no images in this suite".to_string()))
    }
}

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::sample::select(vec![
        None,
        Some(String::new()),
        Some("   ".to_string()),
        Some("Jane Doe".to_string()),
        Some("jane@x.com".to_string()),
        Some("+15550100".to_string()),
    ])
}

fn submitted_text() -> impl Strategy<Value = Option<SubmittedValue>> {
    prop::sample::select(vec![
        None,
        Some(SubmittedValue::Text(String::new())),
        Some(SubmittedValue::Text("  ".to_string())),
        Some(SubmittedValue::Text("hello".to_string())),
        Some(SubmittedValue::List(vec![])),
        Some(SubmittedValue::List(vec!["a".to_string(), "b".to_string()])),
    ])
}

fn event_offsets() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..5_000_000_000, 1..12)
}

fn submitter(name: Option<String>, email: Option<String>, phone: Option<String>) -> Submitter {
    Submitter {
        id: SubmitterId(1),
        uuid: "s1".to_string(),
        name,
        email,
        phone,
        completed_at: Some(UnixTimeMs(T0)),
        attachments: vec![],
        values: BTreeMap::new(),
        documents: vec![],
    }
}

fn submission(
    fields: Vec<TemplateField>,
    submitter: Submitter,
    events: Vec<SubmissionEvent>,
) -> Submission {
    Submission::v1(
        SubmissionId(77),
        AccountId(3),
        Template {
            name: "Lease".to_string(),
            submitters: vec![TemplateSubmitter {
                uuid: "s1".to_string(),
                name: "Tenant".to_string(),
            }],
            fields,
            documents: vec![],
            schema: vec![],
        },
        vec![submitter],
        events,
        false,
    )
    .unwrap()
}

fn compose(submission: &Submission, account: &AccountSettings) -> Composition {
    let input = AuditTrailInput {
        submission,
        account,
        verify_url: None,
    };
    AuditTrailComposer::new(AuditTrailStyle::mvp_v1())
        .compose(&input, &NoImages)
        .unwrap()
}

fn account(offset_minutes: i32) -> AccountSettings {
    AccountSettings::v1(
        AccountId(3),
        AccountTimezone {
            utc_offset_minutes: offset_minutes,
            abbreviation: "TZ".to_string(),
        },
        "en".to_string(),
        None,
    )
    .unwrap()
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn at_compose_prop_01_event_rows_are_chronological(
        offsets in event_offsets(),
        tz in prop::sample::select(vec![-300, 0, 60, 330]),
    ) {
        let account = account(tz);
        let events = offsets
            .iter()
            .map(|offset| {
                SubmissionEvent::v1(
                    "s1".to_string(),
                    SubmissionEventType::ViewForm,
                    UnixTimeMs(T0 + offset),
                    EventData::default(),
                )
                .unwrap()
            })
            .collect();
        let submission = submission(vec![], submitter(Some("Jane".to_string()), None, None), events);
        let composition = compose(&submission, &account);

        let section = composition.document.section(&SectionKind::EventLog).unwrap();
        let table = section
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Table(table) => Some(table),
                _ => None,
            })
            .unwrap();
        let shown: Vec<String> = table
            .rows
            .iter()
            .map(|row| row[0].lines().join("\n"))
            .collect();

        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        let expected: Vec<String> = sorted
            .into_iter()
            .map(|offset| format_timestamp(UnixTimeMs(T0 + offset), &account.timezone))
            .collect();
        prop_assert_eq!(shown, expected);
    }

    #[test]
    fn at_compose_prop_02_blank_identity_values_are_suppressed(
        name in optional_text(),
        email in optional_text(),
        phone in optional_text(),
    ) {
        let non_blank = [&name, &email, &phone]
            .iter()
            .filter(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
            .count();
        let submission = submission(vec![], submitter(name, email, phone), vec![]);
        let composition = compose(&submission, &account(0));

        let section = composition
            .document
            .section(&SectionKind::Submitter { uuid: "s1".to_string() })
            .unwrap();
        let Some(Block::Text(identity)) = section.blocks.first() else {
            panic!("submitter section must open with the identity box");
        };
        prop_assert_eq!(identity.lines().len(), non_blank);
    }

    #[test]
    fn at_compose_prop_03_field_label_shown_only_for_non_blank_values(
        values in prop::collection::vec(submitted_text(), 1..8),
    ) {
        let fields: Vec<TemplateField> = (0..values.len())
            .map(|i| {
                TemplateField::v1(
                    format!("f{i}"),
                    FieldType::Text,
                    "s1".to_string(),
                    None,
                    FieldPreferences::default(),
                )
                .unwrap()
            })
            .collect();
        let mut signer = submitter(Some("Jane".to_string()), None, None);
        for (i, value) in values.iter().enumerate() {
            if let Some(value) = value {
                signer.values.insert(format!("f{i}"), value.clone());
            }
        }
        let submission = submission(fields, signer, vec![]);
        let composition = compose(&submission, &account(0));
        let lines = section_lines(
            composition
                .document
                .section(&SectionKind::Submitter { uuid: "s1".to_string() })
                .unwrap(),
        );

        for (i, value) in values.iter().enumerate() {
            let label = format!("TEXT FIELD {}", i + 1);
            let shown = value.as_ref().is_some_and(|v| !v.is_blank());
            prop_assert_eq!(lines.contains(&label), shown, "label {}", label);
        }
    }
}
