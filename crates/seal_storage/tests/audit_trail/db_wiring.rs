#![forbid(unsafe_code)]

use seal_kernel_contracts::attachment::{audit_trail_filename, AuditTrailAttachmentInput};
use seal_kernel_contracts::{AttachmentId, SubmissionId, UnixTimeMs};
use seal_storage::{AttachmentStore, AuditTrailAttachmentsRepo, StorageError};

fn audit_trail_in(submission_id: u64, t: i64, body: &[u8]) -> AuditTrailAttachmentInput {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.extend_from_slice(body);
    AuditTrailAttachmentInput::v1(
        SubmissionId(submission_id),
        audit_trail_filename("NDA"),
        bytes,
        UnixTimeMs(t),
    )
    .unwrap()
}

#[test]
fn at_attach_db_01_first_append_is_version_one() {
    let mut s = AttachmentStore::new_in_memory();

    let rec = s
        .append_audit_trail_attachment(audit_trail_in(10, 1_700_000_000_000, b"a"))
        .unwrap();

    assert_eq!(rec.version, 1);
    assert_eq!(rec.attachment_id, AttachmentId(1));
    assert_eq!(rec.name, "audit_trail");
    assert_eq!(rec.content_type, "application/pdf");
    assert_eq!(rec.filename, "Audit Log - NDA.pdf");
    assert_eq!(rec.byte_len, 10);
    assert_eq!(rec.sha256_hex.len(), 64);
}

#[test]
fn at_attach_db_02_regeneration_appends_new_version() {
    let mut s = AttachmentStore::new_in_memory();

    let v1 = s
        .append_audit_trail_attachment(audit_trail_in(10, 1_700_000_000_000, b"first"))
        .unwrap();
    let v2 = s
        .append_audit_trail_attachment(audit_trail_in(10, 1_700_000_060_000, b"second"))
        .unwrap();

    assert_eq!(v2.version, 2);
    assert_ne!(v1.attachment_id, v2.attachment_id);
    assert_ne!(v1.sha256_hex, v2.sha256_hex);

    let all = s.audit_trail_attachments(SubmissionId(10));
    assert_eq!(all.len(), 2);
    assert_eq!(all[0], &v1);
    assert_eq!(s.latest_audit_trail(SubmissionId(10)), Some(&v2));
}

#[test]
fn at_attach_db_03_versions_are_scoped_per_submission() {
    let mut s = AttachmentStore::new_in_memory();

    s.append_audit_trail_attachment(audit_trail_in(10, 1_700_000_000_000, b"a"))
        .unwrap();
    let other = s
        .append_audit_trail_attachment(audit_trail_in(11, 1_700_000_000_000, b"b"))
        .unwrap();

    assert_eq!(other.version, 1);
    assert_eq!(s.audit_trail_attachments(SubmissionId(11)).len(), 1);
    assert!(s.latest_audit_trail(SubmissionId(12)).is_none());
    assert_eq!(s.audit_trail_rows().len(), 2);
}

#[test]
fn at_attach_db_04_bytes_round_trip_through_repo_trait() {
    let mut s = AttachmentStore::new_in_memory();
    let repo: &mut dyn AuditTrailAttachmentsRepo = &mut s;

    let rec = repo
        .append_audit_trail_attachment(audit_trail_in(10, 1_700_000_000_000, b"payload"))
        .unwrap();

    assert_eq!(
        repo.attachment_bytes(rec.attachment_id).unwrap(),
        b"%PDF-1.7\npayload"
    );
    assert!(matches!(
        repo.attachment_bytes(AttachmentId(99)),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
}

#[test]
fn at_attach_db_05_tampered_input_is_rejected_without_consuming_a_version() {
    let mut s = AttachmentStore::new_in_memory();
    let mut bad = audit_trail_in(10, 1_700_000_000_000, b"a");
    bad.bytes = b"GIF89a".to_vec();

    assert!(matches!(
        s.append_audit_trail_attachment(bad),
        Err(StorageError::ContractViolation(_))
    ));
    let rec = s
        .append_audit_trail_attachment(audit_trail_in(10, 1_700_000_000_000, b"a"))
        .unwrap();
    assert_eq!(rec.version, 1);
    assert_eq!(rec.attachment_id, AttachmentId(1));
}
