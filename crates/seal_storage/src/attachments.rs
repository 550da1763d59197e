#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use seal_kernel_contracts::attachment::{AuditTrailAttachmentInput, AuditTrailAttachmentRecord};
use seal_kernel_contracts::{AttachmentId, ContractViolation, SubmissionId};
use sha2::{Digest, Sha256};

use crate::repo::AuditTrailAttachmentsRepo;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("foreign key violation on {table}: {key}")]
    ForeignKeyViolation { table: &'static str, key: String },
    #[error("{0}")]
    ContractViolation(#[from] ContractViolation),
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// In-memory attachment tables. Audit-trail rows are append-only.
#[derive(Debug, Default)]
pub struct AttachmentStore {
    audit_trail_rows: Vec<AuditTrailAttachmentRecord>,
    // attachment_id -> stored PDF bytes.
    blobs: BTreeMap<AttachmentId, Vec<u8>>,
    // submission_id -> attachment ids in version order.
    submission_index: BTreeMap<SubmissionId, Vec<AttachmentId>>,
    next_attachment_id: u64,
}

impl AttachmentStore {
    pub fn new_in_memory() -> Self {
        Self {
            next_attachment_id: 1,
            ..Self::default()
        }
    }

    // ------------------------
    // Audit trail attachments.
    // ------------------------

    pub fn append_audit_trail_attachment(
        &mut self,
        input: AuditTrailAttachmentInput,
    ) -> Result<AuditTrailAttachmentRecord, StorageError> {
        let attachment_id = AttachmentId(self.next_attachment_id);
        let version = self
            .submission_index
            .get(&input.submission_id)
            .map_or(0, Vec::len) as u32
            + 1;

        let record = AuditTrailAttachmentRecord::from_input_v1(
            attachment_id,
            version,
            sha256_hex(&input.bytes),
            &input,
        )?;
        self.next_attachment_id = self.next_attachment_id.saturating_add(1);
        self.submission_index
            .entry(record.submission_id)
            .or_default()
            .push(attachment_id);
        self.blobs.insert(attachment_id, input.bytes);
        self.audit_trail_rows.push(record.clone());
        Ok(record)
    }

    pub fn audit_trail_rows(&self) -> &[AuditTrailAttachmentRecord] {
        &self.audit_trail_rows
    }

    /// Every version for a submission, oldest first.
    pub fn audit_trail_attachments(
        &self,
        submission_id: SubmissionId,
    ) -> Vec<&AuditTrailAttachmentRecord> {
        let Some(ids) = self.submission_index.get(&submission_id) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| self.row(*id)).collect()
    }

    pub fn latest_audit_trail(
        &self,
        submission_id: SubmissionId,
    ) -> Option<&AuditTrailAttachmentRecord> {
        let id = self.submission_index.get(&submission_id)?.last()?;
        self.row(*id)
    }

    pub fn attachment_bytes(&self, attachment_id: AttachmentId) -> Result<&[u8], StorageError> {
        self.blobs
            .get(&attachment_id)
            .map(Vec::as_slice)
            .ok_or(StorageError::ForeignKeyViolation {
                table: "audit_trail_attachments.attachment_id",
                key: attachment_id.0.to_string(),
            })
    }

    fn row(&self, attachment_id: AttachmentId) -> Option<&AuditTrailAttachmentRecord> {
        self.audit_trail_rows
            .iter()
            .find(|r| r.attachment_id == attachment_id)
    }
}

impl AuditTrailAttachmentsRepo for AttachmentStore {
    fn append_audit_trail_attachment(
        &mut self,
        input: AuditTrailAttachmentInput,
    ) -> Result<AuditTrailAttachmentRecord, StorageError> {
        self.append_audit_trail_attachment(input)
    }

    fn audit_trail_attachments(
        &self,
        submission_id: SubmissionId,
    ) -> Vec<&AuditTrailAttachmentRecord> {
        self.audit_trail_attachments(submission_id)
    }

    fn latest_audit_trail(
        &self,
        submission_id: SubmissionId,
    ) -> Option<&AuditTrailAttachmentRecord> {
        self.latest_audit_trail(submission_id)
    }

    fn attachment_bytes(&self, attachment_id: AttachmentId) -> Result<&[u8], StorageError> {
        self.attachment_bytes(attachment_id)
    }
}
