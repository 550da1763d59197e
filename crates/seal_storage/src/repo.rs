#![forbid(unsafe_code)]

use seal_kernel_contracts::attachment::{AuditTrailAttachmentInput, AuditTrailAttachmentRecord};
use seal_kernel_contracts::{AttachmentId, SubmissionId};

use crate::attachments::StorageError;

/// Typed repository interface for audit-trail attachment persistence.
pub trait AuditTrailAttachmentsRepo {
    fn append_audit_trail_attachment(
        &mut self,
        input: AuditTrailAttachmentInput,
    ) -> Result<AuditTrailAttachmentRecord, StorageError>;
    fn audit_trail_attachments(
        &self,
        submission_id: SubmissionId,
    ) -> Vec<&AuditTrailAttachmentRecord>;
    fn latest_audit_trail(&self, submission_id: SubmissionId)
        -> Option<&AuditTrailAttachmentRecord>;
    fn attachment_bytes(&self, attachment_id: AttachmentId) -> Result<&[u8], StorageError>;
}
