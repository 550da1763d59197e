#![forbid(unsafe_code)]

use crate::common::validate_text;
use crate::{AttachmentId, ContractViolation, SchemaVersion, SubmissionId, UnixTimeMs, Validate};

pub const ATTACHMENT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub const AUDIT_TRAIL_ATTACHMENT_NAME: &str = "audit_trail";
pub const AUDIT_TRAIL_CONTENT_TYPE: &str = "application/pdf";

pub fn audit_trail_filename(template_name: &str) -> String {
    format!("Audit Log - {template_name}.pdf")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTrailAttachmentInput {
    pub schema_version: SchemaVersion,
    pub submission_id: SubmissionId,
    pub name: &'static str,
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub created_at: UnixTimeMs,
}

impl AuditTrailAttachmentInput {
    pub fn v1(
        submission_id: SubmissionId,
        filename: String,
        bytes: Vec<u8>,
        created_at: UnixTimeMs,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: ATTACHMENT_CONTRACT_VERSION,
            submission_id,
            name: AUDIT_TRAIL_ATTACHMENT_NAME,
            filename,
            content_type: AUDIT_TRAIL_CONTENT_TYPE,
            bytes,
            created_at,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for AuditTrailAttachmentInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ATTACHMENT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_input.schema_version",
                reason: "must match ATTACHMENT_CONTRACT_VERSION",
            });
        }
        if self.submission_id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_input.submission_id",
                reason: "must be > 0",
            });
        }
        if self.name != AUDIT_TRAIL_ATTACHMENT_NAME {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_input.name",
                reason: "must be audit_trail",
            });
        }
        validate_text(
            "audit_trail_attachment_input.filename",
            &self.filename,
            512,
        )?;
        if !self.filename.ends_with(".pdf") {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_input.filename",
                reason: "must end with .pdf",
            });
        }
        if !self.bytes.starts_with(b"%PDF-") {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_input.bytes",
                reason: "must be a PDF document",
            });
        }
        if self.created_at.0 <= 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_input.created_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// A published audit trail. Rows are append-only; regeneration adds a new version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTrailAttachmentRecord {
    pub schema_version: SchemaVersion,
    pub attachment_id: AttachmentId,
    pub submission_id: SubmissionId,
    pub version: u32,
    pub name: &'static str,
    pub filename: String,
    pub content_type: &'static str,
    pub byte_len: u64,
    pub sha256_hex: String,
    pub created_at: UnixTimeMs,
}

impl AuditTrailAttachmentRecord {
    pub fn from_input_v1(
        attachment_id: AttachmentId,
        version: u32,
        sha256_hex: String,
        input: &AuditTrailAttachmentInput,
    ) -> Result<Self, ContractViolation> {
        input.validate()?;
        let record = Self {
            schema_version: ATTACHMENT_CONTRACT_VERSION,
            attachment_id,
            submission_id: input.submission_id,
            version,
            name: input.name,
            filename: input.filename.clone(),
            content_type: input.content_type,
            byte_len: input.bytes.len() as u64,
            sha256_hex,
            created_at: input.created_at,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for AuditTrailAttachmentRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ATTACHMENT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_record.schema_version",
                reason: "must match ATTACHMENT_CONTRACT_VERSION",
            });
        }
        if self.attachment_id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_record.attachment_id",
                reason: "must be > 0",
            });
        }
        if self.version == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_record.version",
                reason: "must be > 0",
            });
        }
        if self.sha256_hex.len() != 64 || !self.sha256_hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_attachment_record.sha256_hex",
                reason: "must be a 64-char hex value",
            });
        }
        Ok(())
    }
}
