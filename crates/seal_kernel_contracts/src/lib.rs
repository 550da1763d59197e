#![forbid(unsafe_code)]

pub mod attachment;
pub mod audit_doc;
pub mod common;
pub mod submission;

pub use common::{
    AccountId, AttachmentId, ContractViolation, SchemaVersion, SubmissionId, SubmitterId,
    UnixTimeMs, Validate,
};
