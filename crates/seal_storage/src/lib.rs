#![forbid(unsafe_code)]

pub mod attachments;
pub mod repo;

pub use attachments::{AttachmentStore, StorageError};
pub use repo::AuditTrailAttachmentsRepo;
