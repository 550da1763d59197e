#![forbid(unsafe_code)]

pub mod cms;
pub mod compose;
pub mod content_hash;
pub mod der;
pub mod error;
pub mod font;
pub mod format;
pub mod image;
pub mod pdf;
pub mod signing;
pub mod style;
pub mod tsa;

pub use compose::{AuditTrailComposer, AuditTrailInput, Composition};
pub use error::{
    CompositionError, DataIntegrityWarning, ImageProcessingError, RenderError, SigningError,
    TimestampAuthorityError,
};
pub use pdf::PdfRenderer;
pub use signing::{SignedDocument, SigningEngine, SigningIdentity};
pub use style::AuditTrailStyle;
pub use tsa::{HttpTimestampClient, TimestampAuthority, TimestampClientConfig, TimestampToken};
