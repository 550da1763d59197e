#![forbid(unsafe_code)]

use std::fmt;

use seal_kernel_contracts::ContractViolation;

use crate::der::DerError;

/// Non-fatal gaps in the evidence. Each one renders as an omitted or empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataIntegrityWarning {
    MissingOriginalDocument {
        document_uuid: String,
    },
    MissingCompletionEvent {
        submitter_uuid: String,
    },
    MissingAttachment {
        field_uuid: String,
        attachment_uuid: String,
    },
    MissingPaymentPrice {
        field_uuid: String,
    },
    UnknownEventSubmitter {
        submitter_uuid: String,
    },
}

impl fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOriginalDocument { document_uuid } => {
                write!(f, "no original document matched result {document_uuid}")
            }
            Self::MissingCompletionEvent { submitter_uuid } => {
                write!(f, "no complete_form event for submitter {submitter_uuid}")
            }
            Self::MissingAttachment {
                field_uuid,
                attachment_uuid,
            } => write!(
                f,
                "field {field_uuid} references missing attachment {attachment_uuid}"
            ),
            Self::MissingPaymentPrice { field_uuid } => {
                write!(f, "payment field {field_uuid} has no price")
            }
            Self::UnknownEventSubmitter { submitter_uuid } => {
                write!(f, "event references unknown submitter {submitter_uuid}")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ImageProcessingError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("field {field_uuid}: {reason}")]
    MalformedValue {
        field_uuid: String,
        reason: &'static str,
    },
    #[error("field {field_uuid}: image could not be processed: {source}")]
    Image {
        field_uuid: String,
        #[source]
        source: ImageProcessingError,
    },
    #[error("composed document rejected: {0}")]
    Contract(#[from] ContractViolation),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("pdf serialization failed: {0}")]
    Pdf(String),
    #[error("font unusable: {0}")]
    Font(String),
    #[error("no glyph for character {0:?}")]
    UnsupportedCharacter(char),
    #[error("stream compression failed: {0}")]
    Compression(#[from] std::io::Error),
    #[error("composed document rejected: {0}")]
    Contract(#[from] ContractViolation),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampAuthorityError {
    #[error("invalid timestamp authority url: {0}")]
    InvalidUrl(String),
    #[error("timestamp authority request timed out")]
    Timeout,
    #[error("timestamp authority transport error: {0}")]
    Transport(String),
    #[error("timestamp authority answered http status {0}")]
    HttpStatus(u16),
    #[error("timestamp authority rejected the request with status {status}")]
    Rejected { status: i64 },
    #[error("malformed timestamp response: {0}")]
    MalformedResponse(&'static str),
}

impl From<DerError> for TimestampAuthorityError {
    fn from(_: DerError) -> Self {
        Self::MalformedResponse("response is not valid DER")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid signing credential: {0}")]
    InvalidCredential(&'static str),
    #[error("cryptographic operation failed: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
    #[error("pdf could not be prepared for signing: {0}")]
    Pdf(String),
    #[error("signature placeholder not found: {0}")]
    PlaceholderNotFound(&'static str),
    #[error("signature needs {needed} bytes but only {available} are reserved")]
    SignatureTooLarge { needed: usize, available: usize },
    #[error("certificate could not be decoded: {0}")]
    Certificate(#[from] DerError),
    #[error("timestamp could not be obtained: {0}")]
    Timestamp(#[from] TimestampAuthorityError),
}
