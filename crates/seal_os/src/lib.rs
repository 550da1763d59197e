#![forbid(unsafe_code)]

pub mod audit_trail;

pub use audit_trail::{
    ArtifactPublisher, AuditTrailError, AuditTrailOutcome, AuditTrailWiring,
    AuditTrailWiringConfig, HttpTimestampConnector, SigningCredentialStore,
    TimestampAuthorityConnector,
};
