#![forbid(unsafe_code)]

use std::env;

use seal_engines::image::ImageProcessor;
use seal_engines::{
    AuditTrailComposer, AuditTrailInput, AuditTrailStyle, CompositionError, DataIntegrityWarning,
    HttpTimestampClient, PdfRenderer, RenderError, SigningEngine, SigningError, SigningIdentity,
    TimestampAuthority, TimestampAuthorityError, TimestampClientConfig,
};
use seal_kernel_contracts::attachment::{
    audit_trail_filename, AuditTrailAttachmentInput, AuditTrailAttachmentRecord,
};
use seal_kernel_contracts::submission::{AccountSettings, Submission};
use seal_kernel_contracts::{AccountId, ContractViolation, UnixTimeMs, Validate};
use seal_storage::{AttachmentStore, StorageError};

const TSA_CONNECT_TIMEOUT_MS_DEFAULT: u32 = 3_000;
const TSA_REQUEST_TIMEOUT_MS_DEFAULT: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTrailWiringConfig {
    /// Used when the account configures no timestamp authority of its own.
    pub default_tsa_url: Option<String>,
    pub verify_url: Option<String>,
    pub tsa_connect_timeout_ms: u32,
    pub tsa_request_timeout_ms: u32,
}

impl AuditTrailWiringConfig {
    pub fn mvp_v1() -> Self {
        Self {
            default_tsa_url: None,
            verify_url: None,
            tsa_connect_timeout_ms: TSA_CONNECT_TIMEOUT_MS_DEFAULT,
            tsa_request_timeout_ms: TSA_REQUEST_TIMEOUT_MS_DEFAULT,
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::mvp_v1();
        let tsa_connect_timeout_ms = env::var("SEAL_TSA_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| (100..=60_000).contains(v))
            .unwrap_or(defaults.tsa_connect_timeout_ms);
        let tsa_request_timeout_ms = env::var("SEAL_TSA_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| (100..=120_000).contains(v))
            .unwrap_or(defaults.tsa_request_timeout_ms);

        Self {
            default_tsa_url: http_url_from_env("SEAL_TIMESERVER_URL").or(defaults.default_tsa_url),
            verify_url: http_url_from_env("SEAL_VERIFY_URL").or(defaults.verify_url),
            tsa_connect_timeout_ms,
            tsa_request_timeout_ms,
        }
    }
}

impl Validate for AuditTrailWiringConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.tsa_connect_timeout_ms == 0 || self.tsa_request_timeout_ms == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail_wiring_config.tsa_timeouts",
                reason: "must be > 0",
            });
        }
        if let Some(url) = &self.default_tsa_url {
            if !is_http_url(url) {
                return Err(ContractViolation::InvalidValue {
                    field: "audit_trail_wiring_config.default_tsa_url",
                    reason: "must be an absolute http(s) url",
                });
            }
        }
        if let Some(url) = &self.verify_url {
            if !is_http_url(url) {
                return Err(ContractViolation::InvalidValue {
                    field: "audit_trail_wiring_config.verify_url",
                    reason: "must be an absolute http(s) url",
                });
            }
        }
        Ok(())
    }
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn http_url_from_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| is_http_url(v))
}

/// Account-scoped key material. `Ok(None)` means the account has none configured.
pub trait SigningCredentialStore {
    fn signing_identity(
        &self,
        account_id: AccountId,
    ) -> Result<Option<SigningIdentity>, SigningError>;
}

pub trait TimestampAuthorityConnector {
    fn connect(&self, url: &str) -> Result<Box<dyn TimestampAuthority>, TimestampAuthorityError>;
}

/// The pipeline's only durable write.
pub trait ArtifactPublisher {
    fn publish(
        &mut self,
        input: AuditTrailAttachmentInput,
    ) -> Result<AuditTrailAttachmentRecord, StorageError>;
}

impl ArtifactPublisher for AttachmentStore {
    fn publish(
        &mut self,
        input: AuditTrailAttachmentInput,
    ) -> Result<AuditTrailAttachmentRecord, StorageError> {
        self.append_audit_trail_attachment(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimestampConnector {
    connect_timeout_ms: u32,
    request_timeout_ms: u32,
}

impl HttpTimestampConnector {
    pub fn from_config(config: &AuditTrailWiringConfig) -> Self {
        Self {
            connect_timeout_ms: config.tsa_connect_timeout_ms,
            request_timeout_ms: config.tsa_request_timeout_ms,
        }
    }
}

impl TimestampAuthorityConnector for HttpTimestampConnector {
    fn connect(&self, url: &str) -> Result<Box<dyn TimestampAuthority>, TimestampAuthorityError> {
        let config = TimestampClientConfig::v1(url, self.connect_timeout_ms, self.request_timeout_ms)?;
        Ok(Box::new(HttpTimestampClient::new(config)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditTrailError {
    #[error("no signing credential configured for account {account_id}")]
    MissingCredential { account_id: u64 },
    #[error("invalid audit trail input: {0}")]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Signing(SigningError),
    #[error(transparent)]
    TimestampAuthority(#[from] TimestampAuthorityError),
    #[error("audit trail could not be published: {0}")]
    Publish(#[from] StorageError),
}

impl From<SigningError> for AuditTrailError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::Timestamp(inner) => Self::TimestampAuthority(inner),
            other => Self::Signing(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTrailOutcome {
    pub attachment: AuditTrailAttachmentRecord,
    pub warnings: Vec<DataIntegrityWarning>,
    pub timestamped: bool,
}

/// Compose, render, sign, then publish. Any failure before publish leaves the publisher untouched.
#[derive(Debug, Clone)]
pub struct AuditTrailWiring<C, T, I>
where
    C: SigningCredentialStore,
    T: TimestampAuthorityConnector,
    I: ImageProcessor,
{
    config: AuditTrailWiringConfig,
    composer: AuditTrailComposer,
    renderer: PdfRenderer,
    signer: SigningEngine,
    credentials: C,
    connector: T,
    images: I,
}

impl<C, T, I> AuditTrailWiring<C, T, I>
where
    C: SigningCredentialStore,
    T: TimestampAuthorityConnector,
    I: ImageProcessor,
{
    pub fn new(
        config: AuditTrailWiringConfig,
        style: AuditTrailStyle,
        credentials: C,
        connector: T,
        images: I,
    ) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self {
            config,
            composer: AuditTrailComposer::new(style.clone()),
            renderer: PdfRenderer::new(style),
            signer: SigningEngine::mvp_v1(),
            credentials,
            connector,
            images,
        })
    }

    pub fn config(&self) -> &AuditTrailWiringConfig {
        &self.config
    }

    pub fn generate<P>(
        &self,
        submission: &Submission,
        account: &AccountSettings,
        publisher: &mut P,
        now: UnixTimeMs,
    ) -> Result<AuditTrailOutcome, AuditTrailError>
    where
        P: ArtifactPublisher + ?Sized,
    {
        submission.validate()?;
        account.validate()?;
        if now.0 <= 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_trail.now",
                reason: "must be > 0",
            }
            .into());
        }
        tracing::info!(
            submission_id = submission.id.0,
            account_id = account.account_id.0,
            "audit trail generation started"
        );

        let identity = self
            .credentials
            .signing_identity(account.account_id)?
            .ok_or(AuditTrailError::MissingCredential {
                account_id: account.account_id.0,
            })?;

        let input = AuditTrailInput {
            submission,
            account,
            verify_url: self.config.verify_url.as_deref(),
        };
        let composition = self.composer.compose(&input, &self.images)?;
        let pdf = self.renderer.render(&composition.document)?;
        tracing::debug!(
            submission_id = submission.id.0,
            bytes = pdf.len(),
            "audit trail rendered"
        );

        let authority = match self.tsa_url(account) {
            Some(url) => Some(self.connector.connect(url).map_err(|err| {
                tracing::warn!(submission_id = submission.id.0, error = %err, "timestamp authority unusable");
                err
            })?),
            None => None,
        };
        let signed = self
            .signer
            .sign(
                &pdf,
                &identity,
                self.composer.style().sign_reason,
                now,
                authority.as_deref(),
            )
            .map_err(|err| {
                if let SigningError::Timestamp(inner) = &err {
                    tracing::warn!(submission_id = submission.id.0, error = %inner, "timestamp authority failed");
                }
                err
            })?;
        let timestamped = signed.timestamp.is_some();

        let attachment = publisher.publish(AuditTrailAttachmentInput::v1(
            submission.id,
            audit_trail_filename(&submission.template.name),
            signed.bytes,
            now,
        )?)?;
        tracing::info!(
            submission_id = submission.id.0,
            attachment_id = attachment.attachment_id.0,
            version = attachment.version,
            timestamped,
            warnings = composition.warnings.len(),
            "audit trail published"
        );

        Ok(AuditTrailOutcome {
            attachment,
            warnings: composition.warnings,
            timestamped,
        })
    }

    fn tsa_url<'a>(&'a self, account: &'a AccountSettings) -> Option<&'a str> {
        account
            .timestamp_authority_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .or(self.config.default_tsa_url.as_deref())
    }
}
