#![forbid(unsafe_code)]

//! RFC 3161 time-stamp protocol over HTTP.

use std::io::Read;
use std::time::Duration;

use rand::Rng;

use crate::der::{self, oids, Tlv};
use crate::error::TimestampAuthorityError;

const MAX_RESPONSE_BYTES: u64 = 256 * 1024;
const QUERY_CONTENT_TYPE: &str = "application/timestamp-query";
const REPLY_CONTENT_TYPE: &str = "application/timestamp-reply";

/// DER `TimeStampToken` (a CMS ContentInfo) plus the authority's `genTime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampToken {
    pub der: Vec<u8>,
    pub gen_time: String,
}

pub trait TimestampAuthority {
    /// Requests a token over a SHA-256 message digest.
    fn timestamp(&self, digest: &[u8; 32]) -> Result<TimestampToken, TimestampAuthorityError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampClientConfig {
    pub url: String,
    pub connect_timeout_ms: u32,
    pub request_timeout_ms: u32,
    pub user_agent: String,
}

impl TimestampClientConfig {
    pub fn v1(
        url: &str,
        connect_timeout_ms: u32,
        request_timeout_ms: u32,
    ) -> Result<Self, TimestampAuthorityError> {
        let parsed =
            url::Url::parse(url).map_err(|e| TimestampAuthorityError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TimestampAuthorityError::InvalidUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(TimestampAuthorityError::InvalidUrl(
                "missing host".to_string(),
            ));
        }
        if connect_timeout_ms == 0 || request_timeout_ms == 0 {
            return Err(TimestampAuthorityError::InvalidUrl(
                "timeouts must be > 0".to_string(),
            ));
        }
        Ok(Self {
            url: parsed.to_string(),
            connect_timeout_ms,
            request_timeout_ms,
            user_agent: concat!("seal-audit-trail/", env!("CARGO_PKG_VERSION")).to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Requesting { nonce: u64 },
    TokenReceived(TimestampToken),
    Failed(TimestampAuthorityError),
}

/// One request/response round trip. Never retried; a new exchange starts from `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampExchange {
    state: ExchangeState,
}

impl Default for TimestampExchange {
    fn default() -> Self {
        Self::idle()
    }
}

impl TimestampExchange {
    pub fn idle() -> Self {
        Self {
            state: ExchangeState::Idle,
        }
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    /// `Idle -> Requesting`. Returns false from any other state.
    pub fn begin(&mut self, nonce: u64) -> bool {
        if self.state != ExchangeState::Idle {
            return false;
        }
        self.state = ExchangeState::Requesting { nonce };
        true
    }

    /// `Requesting -> TokenReceived | Failed`.
    pub fn resolve(&mut self, outcome: Result<TimestampToken, TimestampAuthorityError>) {
        self.state = match (&self.state, outcome) {
            (ExchangeState::Requesting { .. }, Ok(token)) => ExchangeState::TokenReceived(token),
            (ExchangeState::Requesting { .. }, Err(err)) => ExchangeState::Failed(err),
            _ => ExchangeState::Failed(TimestampAuthorityError::MalformedResponse(
                "response without a pending request",
            )),
        };
    }

    pub fn into_result(self) -> Result<TimestampToken, TimestampAuthorityError> {
        match self.state {
            ExchangeState::TokenReceived(token) => Ok(token),
            ExchangeState::Failed(err) => Err(err),
            ExchangeState::Idle | ExchangeState::Requesting { .. } => Err(
                TimestampAuthorityError::MalformedResponse("exchange did not complete"),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTimestampClient {
    config: TimestampClientConfig,
    agent: ureq::Agent,
}

impl HttpTimestampClient {
    pub fn new(config: TimestampClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(u64::from(config.connect_timeout_ms)))
            .timeout(Duration::from_millis(u64::from(config.request_timeout_ms)))
            .user_agent(&config.user_agent)
            .build();
        Self { config, agent }
    }

    pub fn config(&self) -> &TimestampClientConfig {
        &self.config
    }

    fn post(&self, request: &[u8]) -> Result<Vec<u8>, TimestampAuthorityError> {
        let response = self
            .agent
            .post(&self.config.url)
            .set("Content-Type", QUERY_CONTENT_TYPE)
            .set("Accept", REPLY_CONTENT_TYPE)
            .send_bytes(request)
            .map_err(tsa_error_from_ureq)?;
        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(TimestampAuthorityError::HttpStatus(status));
        }
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                    TimestampAuthorityError::Timeout
                }
                _ => TimestampAuthorityError::Transport(e.to_string()),
            })?;
        Ok(body)
    }
}

impl TimestampAuthority for HttpTimestampClient {
    fn timestamp(&self, digest: &[u8; 32]) -> Result<TimestampToken, TimestampAuthorityError> {
        let nonce = rand::thread_rng().gen::<u64>() >> 1;
        let mut exchange = TimestampExchange::idle();
        exchange.begin(nonce);
        let request = build_timestamp_request(digest, nonce);
        let outcome = self
            .post(&request)
            .and_then(|body| parse_timestamp_response(&body, digest, nonce));
        if let Err(err) = &outcome {
            tracing::warn!(url = %self.config.url, error = %err, "timestamp request failed");
        }
        exchange.resolve(outcome);
        exchange.into_result()
    }
}

fn tsa_error_from_ureq(err: ureq::Error) -> TimestampAuthorityError {
    match err {
        ureq::Error::Status(status, _) => TimestampAuthorityError::HttpStatus(status),
        ureq::Error::Transport(transport) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            let lower = combined.to_ascii_lowercase();
            if lower.contains("timeout") || lower.contains("timed out") {
                TimestampAuthorityError::Timeout
            } else {
                TimestampAuthorityError::Transport(transport.to_string())
            }
        }
    }
}

/// `TimeStampReq` for a SHA-256 imprint with `certReq = TRUE`.
pub fn build_timestamp_request(digest: &[u8; 32], nonce: u64) -> Vec<u8> {
    let imprint = der::sequence(&[
        &der::algorithm_identifier(oids::SHA256, true),
        &der::octet_string(digest),
    ]);
    der::sequence(&[
        &der::small_integer(1),
        &imprint,
        &der::small_integer(nonce),
        &der::boolean(true),
    ])
}

/// Extracts and checks the token from a `TimeStampResp`.
pub fn parse_timestamp_response(
    body: &[u8],
    digest: &[u8; 32],
    nonce: u64,
) -> Result<TimestampToken, TimestampAuthorityError> {
    let resp = der::read_single(body)?;
    resp.expect_tag(der::TAG_SEQUENCE)?;
    let parts = resp.children()?;
    let status_info = parts
        .first()
        .ok_or(TimestampAuthorityError::MalformedResponse("missing status"))?;
    let status = status_info
        .expect_tag(der::TAG_SEQUENCE)?
        .children()?
        .first()
        .ok_or(TimestampAuthorityError::MalformedResponse("missing status"))?
        .as_i64()?;
    if status != 0 && status != 1 {
        return Err(TimestampAuthorityError::Rejected { status });
    }
    let token = parts.get(1).ok_or(TimestampAuthorityError::MalformedResponse(
        "granted response carries no token",
    ))?;
    token.expect_tag(der::TAG_SEQUENCE)?;

    let tst_info = tst_info_of(token)?;
    let fields = tst_info.children()?;
    let imprint = fields
        .get(2)
        .ok_or(TimestampAuthorityError::MalformedResponse("missing message imprint"))?
        .children()?;
    let hashed = imprint
        .get(1)
        .ok_or(TimestampAuthorityError::MalformedResponse("missing message imprint"))?;
    if hashed.tag != der::TAG_OCTET_STRING || hashed.content != digest.as_slice() {
        return Err(TimestampAuthorityError::MalformedResponse(
            "message imprint does not match",
        ));
    }
    let gen_time = fields
        .get(4)
        .filter(|f| f.tag == der::TAG_GENERALIZED_TIME)
        .ok_or(TimestampAuthorityError::MalformedResponse("missing genTime"))?;

    let expected_nonce = der::small_integer(nonce);
    let echoed = fields
        .iter()
        .skip(5)
        .find(|f| f.tag == der::TAG_INTEGER)
        .ok_or(TimestampAuthorityError::MalformedResponse("nonce missing"))?;
    if echoed.raw != expected_nonce.as_slice() {
        return Err(TimestampAuthorityError::MalformedResponse("nonce mismatch"));
    }

    Ok(TimestampToken {
        der: token.raw.to_vec(),
        gen_time: String::from_utf8_lossy(gen_time.content).into_owned(),
    })
}

/// ContentInfo -> [0] SignedData -> encapContentInfo -> [0] OCTET STRING -> TSTInfo.
fn tst_info_of<'a>(token: &Tlv<'a>) -> Result<Tlv<'a>, TimestampAuthorityError> {
    let malformed = TimestampAuthorityError::MalformedResponse("token is not a signed TSTInfo");
    let content_info = token.children()?;
    let signed_data_oid = der::oid(oids::PKCS7_SIGNED_DATA);
    if content_info.first().map(|t| t.raw) != Some(signed_data_oid.as_slice()) {
        return Err(malformed);
    }
    let wrapper = content_info.get(1).ok_or(malformed.clone())?;
    let signed_data = der::read_single(wrapper.content)?;
    let encap = signed_data
        .children()?
        .get(2)
        .copied()
        .ok_or(malformed.clone())?
        .children()?;
    let tst_oid = der::oid(oids::TST_INFO);
    if encap.first().map(|t| t.raw) != Some(tst_oid.as_slice()) {
        return Err(malformed);
    }
    let explicit = encap.get(1).ok_or(malformed.clone())?;
    let octets = der::read_single(explicit.content)?;
    octets.expect_tag(der::TAG_OCTET_STRING)?;
    let tst_info = der::read_single(octets.content)?;
    tst_info.expect_tag(der::TAG_SEQUENCE)?;
    Ok(tst_info)
}
