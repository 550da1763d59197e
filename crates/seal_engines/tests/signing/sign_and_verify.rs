#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509NameBuilder, X509};
use seal_engines::der;
use seal_engines::image::ImageProcessor;
use seal_engines::{
    AuditTrailComposer, AuditTrailInput, AuditTrailStyle, ImageProcessingError, PdfRenderer,
    SignedDocument, SigningEngine, SigningError, SigningIdentity, TimestampAuthority,
    TimestampAuthorityError, TimestampToken,
};
use seal_kernel_contracts::audit_doc::RasterImage;
use seal_kernel_contracts::submission::{
    AccountSettings, AccountTimezone, Submission, Submitter, Template, TemplateSubmitter,
};
use seal_kernel_contracts::{AccountId, SubmissionId, SubmitterId, UnixTimeMs};

const SIGNED_AT: UnixTimeMs = UnixTimeMs(1_704_465_000_000);
const REASON: &str = "Signed with Sasana E Signature";

struct NoImages;

impl ImageProcessor for NoImages {
    fn decode_oriented(&self, _bytes: &[u8]) -> Result<RasterImage, ImageProcessingError> {
        Err(ImageProcessingError("unused".to_string()))
    }
}

struct FixedAuthority {
    token: Vec<u8>,
}

impl TimestampAuthority for FixedAuthority {
    fn timestamp(&self, _digest: &[u8; 32]) -> Result<TimestampToken, TimestampAuthorityError> {
        Ok(TimestampToken {
            der: self.token.clone(),
            gen_time: "20240105143001Z".to_string(),
        })
    }
}

struct DownAuthority;

impl TimestampAuthority for DownAuthority {
    fn timestamp(&self, _digest: &[u8; 32]) -> Result<TimestampToken, TimestampAuthorityError> {
        Err(TimestampAuthorityError::Timeout)
    }
}

fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn self_signed(key: &PKey<Private>, common_name: &str) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(4242).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder.sign(key, MessageDigest::sha256()).unwrap();
    builder.build()
}

fn identity(key: PKey<Private>) -> SigningIdentity {
    let cert = self_signed(&key, "Sasana Test Signer");
    SigningIdentity::new(key, cert, vec![]).unwrap()
}

fn rendered_audit_trail() -> Vec<u8> {
    let submission = Submission::v1(
        SubmissionId(5150),
        AccountId(2),
        Template {
            name: "Lease".to_string(),
            submitters: vec![TemplateSubmitter {
                uuid: "s1".to_string(),
                name: "Tenant".to_string(),
            }],
            fields: vec![],
            documents: vec![],
            schema: vec![],
        },
        vec![Submitter {
            id: SubmitterId(1),
            uuid: "s1".to_string(),
            name: Some("Jane Doe".to_string()),
            email: Some("jane@x.com".to_string()),
            phone: None,
            completed_at: Some(SIGNED_AT),
            attachments: vec![],
            values: BTreeMap::new(),
            documents: vec![],
        }],
        vec![],
        false,
    )
    .unwrap();
    let account =
        AccountSettings::v1(AccountId(2), AccountTimezone::utc(), "en".to_string(), None).unwrap();
    let style = AuditTrailStyle::mvp_v1();
    let composition = AuditTrailComposer::new(style.clone())
        .compose(
            &AuditTrailInput {
                submission: &submission,
                account: &account,
                verify_url: None,
            },
            &NoImages,
        )
        .unwrap();
    PdfRenderer::new(style).render(&composition.document).unwrap()
}

fn decode_hex(hex: &[u8]) -> Vec<u8> {
    let nibble = |c: u8| match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'F' => c - b'A' + 10,
        b'a'..=b'f' => c - b'a' + 10,
        _ => panic!("not a hex digit: {c}"),
    };
    hex.chunks(2)
        .map(|pair| (nibble(pair[0]) << 4) | nibble(pair[1]))
        .collect()
}

/// The DER signature with the zero padding stripped.
fn embedded_signature(signed: &SignedDocument) -> Vec<u8> {
    let [_, first_len, second_start, _] = signed.byte_range;
    let padded = decode_hex(&signed.bytes[first_len + 1..second_start - 1]);
    let (tlv, _) = der::read_tlv(&padded).unwrap();
    tlv.raw.to_vec()
}

fn covered_bytes(signed: &SignedDocument) -> Vec<u8> {
    let [start, first_len, second_start, second_len] = signed.byte_range;
    let mut covered = signed.bytes[start..start + first_len].to_vec();
    covered.extend_from_slice(&signed.bytes[second_start..second_start + second_len]);
    covered
}

fn verify(signed: &SignedDocument, certificate: &X509) -> Result<(), openssl::error::ErrorStack> {
    let pkcs7 = Pkcs7::from_der(&embedded_signature(signed))?;
    let mut certs = Stack::new()?;
    certs.push(certificate.clone())?;
    let store = X509StoreBuilder::new()?.build();
    pkcs7.verify(
        &certs,
        &store,
        Some(&covered_bytes(signed)),
        None,
        Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
    )
}

#[test]
fn at_signing_it_01_rsa_signature_verifies_over_byte_range() {
    let pdf = rendered_audit_trail();
    let identity = identity(rsa_key());
    let signed = SigningEngine::mvp_v1()
        .sign(&pdf, &identity, REASON, SIGNED_AT, None)
        .unwrap();

    assert_eq!(signed.byte_range[0], 0);
    assert_eq!(
        signed.byte_range[2] + signed.byte_range[3],
        signed.bytes.len()
    );
    assert!(signed.timestamp.is_none());
    verify(&signed, identity.certificate()).unwrap();

    let loaded = lopdf::Document::load_mem(&signed.bytes).unwrap();
    assert_eq!(loaded.get_pages().len(), 1);
    let text = String::from_utf8_lossy(&signed.bytes);
    assert!(text.contains("adbe.pkcs7.detached"));
    assert!(text.contains(REASON));
}

#[test]
fn at_signing_it_02_ec_signature_verifies() {
    let pdf = rendered_audit_trail();
    let identity = identity(ec_key());
    let signed = SigningEngine::mvp_v1()
        .sign(&pdf, &identity, REASON, SIGNED_AT, None)
        .unwrap();
    verify(&signed, identity.certificate()).unwrap();
}

#[test]
fn at_signing_it_03_tampering_breaks_verification() {
    let pdf = rendered_audit_trail();
    let identity = identity(rsa_key());
    let mut signed = SigningEngine::mvp_v1()
        .sign(&pdf, &identity, REASON, SIGNED_AT, None)
        .unwrap();
    let last = signed.bytes.len() - 1;
    signed.bytes[last] ^= 0x01;
    assert!(verify(&signed, identity.certificate()).is_err());
}

#[test]
fn at_signing_it_04_timestamp_token_is_embedded_unsigned() {
    let token = der::sequence(&[&der::oid(der::oids::TST_INFO), &der::null()]);
    let authority = FixedAuthority {
        token: token.clone(),
    };
    let pdf = rendered_audit_trail();
    let identity = identity(rsa_key());
    let signed = SigningEngine::mvp_v1()
        .sign(&pdf, &identity, REASON, SIGNED_AT, Some(&authority))
        .unwrap();

    assert_eq!(
        signed.timestamp.as_ref().map(|t| t.der.clone()),
        Some(token.clone())
    );
    let blob = embedded_signature(&signed);
    assert!(blob.windows(token.len()).any(|w| w == token.as_slice()));
    verify(&signed, identity.certificate()).unwrap();
}

#[test]
fn at_signing_it_05_timestamp_failure_is_fatal() {
    let pdf = rendered_audit_trail();
    let identity = identity(rsa_key());
    let out = SigningEngine::mvp_v1().sign(&pdf, &identity, REASON, SIGNED_AT, Some(&DownAuthority));
    assert!(matches!(
        out,
        Err(SigningError::Timestamp(TimestampAuthorityError::Timeout))
    ));
}

#[test]
fn at_signing_it_06_mismatched_key_is_rejected() {
    let cert = self_signed(&rsa_key(), "Someone Else");
    let out = SigningIdentity::new(rsa_key(), cert, vec![]);
    assert!(matches!(out, Err(SigningError::InvalidCredential(_))));
}

#[test]
fn at_signing_it_07_undersized_placeholder_is_reported() {
    let pdf = rendered_audit_trail();
    let identity = identity(rsa_key());
    let out = SigningEngine::with_capacity(64).sign(&pdf, &identity, REASON, SIGNED_AT, None);
    assert!(matches!(
        out,
        Err(SigningError::SignatureTooLarge { available: 64, .. })
    ));
}

#[test]
fn at_signing_it_08_pem_identity_exposes_subject() {
    let key = rsa_key();
    let cert = self_signed(&key, "Sasana PEM Signer");
    let identity = SigningIdentity::from_pem(
        &key.private_key_to_pem_pkcs8().unwrap(),
        &cert.to_pem().unwrap(),
        None,
    )
    .unwrap();
    assert_eq!(
        identity.subject_common_name().as_deref(),
        Some("Sasana PEM Signer")
    );
    assert!(format!("{identity:?}").contains("<redacted>"));
}
