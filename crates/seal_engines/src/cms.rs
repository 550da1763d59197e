#![forbid(unsafe_code)]

//! Detached CMS `SignedData` (PKCS#7) for PDF signatures.

use crate::der::{self, oids, DerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    RsaSha256,
    EcdsaSha256,
}

impl SignatureAlgorithm {
    pub fn algorithm_identifier(self) -> Vec<u8> {
        match self {
            SignatureAlgorithm::RsaSha256 => der::algorithm_identifier(oids::RSA_ENCRYPTION, true),
            SignatureAlgorithm::EcdsaSha256 => {
                der::algorithm_identifier(oids::ECDSA_WITH_SHA256, false)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerAndSerial {
    /// DER `Name`.
    pub issuer: Vec<u8>,
    /// DER `INTEGER`.
    pub serial: Vec<u8>,
}

/// Reads issuer and serial number out of a DER X.509 certificate.
pub fn issuer_and_serial(certificate_der: &[u8]) -> Result<IssuerAndSerial, DerError> {
    let cert = der::read_single(certificate_der)?;
    cert.expect_tag(der::TAG_SEQUENCE)?;
    let tbs = *cert.children()?.first().ok_or(DerError::Truncated)?;
    tbs.expect_tag(der::TAG_SEQUENCE)?;
    let fields = tbs.children()?;
    // [0] EXPLICIT version is absent on v1 certificates.
    let offset = usize::from(fields.first().map(|f| f.tag) == Some(0xA0));
    let serial = fields.get(offset).ok_or(DerError::Truncated)?;
    serial.expect_tag(der::TAG_INTEGER)?;
    let issuer = fields.get(offset + 2).ok_or(DerError::Truncated)?;
    issuer.expect_tag(der::TAG_SEQUENCE)?;
    Ok(IssuerAndSerial {
        issuer: issuer.raw.to_vec(),
        serial: serial.raw.to_vec(),
    })
}

fn attribute(kind: &[u64], value: Vec<u8>) -> Vec<u8> {
    der::sequence(&[&der::oid(kind), &der::set_of(vec![value])])
}

/// content-type, signing-time and message-digest, unsorted.
pub fn signed_attributes(message_digest: &[u8; 32], signing_time_utc: &str) -> Vec<Vec<u8>> {
    vec![
        attribute(oids::CONTENT_TYPE, der::oid(oids::PKCS7_DATA)),
        attribute(oids::SIGNING_TIME, der::utc_time(signing_time_utc)),
        attribute(oids::MESSAGE_DIGEST, der::octet_string(message_digest)),
    ]
}

/// The bytes the signer signs: the attributes as a DER `SET OF`.
pub fn signed_attributes_for_signature(attributes: &[Vec<u8>]) -> Vec<u8> {
    der::set_of(attributes.to_vec())
}

#[derive(Debug, Clone, Copy)]
pub struct SignerInfoParts<'a> {
    pub certificate_der: &'a [u8],
    pub chain_der: &'a [Vec<u8>],
    pub algorithm: SignatureAlgorithm,
    pub signed_attributes: &'a [Vec<u8>],
    pub signature: &'a [u8],
    pub timestamp_token: Option<&'a [u8]>,
}

/// `ContentInfo { signedData }` with detached content.
pub fn signed_data(parts: SignerInfoParts<'_>) -> Result<Vec<u8>, DerError> {
    let sid = issuer_and_serial(parts.certificate_der)?;
    let digest_algorithm = der::algorithm_identifier(oids::SHA256, true);

    let mut signed_attrs = signed_attributes_for_signature(parts.signed_attributes);
    // Same encoding, [0] IMPLICIT tag instead of SET.
    signed_attrs[0] = 0xA0;

    let mut signer_info = vec![
        der::small_integer(1),
        der::sequence(&[&sid.issuer, &sid.serial]),
        digest_algorithm.clone(),
        signed_attrs,
        parts.algorithm.algorithm_identifier(),
        der::octet_string(parts.signature),
    ];
    if let Some(token) = parts.timestamp_token {
        let unsigned = der::set_of(vec![attribute(
            oids::SIGNATURE_TIMESTAMP_TOKEN,
            token.to_vec(),
        )]);
        signer_info.push(der::tlv(0xA1, &unsigned[der_header_len(&unsigned)?..]));
    }
    let signer_info_refs: Vec<&[u8]> = signer_info.iter().map(Vec::as_slice).collect();

    let mut certificates = parts.certificate_der.to_vec();
    for cert in parts.chain_der {
        certificates.extend_from_slice(cert);
    }

    let body = der::sequence(&[
        &der::small_integer(1),
        &der::set_of(vec![digest_algorithm]),
        &der::sequence(&[&der::oid(oids::PKCS7_DATA)]),
        &der::context_constructed(0, &certificates),
        &der::set_of(vec![der::sequence(&signer_info_refs)]),
    ]);
    Ok(der::sequence(&[
        &der::oid(oids::PKCS7_SIGNED_DATA),
        &der::context_constructed(0, &body),
    ]))
}

fn der_header_len(encoded: &[u8]) -> Result<usize, DerError> {
    let (tlv, _) = der::read_tlv(encoded)?;
    Ok(tlv.raw.len() - tlv.content.len())
}
