#![forbid(unsafe_code)]

//! Embeds a detached CMS signature into a rendered PDF.

use std::fmt;

use chrono::{DateTime, Utc};
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{Id, PKey, Private};
use openssl::sign::Signer;
use openssl::x509::X509;
use seal_kernel_contracts::UnixTimeMs;
use sha2::{Digest, Sha256};

use crate::cms::{self, SignatureAlgorithm, SignerInfoParts};
use crate::content_hash::sha256_digest;
use crate::error::SigningError;
use crate::tsa::{TimestampAuthority, TimestampToken};

const BYTE_RANGE_PLACEHOLDER: i64 = 9_999_999_999;
const SIGNATURE_FIELD_NAME: &str = "Signature1";

/// Account key, end-entity certificate and intermediate chain.
pub struct SigningIdentity {
    key: PKey<Private>,
    certificate: X509,
    chain: Vec<X509>,
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("subject", &self.subject_common_name())
            .field("chain_len", &self.chain.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SigningIdentity {
    pub fn new(
        key: PKey<Private>,
        certificate: X509,
        chain: Vec<X509>,
    ) -> Result<Self, SigningError> {
        if key.id() != Id::RSA && key.id() != Id::EC {
            return Err(SigningError::InvalidCredential(
                "only RSA and EC keys are supported",
            ));
        }
        let public = certificate.public_key()?;
        if !public.public_eq(&key) {
            return Err(SigningError::InvalidCredential(
                "private key does not match certificate",
            ));
        }
        Ok(Self {
            key,
            certificate,
            chain,
        })
    }

    pub fn from_pkcs12_der(der: &[u8], password: &str) -> Result<Self, SigningError> {
        let parsed = Pkcs12::from_der(der)?.parse2(password)?;
        let key = parsed
            .pkey
            .ok_or(SigningError::InvalidCredential("bundle has no private key"))?;
        let certificate = parsed
            .cert
            .ok_or(SigningError::InvalidCredential("bundle has no certificate"))?;
        let chain = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();
        Self::new(key, certificate, chain)
    }

    pub fn from_pem(
        key_pem: &[u8],
        certificate_pem: &[u8],
        chain_pem: Option<&[u8]>,
    ) -> Result<Self, SigningError> {
        let key = PKey::private_key_from_pem(key_pem)?;
        let certificate = X509::from_pem(certificate_pem)?;
        let chain = match chain_pem {
            Some(pem) => X509::stack_from_pem(pem)?,
            None => Vec::new(),
        };
        Self::new(key, certificate, chain)
    }

    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    pub fn subject_common_name(&self) -> Option<String> {
        self.certificate
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .and_then(|entry| entry.data().as_utf8().ok())
            .map(|cn| cn.to_string())
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        if self.key.id() == Id::EC {
            SignatureAlgorithm::EcdsaSha256
        } else {
            SignatureAlgorithm::RsaSha256
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDocument {
    pub bytes: Vec<u8>,
    /// `[start1, len1, start2, len2]` of the bytes covered by the signature.
    pub byte_range: [usize; 4],
    pub timestamp: Option<TimestampToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningEngine {
    /// Bytes reserved for the DER signature inside `/Contents`.
    contents_capacity: usize,
}

impl SigningEngine {
    pub fn mvp_v1() -> Self {
        Self {
            contents_capacity: 16_384,
        }
    }

    pub fn with_capacity(contents_capacity: usize) -> Self {
        Self { contents_capacity }
    }

    pub fn sign(
        &self,
        pdf: &[u8],
        identity: &SigningIdentity,
        reason: &str,
        signing_time: UnixTimeMs,
        timestamp_authority: Option<&dyn TimestampAuthority>,
    ) -> Result<SignedDocument, SigningError> {
        let time = DateTime::<Utc>::from_timestamp_millis(signing_time.0)
            .ok_or(SigningError::Pdf("signing time out of range".to_string()))?;
        let signer_name = identity.subject_common_name().unwrap_or_default();

        let mut doc = Document::load_mem(pdf).map_err(pdf_error)?;
        let sig_id = doc.add_object(dictionary! {
            "Type" => "Sig",
            "Filter" => "Adobe.PPKLite",
            "SubFilter" => "adbe.pkcs7.detached",
            "ByteRange" => vec![
                Object::Integer(0),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
            ],
            "Contents" => Object::String(vec![0u8; self.contents_capacity], StringFormat::Hexadecimal),
            "Reason" => Object::String(reason.as_bytes().to_vec(), StringFormat::Literal),
            "M" => Object::String(
                time.format("D:%Y%m%d%H%M%SZ").to_string().into_bytes(),
                StringFormat::Literal,
            ),
            "Name" => Object::String(signer_name.into_bytes(), StringFormat::Literal),
        });
        attach_signature_field(&mut doc, sig_id)?;

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| SigningError::Pdf(e.to_string()))?;

        let (contents_start, contents_end) = locate_contents(&bytes, self.contents_capacity)?;
        let byte_range = [
            0,
            contents_start,
            contents_end,
            bytes.len() - contents_end,
        ];
        patch_byte_range(&mut bytes, byte_range)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes[..contents_start]);
        hasher.update(&bytes[contents_end..]);
        let document_digest: [u8; 32] = hasher.finalize().into();

        let attributes = cms::signed_attributes(
            &document_digest,
            &time.format("%y%m%d%H%M%SZ").to_string(),
        );
        let mut signer = Signer::new(MessageDigest::sha256(), &identity.key)?;
        signer.update(&cms::signed_attributes_for_signature(&attributes))?;
        let signature = signer.sign_to_vec()?;

        let timestamp = match timestamp_authority {
            Some(authority) => Some(authority.timestamp(&sha256_digest(&signature))?),
            None => None,
        };

        let certificate_der = identity.certificate.to_der()?;
        let chain_der = identity
            .chain
            .iter()
            .map(|c| c.to_der())
            .collect::<Result<Vec<_>, _>>()?;
        let blob = cms::signed_data(SignerInfoParts {
            certificate_der: &certificate_der,
            chain_der: &chain_der,
            algorithm: identity.algorithm(),
            signed_attributes: &attributes,
            signature: &signature,
            timestamp_token: timestamp.as_ref().map(|t| t.der.as_slice()),
        })?;
        if blob.len() > self.contents_capacity {
            return Err(SigningError::SignatureTooLarge {
                needed: blob.len(),
                available: self.contents_capacity,
            });
        }
        let hex = upper_hex(&blob);
        bytes[contents_start + 1..contents_start + 1 + hex.len()].copy_from_slice(hex.as_bytes());

        tracing::debug!(
            bytes = bytes.len(),
            signature_bytes = blob.len(),
            timestamped = timestamp.is_some(),
            "audit trail signed"
        );
        Ok(SignedDocument {
            bytes,
            byte_range,
            timestamp,
        })
    }
}

fn pdf_error(err: lopdf::Error) -> SigningError {
    SigningError::Pdf(err.to_string())
}

/// Invisible signature widget on the first page plus the catalog `/AcroForm`.
fn attach_signature_field(doc: &mut Document, sig_id: ObjectId) -> Result<(), SigningError> {
    let page_id = doc
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or(SigningError::Pdf("document has no pages".to_string()))?;
    let field_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Sig",
        "Rect" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(0),
        ],
        "F" => Object::Integer(132),
        "T" => Object::String(SIGNATURE_FIELD_NAME.as_bytes().to_vec(), StringFormat::Literal),
        "V" => Object::Reference(sig_id),
        "P" => Object::Reference(page_id),
    });

    let existing = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .and_then(|page| page.get(b"Annots"))
        .ok()
        .cloned();
    match existing {
        Some(Object::Reference(annots_id)) => {
            doc.get_object_mut(annots_id)
                .and_then(Object::as_array_mut)
                .map_err(pdf_error)?
                .push(Object::Reference(field_id));
        }
        Some(Object::Array(mut annots)) => {
            annots.push(Object::Reference(field_id));
            page_dict_mut(doc, page_id)?.set("Annots", annots);
        }
        _ => {
            page_dict_mut(doc, page_id)?.set("Annots", vec![Object::Reference(field_id)]);
        }
    }

    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(pdf_error)?;
    let catalog = doc
        .get_object_mut(root_id)
        .and_then(Object::as_dict_mut)
        .map_err(pdf_error)?;
    catalog.set(
        "AcroForm",
        dictionary! {
            "Fields" => vec![Object::Reference(field_id)],
            "SigFlags" => Object::Integer(3),
        },
    );
    Ok(())
}

fn page_dict_mut(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<&mut lopdf::Dictionary, SigningError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(pdf_error)
}

/// Offsets of the zero-filled `<...>` placeholder, delimiters included.
pub fn locate_contents(bytes: &[u8], capacity: usize) -> Result<(usize, usize), SigningError> {
    let mut needle = Vec::with_capacity(capacity * 2 + 2);
    needle.push(b'<');
    needle.resize(capacity * 2 + 1, b'0');
    needle.push(b'>');
    let start = find(bytes, &needle, 0)
        .ok_or(SigningError::PlaceholderNotFound("/Contents"))?;
    Ok((start, start + needle.len()))
}

/// Rewrites the placeholder `/ByteRange` array in place, padding with spaces.
pub fn patch_byte_range(bytes: &mut [u8], range: [usize; 4]) -> Result<(), SigningError> {
    let missing = SigningError::PlaceholderNotFound("/ByteRange");
    let key = find(bytes, b"/ByteRange", 0).ok_or(missing)?;
    let open = find(bytes, b"[", key).ok_or(SigningError::PlaceholderNotFound("/ByteRange"))?;
    let close = find(bytes, b"]", open).ok_or(SigningError::PlaceholderNotFound("/ByteRange"))?;
    let placeholder = BYTE_RANGE_PLACEHOLDER.to_string();
    if find(&bytes[open..close], placeholder.as_bytes(), 0).is_none() {
        return Err(SigningError::PlaceholderNotFound("/ByteRange"));
    }

    let mut patched = format!("[{} {} {} {}", range[0], range[1], range[2], range[3]).into_bytes();
    let width = close - open;
    if patched.len() > width {
        return Err(SigningError::PlaceholderNotFound("/ByteRange"));
    }
    patched.resize(width, b' ');
    bytes[open..close].copy_from_slice(&patched);
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn upper_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[usize::from(b >> 4)] as char);
        out.push(DIGITS[usize::from(b & 0x0f)] as char);
    }
    out
}
