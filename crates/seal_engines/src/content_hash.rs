#![forbid(unsafe_code)]

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use seal_kernel_contracts::submission::{Document, Submission, Template};
use seal_kernel_contracts::UnixTimeMs;
use sha2::{Digest, Sha256};

use crate::error::DataIntegrityWarning;

/// Raw SHA-256 of `bytes`.
pub fn sha256_digest(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Digest text as stored in blob metadata: URL-safe base64, padded.
pub fn encode_digest(digest: &[u8]) -> String {
    URL_SAFE.encode(digest)
}

/// Pre-attached metadata digest when present, otherwise SHA-256 over the bytes.
pub fn document_digest(doc: &Document) -> String {
    match doc.sha256.as_deref() {
        Some(existing) if !existing.trim().is_empty() => existing.to_string(),
        _ => encode_digest(&sha256_digest(&doc.bytes)),
    }
}

/// Template documents that a result document was produced from.
///
/// Matches by uuid first. Generated image pages have their own uuid, so when
/// nothing matches every image document referenced by the visual schema counts.
pub fn originals_for<'a>(template: &'a Template, result: &Document) -> Vec<&'a Document> {
    let direct: Vec<&Document> = template
        .documents
        .iter()
        .filter(|d| d.uuid == result.uuid)
        .collect();
    if !direct.is_empty() {
        return direct;
    }
    template
        .documents
        .iter()
        .filter(|d| {
            d.is_image
                && template
                    .schema
                    .iter()
                    .any(|item| item.attachment_uuid == d.uuid)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChecksum {
    pub document_uuid: String,
    pub filename: String,
    pub url: Option<String>,
    /// Newline-joined; empty when no original could be located.
    pub original_sha256: String,
    pub result_sha256: String,
    pub generated_at: UnixTimeMs,
}

/// Checksums for the result documents of the last completed submitter.
pub fn collect_checksums(
    submission: &Submission,
    warnings: &mut Vec<DataIntegrityWarning>,
) -> Vec<DocumentChecksum> {
    let Some(last) = submission.last_completed_submitter() else {
        return Vec::new();
    };
    last.documents
        .iter()
        .map(|result| {
            let originals = originals_for(&submission.template, result);
            if originals.is_empty() {
                warnings.push(DataIntegrityWarning::MissingOriginalDocument {
                    document_uuid: result.uuid.clone(),
                });
            }
            DocumentChecksum {
                document_uuid: result.uuid.clone(),
                filename: result.filename.clone(),
                url: result.url.clone(),
                original_sha256: originals
                    .iter()
                    .map(|d| document_digest(d))
                    .collect::<Vec<_>>()
                    .join("\n"),
                result_sha256: document_digest(result),
                generated_at: result.created_at,
            }
        })
        .collect()
}
