#![forbid(unsafe_code)]

//! Minimal DER writer/reader covering what CMS signing and RFC 3161 need.

pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_UTC_TIME: u8 = 0x17;
pub const TAG_GENERALIZED_TIME: u8 = 0x18;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;

pub mod oids {
    pub const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
    pub const RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];
    pub const ECDSA_WITH_SHA256: &[u64] = &[1, 2, 840, 10045, 4, 3, 2];
    pub const PKCS7_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
    pub const PKCS7_SIGNED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 2];
    pub const CONTENT_TYPE: &[u64] = &[1, 2, 840, 113549, 1, 9, 3];
    pub const MESSAGE_DIGEST: &[u64] = &[1, 2, 840, 113549, 1, 9, 4];
    pub const SIGNING_TIME: &[u64] = &[1, 2, 840, 113549, 1, 9, 5];
    pub const SIGNATURE_TIMESTAMP_TOKEN: &[u64] = &[1, 2, 840, 113549, 1, 9, 16, 2, 14];
    pub const TST_INFO: &[u64] = &[1, 2, 840, 113549, 1, 9, 16, 1, 4];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DerError {
    #[error("input truncated")]
    Truncated,
    #[error("unsupported length encoding")]
    UnsupportedLength,
    #[error("expected tag {expected:#04x}, found {found:#04x}")]
    UnexpectedTag { expected: u8, found: u8 },
    #[error("trailing bytes after element")]
    TrailingBytes,
}

pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    encode_length(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

pub fn sequence(parts: &[&[u8]]) -> Vec<u8> {
    tlv(TAG_SEQUENCE, &parts.concat())
}

/// DER `SET OF`: members are sorted by their encodings.
pub fn set_of(mut members: Vec<Vec<u8>>) -> Vec<u8> {
    members.sort();
    tlv(TAG_SET, &members.concat())
}

pub fn context_constructed(number: u8, content: &[u8]) -> Vec<u8> {
    tlv(0xA0 | number, content)
}

pub fn oid(arcs: &[u64]) -> Vec<u8> {
    let mut body = Vec::new();
    if arcs.len() >= 2 {
        push_base128(arcs[0] * 40 + arcs[1], &mut body);
        for arc in &arcs[2..] {
            push_base128(*arc, &mut body);
        }
    }
    tlv(TAG_OID, &body)
}

fn push_base128(mut value: u64, out: &mut Vec<u8>) {
    let mut chunk = [0u8; 10];
    let mut i = chunk.len();
    loop {
        i -= 1;
        chunk[i] = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    let last = chunk.len() - 1;
    for (idx, b) in chunk.iter().enumerate().skip(i) {
        out.push(if idx == last { *b } else { *b | 0x80 });
    }
}

/// Non-negative INTEGER from big-endian magnitude bytes.
pub fn unsigned_integer(magnitude: &[u8]) -> Vec<u8> {
    let skip = magnitude.iter().take_while(|b| **b == 0).count();
    let trimmed = &magnitude[skip..];
    let mut body = Vec::with_capacity(trimmed.len() + 1);
    if trimmed.first().map_or(true, |b| b & 0x80 != 0) {
        body.push(0);
    }
    body.extend_from_slice(trimmed);
    tlv(TAG_INTEGER, &body)
}

pub fn small_integer(value: u64) -> Vec<u8> {
    unsigned_integer(&value.to_be_bytes())
}

pub fn octet_string(content: &[u8]) -> Vec<u8> {
    tlv(TAG_OCTET_STRING, content)
}

pub fn null() -> Vec<u8> {
    vec![TAG_NULL, 0]
}

pub fn boolean(value: bool) -> Vec<u8> {
    vec![TAG_BOOLEAN, 1, if value { 0xff } else { 0 }]
}

/// `YYMMDDHHMMSSZ`; callers pass an already formatted UTC string.
pub fn utc_time(formatted: &str) -> Vec<u8> {
    tlv(TAG_UTC_TIME, formatted.as_bytes())
}

pub fn algorithm_identifier(algorithm: &[u64], with_null_params: bool) -> Vec<u8> {
    if with_null_params {
        sequence(&[&oid(algorithm), &null()])
    } else {
        sequence(&[&oid(algorithm)])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub content: &'a [u8],
    /// Header plus content, exactly as encoded.
    pub raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    pub fn expect_tag(&self, tag: u8) -> Result<&Self, DerError> {
        if self.tag != tag {
            return Err(DerError::UnexpectedTag {
                expected: tag,
                found: self.tag,
            });
        }
        Ok(self)
    }

    pub fn children(&self) -> Result<Vec<Tlv<'a>>, DerError> {
        children(self.content)
    }

    /// Value of a small INTEGER; wider values are rejected as truncated.
    pub fn as_i64(&self) -> Result<i64, DerError> {
        self.expect_tag(TAG_INTEGER)?;
        if self.content.is_empty() || self.content.len() > 8 {
            return Err(DerError::Truncated);
        }
        let negative = self.content[0] & 0x80 != 0;
        let mut value: i64 = if negative { -1 } else { 0 };
        for b in self.content {
            value = (value << 8) | i64::from(*b);
        }
        Ok(value)
    }
}

pub fn read_tlv(input: &[u8]) -> Result<(Tlv<'_>, &[u8]), DerError> {
    let (&tag, rest) = input.split_first().ok_or(DerError::Truncated)?;
    let (&first, rest) = rest.split_first().ok_or(DerError::Truncated)?;
    let (len, rest) = if first & 0x80 == 0 {
        (first as usize, rest)
    } else {
        let count = (first & 0x7f) as usize;
        if count == 0 || count > std::mem::size_of::<usize>() {
            return Err(DerError::UnsupportedLength);
        }
        if rest.len() < count {
            return Err(DerError::Truncated);
        }
        let len = rest[..count]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (len, &rest[count..])
    };
    if rest.len() < len {
        return Err(DerError::Truncated);
    }
    let header_len = input.len() - rest.len();
    let tlv = Tlv {
        tag,
        content: &rest[..len],
        raw: &input[..header_len + len],
    };
    Ok((tlv, &rest[len..]))
}

/// Parses exactly one element spanning the whole input.
pub fn read_single(input: &[u8]) -> Result<Tlv<'_>, DerError> {
    let (tlv, rest) = read_tlv(input)?;
    if !rest.is_empty() {
        return Err(DerError::TrailingBytes);
    }
    Ok(tlv)
}

pub fn children(mut content: &[u8]) -> Result<Vec<Tlv<'_>>, DerError> {
    let mut out = Vec::new();
    while !content.is_empty() {
        let (tlv, rest) = read_tlv(content)?;
        out.push(tlv);
        content = rest;
    }
    Ok(out)
}
