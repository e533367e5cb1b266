//! Ordered fallback decoding of a base64-stripped payload.
//!
//! Saves written by different game versions carry no format marker, so every
//! known decoder is tried in a fixed order and the first one that yields JSON
//! wins. Each decoder only reads the payload.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use flate2::read::{MultiGzDecoder, ZlibDecoder};
use serde::Serialize;

use crate::crypto::{self, Unpadding};
use crate::diagnostics::FailureReport;
use crate::document::SaveDocument;
use crate::error::{CodecError, MethodError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodeMethod {
    Plain,
    Zlib,
    ZlibHeadered,
    Gzip,
    AesCbc,
}

impl DecodeMethod {
    /// Chain order.
    pub const ALL: [Self; 5] = [
        Self::Plain,
        Self::Zlib,
        Self::ZlibHeadered,
        Self::Gzip,
        Self::AesCbc,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Zlib => "zlib",
            Self::ZlibHeadered => "zlib-headered",
            Self::Gzip => "gzip",
            Self::AesCbc => "aes-cbc",
        }
    }

    pub fn decode(&self, payload: &[u8]) -> Result<SaveDocument, MethodError> {
        match self {
            Self::Plain => SaveDocument::from_slice(payload),
            Self::Zlib => decode_zlib(payload),
            Self::ZlibHeadered => decode_zlib_headered(payload),
            Self::Gzip => decode_gzip(payload),
            Self::AesCbc => decode_aes_cbc(payload),
        }
    }
}

impl fmt::Display for DecodeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DecodeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown save format '{s}'"))
    }
}

/// A successful decode: which decoder matched and what it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome {
    pub method: DecodeMethod,
    pub payload_len: usize,
    pub document: SaveDocument,
}

/// One rejected decoder, kept for the failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodAttempt {
    pub method: DecodeMethod,
    pub skipped: bool,
    #[serde(serialize_with = "serialize_display")]
    pub error: MethodError,
}

impl MethodAttempt {
    pub fn new(method: DecodeMethod, error: MethodError) -> Self {
        Self {
            method,
            skipped: error.is_skip(),
            error,
        }
    }
}

fn serialize_display<T: fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub fn decode_payload(payload: &[u8]) -> Result<DecodeOutcome, CodecError> {
    let mut attempts = Vec::with_capacity(DecodeMethod::ALL.len());
    for method in DecodeMethod::ALL {
        match method.decode(payload) {
            Ok(document) => {
                log::info!("decoded {} byte payload as {method}", payload.len());
                return Ok(DecodeOutcome {
                    method,
                    payload_len: payload.len(),
                    document,
                });
            }
            Err(error) => {
                log::debug!("{method} decoder rejected payload: {error}");
                attempts.push(MethodAttempt::new(method, error));
            }
        }
    }
    Err(CodecError::DecodeExhausted(Box::new(FailureReport::new(
        payload, attempts,
    ))))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    Little,
    Big,
}

/// The first four payload bytes read as a length field, both ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthHeader {
    pub le: u32,
    pub be: u32,
    pub total: usize,
}

impl LengthHeader {
    pub const LEN: usize = 4;

    pub fn read(payload: &[u8]) -> Option<Self> {
        let field: [u8; Self::LEN] = payload.get(..Self::LEN)?.try_into().ok()?;
        Some(Self {
            le: u32::from_le_bytes(field),
            be: u32::from_be_bytes(field),
            total: payload.len(),
        })
    }

    pub fn is_plausible(&self, endian: Endian) -> bool {
        let len = match endian {
            Endian::Little => self.le,
            Endian::Big => self.be,
        } as usize;
        len > Self::LEN && len < self.total
    }

    /// Little-endian first, then big-endian.
    pub fn first_plausible(&self) -> Option<Endian> {
        [Endian::Little, Endian::Big]
            .into_iter()
            .find(|&endian| self.is_plausible(endian))
    }

    fn implausible(&self) -> MethodError {
        MethodError::HeaderImplausible {
            le: self.le,
            be: self.be,
            total: self.total,
        }
    }
}

pub(crate) fn inflate_zlib(data: &[u8]) -> Result<Vec<u8>, MethodError> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Inflates every member of a gzip stream, not just the first.
pub(crate) fn inflate_gzip(data: &[u8]) -> Result<Vec<u8>, MethodError> {
    let mut out = Vec::new();
    MultiGzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

fn decode_zlib(payload: &[u8]) -> Result<SaveDocument, MethodError> {
    SaveDocument::from_slice(&inflate_zlib(payload)?)
}

fn decode_zlib_headered(payload: &[u8]) -> Result<SaveDocument, MethodError> {
    let header = LengthHeader::read(payload).ok_or(MethodError::TooShort {
        len: payload.len(),
    })?;
    // Both readings strip the same four bytes; the endianness only decides
    // whether the header is believable at all.
    let endian = header.first_plausible().ok_or_else(|| header.implausible())?;
    log::debug!(
        "length header plausible as {endian:?}-endian ({} / {} bytes)",
        header.le,
        header.be
    );
    SaveDocument::from_slice(&inflate_zlib(&payload[LengthHeader::LEN..])?)
}

fn decode_gzip(payload: &[u8]) -> Result<SaveDocument, MethodError> {
    let raw_err = match inflate_gzip(payload).and_then(|bytes| SaveDocument::from_slice(&bytes)) {
        Ok(doc) => return Ok(doc),
        Err(err) => err,
    };

    let Some(endian) = LengthHeader::read(payload).and_then(|h| h.first_plausible()) else {
        return Err(raw_err);
    };
    log::debug!("retrying gzip after a {endian:?}-endian length header");
    inflate_gzip(&payload[LengthHeader::LEN..])
        .and_then(|bytes| SaveDocument::from_slice(&bytes))
        .map_err(move |headered_err| match (raw_err, headered_err) {
            (MethodError::Decompress(a), MethodError::Decompress(b)) => {
                MethodError::Decompress(format!("{a}; after length header: {b}"))
            }
            // the stripped body inflated, so its error is the informative one
            (MethodError::Decompress(_), other) => other,
            (raw, _) => raw,
        })
}

fn decode_aes_cbc(payload: &[u8]) -> Result<SaveDocument, MethodError> {
    let plaintext = crypto::decrypt(payload)?;
    let (body, unpadding) = crypto::unpad_lenient(&plaintext);
    if unpadding == Unpadding::ZeroStripped {
        log::warn!("invalid PKCS#7 padding, falling back to stripping trailing NUL bytes");
    }
    SaveDocument::from_slice(body)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use serde_json::json;

    use super::*;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("zlib encode should write");
        encoder.finish().expect("zlib encode should finish")
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("gzip encode should write");
        encoder.finish().expect("gzip encode should finish")
    }

    fn with_header(header: [u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = header.to_vec();
        out.extend_from_slice(body);
        out
    }

    const DOC: &[u8] = br#"{"vault":{"VaultName":"042","VaultMode":"Normal"}}"#;

    #[test]
    fn tags_round_trip_through_from_str() {
        for method in DecodeMethod::ALL {
            assert_eq!(method.tag().parse::<DecodeMethod>(), Ok(method));
        }
        assert!("lzma".parse::<DecodeMethod>().is_err());
    }

    #[test]
    fn plain_json_wins_first() {
        let outcome = decode_payload(br#"{"a":1}"#).expect("plain json decodes");
        assert_eq!(outcome.method, DecodeMethod::Plain);
        assert_eq!(outcome.document.as_value(), &json!({"a": 1}));
        assert_eq!(outcome.payload_len, 7);
    }

    #[test]
    fn zlib_payload_decodes_as_zlib() {
        let outcome = decode_payload(&zlib(DOC)).expect("zlib decodes");
        assert_eq!(outcome.method, DecodeMethod::Zlib);
    }

    #[test]
    fn little_endian_headered_zlib_decodes() {
        let body = zlib(DOC);
        let payload = with_header((body.len() as u32).to_le_bytes(), &body);
        let outcome = decode_payload(&payload).expect("headered zlib decodes");
        assert_eq!(outcome.method, DecodeMethod::ZlibHeadered);
    }

    #[test]
    fn big_endian_header_used_when_little_endian_is_implausible() {
        let body = zlib(DOC);
        // 00 00 00 10 reads as 268435456 LE (too large) and 16 BE (plausible)
        let payload = with_header([0x00, 0x00, 0x00, 0x10], &body);
        let header = LengthHeader::read(&payload).expect("long enough");
        assert!(!header.is_plausible(Endian::Little));
        assert!(header.is_plausible(Endian::Big));
        assert_eq!(header.first_plausible(), Some(Endian::Big));

        let outcome = decode_payload(&payload).expect("big-endian header decodes");
        assert_eq!(outcome.method, DecodeMethod::ZlibHeadered);
    }

    #[test]
    fn headered_method_skips_implausible_lengths() {
        let body = zlib(DOC);
        let payload = with_header([0xff, 0xff, 0xff, 0xff], &body);
        let err = DecodeMethod::ZlibHeadered
            .decode(&payload)
            .expect_err("header is implausible");
        assert!(matches!(err, MethodError::HeaderImplausible { .. }));
        assert!(err.is_skip());

        let err = DecodeMethod::ZlibHeadered
            .decode(&[1, 2])
            .expect_err("too short");
        assert_eq!(err, MethodError::TooShort { len: 2 });
    }

    #[test]
    fn header_length_bounds_are_exclusive() {
        let four = LengthHeader {
            le: 4,
            be: 4,
            total: 100,
        };
        assert_eq!(four.first_plausible(), None);
        let total = LengthHeader {
            le: 100,
            be: 100,
            total: 100,
        };
        assert_eq!(total.first_plausible(), None);
    }

    #[test]
    fn gzip_payload_decodes_raw_and_headered() {
        let body = gzip(DOC);
        let outcome = decode_payload(&body).expect("gzip decodes");
        assert_eq!(outcome.method, DecodeMethod::Gzip);

        let payload = with_header((body.len() as u32).to_le_bytes(), &body);
        let outcome = decode_payload(&payload).expect("headered gzip decodes");
        assert_eq!(outcome.method, DecodeMethod::Gzip);
    }

    #[test]
    fn gzip_reads_concatenated_members() {
        let mut payload = gzip(br#"{"a":"#);
        payload.extend_from_slice(&gzip(b"1}"));
        let outcome = decode_payload(&payload).expect("multi-member gzip decodes");
        assert_eq!(outcome.method, DecodeMethod::Gzip);
        assert_eq!(outcome.document.as_value(), &json!({"a": 1}));

        let headered = with_header((payload.len() as u32).to_le_bytes(), &payload);
        let outcome = decode_payload(&headered).expect("headered multi-member gzip decodes");
        assert_eq!(outcome.method, DecodeMethod::Gzip);
        assert_eq!(outcome.document.as_value(), &json!({"a": 1}));
    }

    #[test]
    fn aes_payload_decodes_last() {
        let outcome = decode_payload(&crypto::encrypt(DOC)).expect("aes decodes");
        assert_eq!(outcome.method, DecodeMethod::AesCbc);
        assert_eq!(
            outcome.document.as_value(),
            &json!({"vault": {"VaultName": "042", "VaultMode": "Normal"}})
        );
    }

    #[test]
    fn methods_do_not_mutate_payload() {
        let payload = crypto::encrypt(DOC);
        let copy = payload.clone();
        for method in DecodeMethod::ALL {
            let _ = method.decode(&payload);
        }
        assert_eq!(payload, copy);
    }

    #[test]
    fn exhaustion_records_every_method_in_order() {
        let err = decode_payload(b"not json at all!").expect_err("nothing decodes");
        let report = err.failure_report().expect("exhaustion carries a report");
        let methods: Vec<DecodeMethod> = report.attempts.iter().map(|a| a.method).collect();
        assert_eq!(methods, DecodeMethod::ALL.to_vec());
        assert!(matches!(
            report.attempts[0].error,
            MethodError::MalformedJson(_)
        ));
    }
}
