// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Codec registry — the closed set of textual encodings a policy descriptor may
// use for its certificates or fingerprints.  Lookup is either explicit (by
// name) or heuristic (by the lexical shape of a sample value).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pinvault_core::error::PinvaultError;

/// A named, stateless text <-> bytes transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Hex,
    Base64,
}

impl Encoding {
    /// Every registered encoding, most specific first.
    pub const ALL: [Encoding; 2] = [Encoding::Hex, Encoding::Base64];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Base64 => "base64",
        }
    }

    /// Decode `value` into raw bytes.  ASCII whitespace (line wrapping in
    /// pasted values) is ignored.
    pub fn decode(&self, value: &str) -> Result<Vec<u8>, PinvaultError> {
        let compact = strip_whitespace(value);
        let decoded = match self {
            Self::Hex => hex::decode(&compact).map_err(|e| e.to_string()),
            Self::Base64 => STANDARD.decode(&compact).map_err(|e| e.to_string()),
        };
        decoded.map_err(|detail| PinvaultError::MalformedEncoding {
            encoding: self.name().to_owned(),
            detail,
        })
    }

    /// Encode `bytes` in this encoding (lowercase for hex, padded for base64).
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Hex => hex::encode(bytes),
            Self::Base64 => STANDARD.encode(bytes),
        }
    }

    /// Whether `sample` has the lexical shape of this encoding.
    fn matches(&self, sample: &str) -> bool {
        match self {
            Self::Hex => {
                !sample.is_empty()
                    && sample.len() % 2 == 0
                    && sample.bytes().all(|b| b.is_ascii_hexdigit())
            }
            Self::Base64 => is_base64_shape(sample),
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicit lookup by name (case-insensitive).  Returns `None` for unknown
/// names; the caller decides whether that is fatal.
pub fn codec_by_name(name: &str) -> Option<Encoding> {
    match name.trim().to_ascii_lowercase().as_str() {
        "hex" | "hexadecimal" => Some(Encoding::Hex),
        "base64" => Some(Encoding::Base64),
        _ => None,
    }
}

/// Guess the encoding of `sample`.
///
/// Hex is tried before base64 because every hex string of suitable length is
/// also lexically valid base64.
pub fn codec_for_sample(sample: &str) -> Option<Encoding> {
    let compact = strip_whitespace(sample);
    Encoding::ALL
        .into_iter()
        .find(|encoding| encoding.matches(&compact))
}

/// The first element of a descriptor's data sequence, used as the sample for
/// auto-detection.
pub fn first_of(data: &[String]) -> Result<&str, PinvaultError> {
    data.first()
        .map(String::as_str)
        .ok_or(PinvaultError::EmptyDescriptorData)
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

fn is_base64_shape(sample: &str) -> bool {
    if sample.is_empty() || sample.len() % 4 != 0 {
        return false;
    }
    let body = sample.trim_end_matches('=');
    if sample.len() - body.len() > 2 {
        return false;
    }
    body.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        assert_eq!(codec_by_name("base64"), Some(Encoding::Base64));
        assert_eq!(codec_by_name("BASE64"), Some(Encoding::Base64));
        assert_eq!(codec_by_name("hex"), Some(Encoding::Hex));
        assert_eq!(codec_by_name("hexadecimal"), Some(Encoding::Hex));
        assert_eq!(codec_by_name("pem"), None);
        assert_eq!(codec_by_name(""), None);
    }

    #[test]
    fn detect_prefers_hex() {
        // 32 hex digits: also valid base64, hex must win.
        assert_eq!(
            codec_for_sample("d41d8cd98f00b204e9800998ecf8427e"),
            Some(Encoding::Hex)
        );
    }

    #[test]
    fn detect_base64_certificate() {
        assert_eq!(codec_for_sample("MIIBszCCAVmgAwIBAgIU"), Some(Encoding::Base64));
        assert_eq!(codec_for_sample("MIIBsw=="), Some(Encoding::Base64));
    }

    #[test]
    fn detect_ignores_line_wrapping() {
        assert_eq!(codec_for_sample("MIIB\nszCC\r\n"), Some(Encoding::Base64));
    }

    #[test]
    fn detect_nothing() {
        assert_eq!(codec_for_sample(""), None);
        assert_eq!(codec_for_sample("not a certificate!"), None);
        assert_eq!(codec_for_sample("abc"), None);
        assert_eq!(codec_for_sample("AB==="), None);
    }

    #[test]
    fn decode_and_encode() {
        assert_eq!(Encoding::Hex.decode("DEADbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(Encoding::Base64.decode("aGVs\nbG8=").unwrap(), b"hello");
        assert_eq!(Encoding::Base64.encode(b"hello"), "aGVsbG8=");
        assert_eq!(Encoding::Hex.encode(&[0xab, 0x01]), "ab01");
    }

    #[test]
    fn decode_failure_names_the_encoding() {
        match Encoding::Hex.decode("xyz") {
            Err(PinvaultError::MalformedEncoding { encoding, .. }) => assert_eq!(encoding, "hex"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn first_of_empty_fails() {
        assert!(matches!(first_of(&[]), Err(PinvaultError::EmptyDescriptorData)));
        let data = vec!["a".to_string(), "b".to_string()];
        assert_eq!(first_of(&data).unwrap(), "a");
    }
}
