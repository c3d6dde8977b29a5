// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Certificate digests — MD5 over the DER encoding, rendered as lowercase hex
// and used verbatim as the alias of a store entry.  Fingerprints with a
// selectable algorithm back digest-pinned policies.

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use pinvault_core::error::PinvaultError;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Length in bytes of a [`CertificateDigest`].
pub const DIGEST_LEN: usize = 16;

/// 128-bit content digest of a certificate's encoded bytes.
///
/// Two certificates with identical DER produce identical digests; the store
/// treats digest equality as identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CertificateDigest([u8; DIGEST_LEN]);

impl CertificateDigest {
    /// Digest `bytes` (normally a certificate's DER encoding).
    pub fn digest_of(bytes: &[u8]) -> Self {
        let hash = Md5::digest(bytes);
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&hash);
        Self(out)
    }

    /// Parse a 32-character hex string.  Upper-case digits are accepted; the
    /// canonical rendering is always lower-case.
    pub fn parse(hex_str: &str) -> Result<Self, PinvaultError> {
        if !Self::is_valid_hex(hex_str) {
            return Err(PinvaultError::InvalidDigestFormat {
                value: hex_str.to_owned(),
            });
        }
        let mut out = [0u8; DIGEST_LEN];
        hex::decode_to_slice(hex_str, &mut out).map_err(|_| {
            PinvaultError::InvalidDigestFormat {
                value: hex_str.to_owned(),
            }
        })?;
        Ok(Self(out))
    }

    /// Whether `value` has the exact shape of a digest alias.
    pub fn is_valid_hex(value: &str) -> bool {
        value.len() == DIGEST_LEN * 2 && value.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for CertificateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for CertificateDigest {
    type Err = PinvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Hash algorithms accepted for pinned fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Case-insensitive lookup; hyphenated spellings (`sha-256`) are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Some(Self::Md5),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Guess the algorithm from the length of a raw digest.
    pub fn from_digest_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Md5),
            32 => Some(Self::Sha256),
            48 => Some(Self::Sha384),
            64 => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A digest tagged with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    algorithm: DigestAlgorithm,
    bytes: Vec<u8>,
}

impl Fingerprint {
    /// Hash `data` with `algorithm`.
    pub fn compute(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let bytes = match algorithm {
            DigestAlgorithm::Md5 => Md5::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        };
        Self { algorithm, bytes }
    }

    /// Wrap an already computed digest, checking its length.
    pub fn from_bytes(algorithm: DigestAlgorithm, bytes: Vec<u8>) -> Result<Self, PinvaultError> {
        if bytes.len() != algorithm.output_len() {
            return Err(PinvaultError::InvalidDigestFormat {
                value: hex::encode(&bytes),
            });
        }
        Ok(Self { algorithm, bytes })
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, hex::encode(&self.bytes))
    }
}
