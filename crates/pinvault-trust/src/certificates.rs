// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// X.509 certificates as the store sees them: validated DER bytes plus the
// subject name for log output.  Nothing here interprets validity periods or
// signatures; trust comes from pinning, not from path building.

use pinvault_core::error::PinvaultError;
use rustls::pki_types::CertificateDer;
use tracing::{debug, instrument};

use crate::digest::{CertificateDigest, DigestAlgorithm, Fingerprint};

/// An immutable, parsed X.509 certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: CertificateDer<'static>,
    subject: String,
}

impl Certificate {
    /// Parse a DER-encoded certificate.
    ///
    /// Fails with `MalformedCertificate` when the bytes are not a single,
    /// complete X.509 structure (trailing garbage is rejected too).
    #[instrument(skip_all, fields(der_len = der.len()))]
    pub fn from_der(der: &[u8]) -> Result<Self, PinvaultError> {
        let (rest, parsed) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| PinvaultError::MalformedCertificate(e.to_string()))?;
        if !rest.is_empty() {
            return Err(PinvaultError::MalformedCertificate(format!(
                "{} trailing bytes after certificate",
                rest.len()
            )));
        }
        let subject = parsed.subject().to_string();
        debug!(%subject, "certificate parsed");
        Ok(Self {
            der: CertificateDer::from(der.to_vec()),
            subject,
        })
    }

    /// The DER encoding this certificate was parsed from.
    pub fn der(&self) -> &[u8] {
        self.der.as_ref()
    }

    /// The same bytes in the form `rustls` consumes.
    pub fn as_certificate_der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    /// RFC 4514 rendering of the subject name.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Store alias of this certificate.
    pub fn digest(&self) -> CertificateDigest {
        CertificateDigest::digest_of(self.der())
    }

    pub fn fingerprint(&self, algorithm: DigestAlgorithm) -> Fingerprint {
        Fingerprint::compute(algorithm, self.der())
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der() == other.der()
    }
}

impl Eq for Certificate {}

impl TryFrom<&[u8]> for Certificate {
    type Error = PinvaultError;

    fn try_from(der: &[u8]) -> Result<Self, Self::Error> {
        Self::from_der(der)
    }
}
