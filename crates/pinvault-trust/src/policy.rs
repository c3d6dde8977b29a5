// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trust policy construction — turns a declarative `TlsPolicyDescriptor` into
// an immutable pinning policy a TLS client can query.
//
// Build steps (linear, no retries):
//   1. validate the descriptor (type + non-empty data), else no policy
//   2. resolve the codec: explicit `encoding` hint, configured default, or
//      auto-detection from the first data element
//   3. decode every element; any failure aborts the whole build
//   4. wrap the pins in a `TrustPolicy`

use std::collections::HashSet;

use pinvault_core::config::PolicyConfig;
use pinvault_core::error::PinvaultError;
use pinvault_core::types::{META_DIGEST_ALGORITHM, PolicyType, TlsPolicyDescriptor};
use tracing::{debug, instrument};

use crate::certificates::Certificate;
use crate::codec::{Encoding, codec_by_name, codec_for_sample, first_of};
use crate::digest::{CertificateDigest, DigestAlgorithm, Fingerprint};
use crate::repository::CertificateRepository;

/// Longest sample echoed back in an `UndeterminedEncoding` error.
const SAMPLE_PREVIEW_CHARS: usize = 32;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Pins a set of whole certificates.
#[derive(Debug)]
pub struct CertificatePolicy {
    repository: CertificateRepository,
}

/// Pins a set of certificate fingerprints computed with one algorithm.
#[derive(Debug)]
pub struct DigestPolicy {
    algorithm: DigestAlgorithm,
    pins: HashSet<Fingerprint>,
}

/// An immutable trust decision procedure built from a descriptor.
#[derive(Debug)]
pub enum TrustPolicy {
    Certificate(CertificatePolicy),
    CertificateDigest(DigestPolicy),
}

impl TrustPolicy {
    pub fn policy_type(&self) -> PolicyType {
        match self {
            Self::Certificate(_) => PolicyType::Certificate,
            Self::CertificateDigest(_) => PolicyType::CertificateDigest,
        }
    }

    /// Whether the DER-encoded certificate `der` is pinned.
    pub fn is_certificate_trusted(&self, der: &[u8]) -> bool {
        let trusted = match self {
            Self::Certificate(policy) => policy
                .repository
                .get(&CertificateDigest::digest_of(der))
                .is_some_and(|pinned| pinned.der() == der),
            Self::CertificateDigest(policy) => policy
                .pins
                .contains(&Fingerprint::compute(policy.algorithm, der)),
        };
        debug!(
            policy = %self.policy_type(),
            alias = %CertificateDigest::digest_of(der),
            trusted,
            "certificate trust decision"
        );
        trusted
    }

    /// Whether a presented chain (end-entity first) is trusted.  Only the
    /// end-entity certificate is matched against the pins; an empty chain is
    /// never trusted.
    pub fn is_chain_trusted(&self, chain: &[&[u8]]) -> bool {
        chain
            .first()
            .is_some_and(|end_entity| self.is_certificate_trusted(end_entity))
    }

    /// Number of distinct pins.
    pub fn pinned_count(&self) -> usize {
        match self {
            Self::Certificate(policy) => policy.repository.len(),
            Self::CertificateDigest(policy) => policy.pins.len(),
        }
    }

    /// The pinned certificates, for certificate policies.
    pub fn repository(&self) -> Option<&CertificateRepository> {
        match self {
            Self::Certificate(policy) => Some(&policy.repository),
            Self::CertificateDigest(_) => None,
        }
    }

    /// The fingerprint algorithm, for digest policies.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        match self {
            Self::Certificate(_) => None,
            Self::CertificateDigest(policy) => Some(policy.algorithm),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds [`TrustPolicy`] values from descriptors.
#[derive(Debug, Clone, Default)]
pub struct TrustPolicyBuilder {
    config: PolicyConfig,
}

impl TrustPolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Build a policy from `descriptor`.
    ///
    /// Returns `Ok(None)` when the descriptor is not a pinning policy this
    /// builder understands or carries no data.  Codec and decoding failures
    /// are errors and no partial policy is produced.
    #[instrument(skip_all, fields(policy_type = %descriptor.policy_type, entries = descriptor.data.len()))]
    pub fn build(
        &self,
        descriptor: &TlsPolicyDescriptor,
    ) -> Result<Option<TrustPolicy>, PinvaultError> {
        let Some(policy_type) = PolicyType::from_name(&descriptor.policy_type) else {
            debug!("not a pinning policy type");
            return Ok(None);
        };
        if descriptor.data.is_empty() {
            debug!("descriptor carries no data");
            return Ok(None);
        }

        let codec = self.resolve_codec(descriptor)?;
        let policy = match policy_type {
            PolicyType::Certificate => build_certificate_policy(descriptor, codec)?,
            PolicyType::CertificateDigest => build_digest_policy(descriptor, codec)?,
        };
        debug!(pins = policy.pinned_count(), "trust policy built");
        Ok(Some(policy))
    }

    /// Pick the codec for `descriptor`'s data.
    pub fn resolve_codec(&self, descriptor: &TlsPolicyDescriptor) -> Result<Encoding, PinvaultError> {
        let named = descriptor
            .encoding()
            .or(self.config.default_encoding.as_deref().filter(|n| !n.is_empty()));
        if let Some(name) = named {
            let codec = codec_by_name(name)
                .ok_or_else(|| PinvaultError::UnsupportedEncoding(name.to_owned()))?;
            debug!(%codec, encoding = name, "codec selected by name");
            return Ok(codec);
        }

        let sample = first_of(&descriptor.data)?;
        let codec = codec_for_sample(sample).ok_or_else(|| PinvaultError::UndeterminedEncoding {
            sample: sample.chars().take(SAMPLE_PREVIEW_CHARS).collect(),
        })?;
        debug!(%codec, "codec detected from sample");
        Ok(codec)
    }
}

fn build_certificate_policy(
    descriptor: &TlsPolicyDescriptor,
    codec: Encoding,
) -> Result<TrustPolicy, PinvaultError> {
    let mut repository = CertificateRepository::ephemeral();
    for (index, value) in descriptor.data.iter().enumerate() {
        let der = codec
            .decode(value)
            .map_err(|e| PinvaultError::MalformedCertificate(format!("entry {index}: {e}")))?;
        let cert = Certificate::from_der(&der).map_err(|e| match e {
            PinvaultError::MalformedCertificate(detail) => {
                PinvaultError::MalformedCertificate(format!("entry {index}: {detail}"))
            }
            other => other,
        })?;
        repository.add(&cert)?;
    }
    Ok(TrustPolicy::Certificate(CertificatePolicy { repository }))
}

fn build_digest_policy(
    descriptor: &TlsPolicyDescriptor,
    codec: Encoding,
) -> Result<TrustPolicy, PinvaultError> {
    let decoded = descriptor
        .data
        .iter()
        .map(|value| {
            codec.decode(value).map_err(|_| PinvaultError::InvalidDigestFormat {
                value: value.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let algorithm = match descriptor.meta_value(META_DIGEST_ALGORITHM) {
        Some(name) => DigestAlgorithm::from_name(name)
            .ok_or_else(|| PinvaultError::UnsupportedDigestAlgorithm(name.to_owned()))?,
        None => {
            let first = decoded.first().ok_or(PinvaultError::EmptyDescriptorData)?;
            DigestAlgorithm::from_digest_len(first.len()).ok_or_else(|| {
                PinvaultError::InvalidDigestFormat {
                    value: codec.encode(first),
                }
            })?
        }
    };

    let pins = decoded
        .into_iter()
        .map(|bytes| Fingerprint::from_bytes(algorithm, bytes))
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(TrustPolicy::CertificateDigest(DigestPolicy { algorithm, pins }))
}
