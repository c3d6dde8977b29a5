// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Value types exchanged with callers of the trust engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `meta` key that forces codec selection.
pub const META_ENCODING: &str = "encoding";
/// `meta` key naming the digest algorithm of a `certificate-digest` policy.
pub const META_DIGEST_ALGORITHM: &str = "digest_algorithm";

/// Policy types the builder knows how to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    /// Pinned DER certificates.
    Certificate,
    /// Pinned certificate fingerprints.
    CertificateDigest,
}

impl PolicyType {
    /// The descriptor `policyType` value for this type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::CertificateDigest => "certificate-digest",
        }
    }

    /// Case-insensitive lookup of a descriptor `policyType` value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "certificate" => Some(Self::Certificate),
            "certificate-digest" => Some(Self::CertificateDigest),
            _ => None,
        }
    }
}

impl std::fmt::Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Declarative description of a TLS trust policy.
///
/// Built by a caller (usually deserialized from a REST payload or a config
/// file) and consumed once by the policy builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsPolicyDescriptor {
    /// Discriminator, e.g. `"certificate"`.
    pub policy_type: String,
    /// Encoded certificates or fingerprints, in caller order.
    #[serde(default)]
    pub data: Vec<String>,
    /// Free-form hints such as `encoding`.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl TlsPolicyDescriptor {
    pub fn new(policy_type: impl Into<String>, data: Vec<String>) -> Self {
        Self {
            policy_type: policy_type.into(),
            data,
            meta: BTreeMap::new(),
        }
    }

    /// Builder-style helper for setting a `meta` entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// A `meta` value, treating empty strings as absent.
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// The `encoding` hint, if any.
    pub fn encoding(&self) -> Option<&str> {
        self.meta_value(META_ENCODING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_type_is_case_insensitive() {
        assert_eq!(PolicyType::from_name("Certificate"), Some(PolicyType::Certificate));
        assert_eq!(
            PolicyType::from_name("CERTIFICATE-DIGEST"),
            Some(PolicyType::CertificateDigest)
        );
        assert_eq!(PolicyType::from_name("public-key"), None);
    }

    #[test]
    fn descriptor_uses_camel_case() {
        let json = r#"{"policyType":"certificate","data":["AAAA"],"meta":{"encoding":"base64"}}"#;
        let descriptor: TlsPolicyDescriptor = serde_json::from_str(json).expect("parse");
        assert_eq!(descriptor.policy_type, "certificate");
        assert_eq!(descriptor.data, vec!["AAAA".to_string()]);
        assert_eq!(descriptor.encoding(), Some("base64"));
    }

    #[test]
    fn missing_data_and_meta_default_to_empty() {
        let descriptor: TlsPolicyDescriptor =
            serde_json::from_str(r#"{"policyType":"certificate"}"#).expect("parse");
        assert!(descriptor.data.is_empty());
        assert!(descriptor.meta.is_empty());
    }

    #[test]
    fn empty_encoding_hint_is_absent() {
        let descriptor = TlsPolicyDescriptor::new("certificate", vec![]).with_meta("encoding", "");
        assert_eq!(descriptor.encoding(), None);
    }
}
