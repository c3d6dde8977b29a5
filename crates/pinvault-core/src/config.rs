// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store and policy configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for a persisted certificate store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// scrypt work factor (log2 N) used when sealing the store.  `None` lets
    /// `age` calibrate one for the current machine (~1 second).
    pub work_factor: Option<u8>,
    /// Highest scrypt work factor accepted when opening a store.  `None`
    /// keeps the `age` default ceiling.
    pub max_work_factor: Option<u8>,
    /// Write the full store back to its resource after every new certificate.
    pub persist_on_add: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            work_factor: None,
            max_work_factor: None,
            persist_on_add: true,
        }
    }
}

/// Settings consulted while building trust policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Encoding assumed when a descriptor carries no `encoding` hint.  When
    /// unset the encoding is detected from the first data element.
    pub default_encoding: Option<String>,
}

/// Persistent Pinvault settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinvaultConfig {
    pub store: StoreConfig,
    pub policy: PolicyConfig,
}

impl PinvaultConfig {
    /// Parse a JSON configuration document.  Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_persist_on_add() {
        let config = PinvaultConfig::default();
        assert!(config.store.persist_on_add);
        assert_eq!(config.store.work_factor, None);
        assert_eq!(config.policy.default_encoding, None);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            PinvaultConfig::from_json(r#"{"store": {"work_factor": 12}}"#).expect("parse");
        assert_eq!(config.store.work_factor, Some(12));
        assert!(config.store.persist_on_add);
        assert_eq!(config.policy, PolicyConfig::default());
    }

    #[test]
    fn json_output_parses_back() {
        let mut config = PinvaultConfig::default();
        config.policy.default_encoding = Some("base64".into());
        let json = config.to_json().expect("render");
        assert_eq!(PinvaultConfig::from_json(&json).expect("parse"), config);
    }
}
