// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pinvault.

use thiserror::Error;

/// Top-level error type for all Pinvault operations.
#[derive(Debug, Error)]
pub enum PinvaultError {
    // -- Digest / descriptor errors --
    #[error("invalid digest format: {value:?}")]
    InvalidDigestFormat { value: String },

    #[error("policy descriptor does not contain any data")]
    EmptyDescriptorData,

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("cannot determine encoding of sample {sample:?}")]
    UndeterminedEncoding { sample: String },

    #[error("value is not valid {encoding}: {detail}")]
    MalformedEncoding { encoding: String, detail: String },

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigestAlgorithm(String),

    // -- Store errors --
    #[error("cannot persist certificate store: {0}")]
    PersistenceFailure(String),

    #[error("cannot open certificate store: {0}")]
    StoreOpenFailure(String),

    #[error("alias {alias} already holds a {kind} entry")]
    AliasConflict { alias: String, kind: String },

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    // -- TLS adapter --
    #[error("TLS configuration failed: {0}")]
    Tls(String),

    // -- Underlying I/O --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PinvaultError>;
