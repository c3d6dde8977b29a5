// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! pinvault-trust — certificate trust repository and TLS pinning policies.
//!
//! A `CertificateRepository` keeps trusted X.509 certificates keyed by the
//! hex digest of their DER encoding, sealed with a passphrase and persisted
//! through a pluggable `Resource`.  A `TrustPolicyBuilder` turns declarative
//! policy descriptors into immutable `TrustPolicy` values, and
//! `PinnedServerVerifier` hands those policies to `rustls`.

pub mod certificates;
pub mod codec;
pub mod digest;
pub mod policy;
pub mod repository;
pub mod resource;
pub mod storage;
pub mod verifier;

// PUBLIC API: Re-export the trust engine surface
pub use certificates::Certificate;
pub use codec::{Encoding, codec_by_name, codec_for_sample, first_of};
pub use digest::{CertificateDigest, DigestAlgorithm, Fingerprint};
pub use policy::{TrustPolicy, TrustPolicyBuilder};
pub use repository::{AddOutcome, CertificateRepository, EntryKind, OpenStatus, StoreEntry};
pub use resource::{FileResource, MemoryResource, Resource};
pub use storage::EncryptedStorage;
pub use verifier::{PinnedServerVerifier, client_config};
