// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Certificate repository — a keyed collection of trusted certificates, sealed
// with a passphrase and persisted through a `Resource`.
//
// Container (plaintext, before sealing):
//   {
//     "format":  "pinvault-store",
//     "version": 1,
//     "entries": {
//       "<alias>": { "kind": "trusted-certificate", "data": "<base64 DER>" },
//       ...
//     }
//   }
//
// Certificate aliases are the lowercase hex MD5 of the certificate DER.  The
// alias space is shared with other entry kinds (keys written by other tools);
// those entries are carried through load/save untouched and never overwritten
// by `add`.

use std::collections::BTreeMap;
use std::io::Read;

use pinvault_core::config::StoreConfig;
use pinvault_core::error::PinvaultError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::certificates::Certificate;
use crate::digest::CertificateDigest;
use crate::resource::Resource;
use crate::storage::EncryptedStorage;

const STORE_FORMAT: &str = "pinvault-store";
const STORE_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// What a store entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    TrustedCertificate,
    PrivateKey,
    SecretKey,
}

/// A single aliased entry of the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub kind: EntryKind,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl EntryKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::TrustedCertificate => "trusted-certificate",
            Self::PrivateKey => "private-key",
            Self::SecretKey => "secret-key",
        }
    }
}

impl StoreEntry {
    pub fn trusted_certificate(cert: &Certificate) -> Self {
        Self {
            kind: EntryKind::TrustedCertificate,
            data: cert.der().to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Container {
    format: String,
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, StoreEntry>,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How `open_or_empty` obtained its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenStatus {
    /// An existing container was decrypted and parsed.
    Loaded { entries: usize },
    /// The resource held nothing; a new empty store was initialised.
    Initialized,
    /// The resource could not be read, decrypted or parsed; the store fell
    /// back to an empty in-memory state.
    Recovered { reason: String },
}

impl OpenStatus {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

/// Result of [`CertificateRepository::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

struct Backing {
    resource: Box<dyn Resource>,
    vault: EncryptedStorage,
    persist_on_add: bool,
}

/// A persistent (or ephemeral) set of trusted certificates keyed by digest.
///
/// `add` takes `&mut self`: sharing one repository between threads needs an
/// external lock around it.
pub struct CertificateRepository {
    entries: BTreeMap<String, StoreEntry>,
    backing: Option<Backing>,
}

impl std::fmt::Debug for CertificateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateRepository")
            .field("entries", &self.entries.len())
            .field(
                "resource",
                &self.backing.as_ref().map(|b| b.resource.describe()),
            )
            .finish()
    }
}

impl CertificateRepository {
    /// A store with no backing resource; `save` is a no-op.
    pub fn ephemeral() -> Self {
        Self {
            entries: BTreeMap::new(),
            backing: None,
        }
    }

    /// Open the store persisted in `resource`.
    ///
    /// Never fails: an empty resource yields an empty store, and an
    /// unreadable, corrupt or wrongly-keyed resource is logged and replaced
    /// by an empty store.  Use [`Self::open_or_empty`] to observe which.
    ///
    /// A recovered store stays writable.  After a wrong passphrase, the
    /// first persisted `add` (or `save`) reseals the resource under that
    /// passphrase and the previous contents are gone for good.  Callers that
    /// cannot rule this out should check for [`OpenStatus::Recovered`]
    /// before writing.
    pub fn open(
        resource: impl Resource + 'static,
        passphrase: impl Into<String>,
        config: &StoreConfig,
    ) -> Self {
        Self::open_or_empty(resource, passphrase, config).0
    }

    /// Like [`Self::open`], also reporting how the contents were obtained.
    ///
    /// The overwrite hazard described on [`Self::open`] applies whenever the
    /// status is [`OpenStatus::Recovered`].
    #[instrument(skip_all, fields(resource = %resource.describe()))]
    pub fn open_or_empty(
        resource: impl Resource + 'static,
        passphrase: impl Into<String>,
        config: &StoreConfig,
    ) -> (Self, OpenStatus) {
        let vault = EncryptedStorage::with_config(passphrase, config);
        let (entries, status) = match load_entries(&resource, &vault) {
            Ok(Some(entries)) => {
                debug!(entries = entries.len(), "certificate store loaded");
                let status = OpenStatus::Loaded {
                    entries: entries.len(),
                };
                (entries, status)
            }
            Ok(None) => {
                debug!("no persisted store; initialised empty");
                (BTreeMap::new(), OpenStatus::Initialized)
            }
            Err(e) => {
                let failure = PinvaultError::StoreOpenFailure(e.to_string());
                error!(error = %failure, "falling back to an empty certificate store");
                (
                    BTreeMap::new(),
                    OpenStatus::Recovered {
                        reason: e.to_string(),
                    },
                )
            }
        };

        let repository = Self {
            entries,
            backing: Some(Backing {
                resource: Box::new(resource),
                vault,
                persist_on_add: config.persist_on_add,
            }),
        };
        (repository, status)
    }

    /// Add `cert` unless an entry with its digest already exists.
    ///
    /// A key entry under the same alias is left alone and `AliasConflict` is
    /// returned.  When the store is backed by a writable resource the whole
    /// store is persisted through [`Resource::replace`] before the add is
    /// acknowledged.  If persisting fails the insertion is undone and
    /// `PersistenceFailure` is returned; the resource keeps its previous
    /// contents as long as its `replace` honours the all-or-nothing contract.
    #[instrument(skip_all, fields(subject = %cert.subject()))]
    pub fn add(&mut self, cert: &Certificate) -> Result<AddOutcome, PinvaultError> {
        let alias = cert.digest().to_string();
        if let Some(existing) = self.entries.get(&alias) {
            if existing.kind != EntryKind::TrustedCertificate {
                warn!(%alias, kind = existing.kind.name(), "alias taken by a key entry");
                return Err(PinvaultError::AliasConflict {
                    alias,
                    kind: existing.kind.name().to_owned(),
                });
            }
        }
        if self.get_by_alias(&alias).is_some() {
            debug!(%alias, "certificate already in store");
            return Ok(AddOutcome::AlreadyPresent);
        }

        debug!(%alias, "adding certificate to store");
        let previous = self
            .entries
            .insert(alias.clone(), StoreEntry::trusted_certificate(cert));

        let persist = self
            .backing
            .as_ref()
            .is_some_and(|b| b.persist_on_add && b.resource.is_writable());
        if persist {
            if let Err(e) = self.save() {
                warn!(%alias, error = %e, "rolling back add after persistence failure");
                match previous {
                    Some(entry) => self.entries.insert(alias, entry),
                    None => self.entries.remove(&alias),
                };
                return Err(e);
            }
        }
        Ok(AddOutcome::Added)
    }

    /// Look up a certificate by digest.  Absent entries, entries of another
    /// kind and unparseable entries all yield `None`.
    pub fn get(&self, digest: &CertificateDigest) -> Option<Certificate> {
        self.get_by_alias(&digest.to_string())
    }

    fn get_by_alias(&self, alias: &str) -> Option<Certificate> {
        let entry = self.entries.get(alias)?;
        if entry.kind != EntryKind::TrustedCertificate {
            return None;
        }
        match Certificate::from_der(&entry.data) {
            Ok(cert) => Some(cert),
            Err(e) => {
                warn!(%alias, error = %e, "stored certificate does not parse");
                None
            }
        }
    }

    pub fn contains(&self, digest: &CertificateDigest) -> bool {
        self.get(digest).is_some()
    }

    /// Every certificate entry, in alias order.  Entries whose alias is not a
    /// digest or whose kind is not a certificate are skipped.
    pub fn list_all(&self) -> Vec<Certificate> {
        self.entries
            .keys()
            .filter(|alias| {
                let valid = CertificateDigest::is_valid_hex(alias);
                if !valid {
                    debug!(%alias, "skipping non-digest alias");
                }
                valid
            })
            .filter_map(|alias| self.get_by_alias(alias))
            .collect()
    }

    fn certificate_aliases(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(alias, entry)| {
                entry.kind == EntryKind::TrustedCertificate
                    && CertificateDigest::is_valid_hex(alias.as_str())
            })
            .map(|(alias, _)| alias.as_str())
    }

    /// Digests of every certificate entry, taken from the aliases.  Entry
    /// bodies are not parsed.
    pub fn digests(&self) -> Vec<CertificateDigest> {
        self.certificate_aliases()
            .filter_map(|alias| CertificateDigest::parse(alias).ok())
            .collect()
    }

    /// Number of certificate entries under digest aliases.  Unlike
    /// [`Self::list_all`] this does not parse the DER, so an entry whose body
    /// is corrupt still counts.
    pub fn len(&self) -> usize {
        self.certificate_aliases().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a raw entry under `alias`, replacing any previous one.  Not
    /// persisted until the next `save`.
    pub fn insert_entry(&mut self, alias: impl Into<String>, entry: StoreEntry) {
        self.entries.insert(alias.into(), entry);
    }

    /// Persist the full store to its resource.  No-op for ephemeral stores.
    pub fn save(&self) -> Result<(), PinvaultError> {
        let Some(backing) = &self.backing else {
            return Ok(());
        };
        let plaintext = self.canonical_bytes()?;
        let sealed = backing
            .vault
            .encrypt(&plaintext)
            .map_err(|e| PinvaultError::PersistenceFailure(e.to_string()))?;

        backing
            .resource
            .replace(&sealed)
            .map_err(|e| PinvaultError::PersistenceFailure(e.to_string()))?;

        debug!(
            resource = %backing.resource.describe(),
            entries = self.entries.len(),
            sealed_len = sealed.len(),
            "certificate store saved"
        );
        Ok(())
    }

    /// The unsealed container as written by `save`.  Entries are emitted in
    /// alias order, so equal contents give identical bytes.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, PinvaultError> {
        let container = ContainerRef {
            format: STORE_FORMAT,
            version: STORE_VERSION,
            entries: &self.entries,
        };
        Ok(serde_json::to_vec(&container)?)
    }
}

#[derive(Serialize)]
struct ContainerRef<'a> {
    format: &'a str,
    version: u32,
    entries: &'a BTreeMap<String, StoreEntry>,
}

/// Equality is defined over the serialized container, not entry by entry.
impl PartialEq for CertificateRepository {
    fn eq(&self, other: &Self) -> bool {
        match (self.canonical_bytes(), other.canonical_bytes()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

fn load_entries(
    resource: &dyn Resource,
    vault: &EncryptedStorage,
) -> Result<Option<BTreeMap<String, StoreEntry>>, PinvaultError> {
    let Some(mut input) = resource.input_stream()? else {
        return Ok(None);
    };
    let mut sealed = Vec::new();
    input.read_to_end(&mut sealed)?;
    drop(input);
    if sealed.is_empty() {
        return Ok(None);
    }

    let plaintext = vault.decrypt(&sealed)?;
    let container: Container = serde_json::from_slice(&plaintext)?;
    if container.format != STORE_FORMAT || container.version != STORE_VERSION {
        return Err(PinvaultError::StoreOpenFailure(format!(
            "unsupported container {} v{}",
            container.format, container.version
        )));
    }
    Ok(Some(container.entries))
}
