// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encrypted storage — age (scrypt) sealing of the certificate store blob.
// The store passphrase both hides and integrity-protects the container: a
// flipped byte or a wrong passphrase fails decryption.

use std::io::{Read, Write};

use age::secrecy::SecretString;
use pinvault_core::config::StoreConfig;
use pinvault_core::error::PinvaultError;
use tracing::{debug, instrument};

/// Passphrase-based encrypted storage backed by the `age` crate.
///
/// Each seal/open call is stateless; the passphrase is held only for the
/// lifetime of the `EncryptedStorage` value.
pub struct EncryptedStorage {
    /// The store passphrase, zeroised on drop.
    passphrase: SecretString,
    /// scrypt log2(N) for sealing; `None` lets age calibrate.
    work_factor: Option<u8>,
    /// Ceiling accepted when opening; `None` keeps age's default.
    max_work_factor: Option<u8>,
}

impl EncryptedStorage {
    /// Create a storage handle with age's calibrated work factor.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: SecretString::from(passphrase.into()),
            work_factor: None,
            max_work_factor: None,
        }
    }

    /// Create a storage handle honouring the scrypt settings in `config`.
    pub fn with_config(passphrase: impl Into<String>, config: &StoreConfig) -> Self {
        Self {
            work_factor: config.work_factor,
            max_work_factor: config.max_work_factor,
            ..Self::new(passphrase)
        }
    }

    /// Encrypt `plaintext` into a complete age file.
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, PinvaultError> {
        let encryptor = match self.work_factor {
            None => age::Encryptor::with_user_passphrase(self.passphrase.clone()),
            Some(log_n) => {
                let mut recipient = age::scrypt::Recipient::new(self.passphrase.clone());
                recipient.set_work_factor(log_n);
                age::Encryptor::with_recipients(std::iter::once(
                    &recipient as &dyn age::Recipient,
                ))
                .map_err(|e| PinvaultError::Encryption(e.to_string()))?
            }
        };
        let mut ciphertext = Vec::new();

        let mut writer = encryptor
            .wrap_output(&mut ciphertext)
            .map_err(|e| PinvaultError::Encryption(e.to_string()))?;

        writer
            .write_all(plaintext)
            .map_err(|e| PinvaultError::Encryption(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| PinvaultError::Encryption(e.to_string()))?;

        debug!(ciphertext_len = ciphertext.len(), "encryption complete");
        Ok(ciphertext)
    }

    /// Decrypt a complete age file and return the original plaintext.
    #[instrument(skip_all, fields(ciphertext_len = ciphertext.len()))]
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, PinvaultError> {
        let decryptor = age::Decryptor::new(ciphertext)
            .map_err(|e| PinvaultError::Decryption(e.to_string()))?;

        let mut identity = age::scrypt::Identity::new(self.passphrase.clone());
        if let Some(max) = self.max_work_factor {
            identity.set_max_work_factor(max);
        }

        let mut reader = decryptor
            .decrypt(std::iter::once(&identity as &dyn age::Identity))
            .map_err(|e| PinvaultError::Decryption(e.to_string()))?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| PinvaultError::Decryption(e.to_string()))?;

        debug!(plaintext_len = plaintext.len(), "decryption complete");
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(passphrase: &str) -> EncryptedStorage {
        let config = StoreConfig {
            work_factor: Some(10),
            ..StoreConfig::default()
        };
        EncryptedStorage::with_config(passphrase, &config)
    }

    #[test]
    fn round_trip() {
        let storage = fast("correct-horse-battery-staple");
        let plaintext = b"{\"format\":\"pinvault-store\"}";

        let ciphertext = storage.encrypt(plaintext).expect("encrypt failed");
        assert_ne!(
            &ciphertext[..],
            plaintext,
            "ciphertext must differ from plaintext"
        );

        let decrypted = storage.decrypt(&ciphertext).expect("decrypt failed");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_passphrase_fails() {
        let storage_a = fast("passphrase-alpha");
        let storage_b = fast("passphrase-beta");

        let ciphertext = storage_a.encrypt(b"secret").expect("encrypt failed");
        assert!(
            matches!(storage_b.decrypt(&ciphertext), Err(PinvaultError::Decryption(_))),
            "decryption with wrong passphrase must fail"
        );
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let storage = fast("tamper");
        let mut ciphertext = storage.encrypt(b"certificate entries").expect("encrypt");
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        assert!(storage.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn garbage_is_not_an_age_file() {
        assert!(fast("x").decrypt(b"not an age file").is_err());
    }

    #[test]
    fn empty_plaintext() {
        let storage = fast("empty-test");
        let ciphertext = storage.encrypt(b"").expect("encrypt failed");
        let decrypted = storage.decrypt(&ciphertext).expect("decrypt failed");
        assert!(decrypted.is_empty());
    }
}
