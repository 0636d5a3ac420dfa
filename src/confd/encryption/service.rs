//! `EncryptionService`: owns the single `ActiveKey` and implements the
//! encrypt/decrypt/key/status operations.

use std::sync::RwLock;

use super::formdata::strip_form_encoding;
use super::key::{AesEncryptor, RsaEncryptor, TextEncryptor};
use crate::error::{ConfdError, ConfdResult};

/// The currently installed encryptor, replaced atomically on key
/// upload (copy-on-write via `RwLock` swap).
#[derive(Default)]
struct ActiveKey {
    encryptor: Option<std::sync::Arc<dyn TextEncryptor>>,
}

pub struct EncryptionService {
    active: RwLock<ActiveKey>,
}

impl EncryptionService {
    pub fn new() -> EncryptionService {
        EncryptionService {
            active: RwLock::new(ActiveKey::default()),
        }
    }

    /// Boot-time key install from `encrypt.key` / a PEM file. A value
    /// that parses as a PEM private or public key installs an
    /// `RsaEncryptor`; anything else is treated as a raw symmetric
    /// passphrase.
    pub fn install_key(&self, key_material: &str) -> ConfdResult<()> {
        let trimmed = key_material.trim();
        let encryptor: std::sync::Arc<dyn TextEncryptor> = if trimmed.contains("PRIVATE KEY") {
            std::sync::Arc::new(RsaEncryptor::from_private_pem(trimmed.as_bytes())?)
        } else if trimmed.contains("PUBLIC KEY") {
            std::sync::Arc::new(RsaEncryptor::from_public_pem(trimmed.as_bytes())?)
        } else {
            std::sync::Arc::new(AesEncryptor::from_passphrase(trimmed))
        };

        let mut guard = self.active.write().unwrap();
        *guard = ActiveKey {
            encryptor: Some(encryptor),
        };
        Ok(())
    }

    fn resolve(&self) -> ConfdResult<std::sync::Arc<dyn TextEncryptor>> {
        let guard = self.active.read().unwrap();
        guard
            .encryptor
            .clone()
            .ok_or_else(|| ConfdError::KeyNotInstalled.into())
    }

    /// Reject a no-op encryptor: one that returns its input unchanged
    /// is too weak to use.
    fn check_strength(encryptor: &dyn TextEncryptor) -> ConfdResult<()> {
        let ciphertext = encryptor.encrypt(b"FOO")?;
        if ciphertext == b"FOO" {
            return Err(ConfdError::EncryptionTooWeak.into());
        }
        Ok(())
    }

    pub fn encrypt(&self, content_type: Option<&str>, body: &str) -> ConfdResult<String> {
        let encryptor = self.resolve()?;
        Self::check_strength(encryptor.as_ref())?;

        let plaintext = strip_form_encoding(body, content_type, false);
        let ciphertext = encryptor.encrypt(plaintext.as_bytes())?;
        Ok(hex::encode(ciphertext))
    }

    pub fn decrypt(&self, content_type: Option<&str>, body: &str) -> ConfdResult<String> {
        let encryptor = self.resolve()?;
        if !encryptor.can_decrypt() {
            return Err(ConfdError::DecryptionNotSupported.into());
        }

        let stripped = strip_form_encoding(body, content_type, true);
        let ciphertext = hex::decode(&stripped).map_err(|_| ConfdError::InvalidCipher)?;
        let plaintext = encryptor.decrypt(&ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| ConfdError::InvalidCipher.into())
    }

    pub fn public_key_pem(&self) -> ConfdResult<String> {
        let encryptor = self.resolve()?;
        encryptor
            .public_key_pem()
            .ok_or_else(|| ConfdError::KeyNotAvailable.into())
    }

    pub fn status(&self) -> ConfdResult<()> {
        let encryptor = self.resolve()?;
        Self::check_strength(encryptor.as_ref())
    }
}

impl Default for EncryptionService {
    fn default() -> EncryptionService {
        EncryptionService::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_symmetric_key() {
        let service = EncryptionService::new();
        service.install_key("a passphrase nobody will guess").unwrap();
        let cipher = service.encrypt(None, "hello").unwrap();
        let plain = service.decrypt(None, &cipher).unwrap();
        assert_eq!(plain, "hello");
    }

    #[test]
    fn no_key_installed_yields_key_not_installed() {
        let service = EncryptionService::new();
        let err = service.encrypt(None, "hello").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfdError>(),
            Some(ConfdError::KeyNotInstalled)
        ));
    }

    #[test]
    fn public_key_unavailable_for_symmetric_key() {
        let service = EncryptionService::new();
        service.install_key("a passphrase").unwrap();
        let err = service.public_key_pem().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfdError>(),
            Some(ConfdError::KeyNotAvailable)
        ));
    }
}
