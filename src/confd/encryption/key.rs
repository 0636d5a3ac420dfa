//! Encryptor implementations backing `ActiveKey`, built on `openssl`
//! rather than a dedicated crypto crate.

use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::{Padding, Rsa};
use openssl::symm::{Cipher, Crypter, Mode};

use crate::error::{ConfdError, ConfdResult};

/// An opaque capability mapping plaintext to ciphertext and, if it
/// holds a private key, back.
pub trait TextEncryptor: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> ConfdResult<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8]) -> ConfdResult<Vec<u8>>;
    fn can_decrypt(&self) -> bool;
    fn public_key_pem(&self) -> Option<String>;
}

/// AES-256-CBC with a random IV prepended to the ciphertext, keyed by
/// the SHA-256 digest of the configured passphrase. No public key: this
/// encryptor exists purely to satisfy `encrypt.key` being a plain
/// secret rather than a keystore.
pub struct AesEncryptor {
    key: [u8; 32],
}

impl AesEncryptor {
    pub fn from_passphrase(passphrase: &str) -> AesEncryptor {
        let digest = openssl::sha::sha256(passphrase.as_bytes());
        AesEncryptor { key: digest }
    }
}

impl TextEncryptor for AesEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> ConfdResult<Vec<u8>> {
        let cipher = Cipher::aes_256_cbc();
        let mut iv = [0u8; 16];
        openssl::rand::rand_bytes(&mut iv)?;

        let mut crypter = Crypter::new(cipher, Mode::Encrypt, &self.key, Some(&iv))?;
        let mut out = vec![0u8; plaintext.len() + cipher.block_size()];
        let mut count = crypter.update(plaintext, &mut out)?;
        count += crypter.finalize(&mut out[count..])?;
        out.truncate(count);

        let mut result = iv.to_vec();
        result.extend_from_slice(&out);
        Ok(result)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> ConfdResult<Vec<u8>> {
        if ciphertext.len() < 16 {
            return Err(ConfdError::InvalidCipher.into());
        }
        let (iv, body) = ciphertext.split_at(16);

        let cipher = Cipher::aes_256_cbc();
        let mut crypter = Crypter::new(cipher, Mode::Decrypt, &self.key, Some(iv))?;
        let mut out = vec![0u8; body.len() + cipher.block_size()];
        let mut count = crypter
            .update(body, &mut out)
            .map_err(|_| ConfdError::InvalidCipher)?;
        count += crypter
            .finalize(&mut out[count..])
            .map_err(|_| ConfdError::InvalidCipher)?;
        out.truncate(count);
        Ok(out)
    }

    fn can_decrypt(&self) -> bool {
        true
    }

    fn public_key_pem(&self) -> Option<String> {
        None
    }
}

/// RSA-OAEP. Holding only the public key still lets a client encrypt
/// (and fetch `GET /key`); `decrypt` on a public-key-only instance is
/// rejected by the service layer (`DecryptionNotSupported`), not here.
pub struct RsaEncryptor {
    public: PKey<Public>,
    private: Option<PKey<Private>>,
}

impl RsaEncryptor {
    pub fn from_private_pem(pem: &[u8]) -> ConfdResult<RsaEncryptor> {
        let rsa = Rsa::private_key_from_pem(pem).map_err(|_| ConfdError::KeyFormat)?;
        let private = PKey::from_rsa(rsa.clone()).map_err(|_| ConfdError::KeyFormat)?;
        let public_rsa = Rsa::from_public_components(
            rsa.n().to_owned().map_err(|_| ConfdError::KeyFormat)?,
            rsa.e().to_owned().map_err(|_| ConfdError::KeyFormat)?,
        )
        .map_err(|_| ConfdError::KeyFormat)?;
        let public = PKey::from_rsa(public_rsa).map_err(|_| ConfdError::KeyFormat)?;
        Ok(RsaEncryptor {
            public,
            private: Some(private),
        })
    }

    pub fn from_public_pem(pem: &[u8]) -> ConfdResult<RsaEncryptor> {
        let rsa = Rsa::public_key_from_pem(pem).map_err(|_| ConfdError::KeyFormat)?;
        let public = PKey::from_rsa(rsa).map_err(|_| ConfdError::KeyFormat)?;
        Ok(RsaEncryptor {
            public,
            private: None,
        })
    }
}

impl TextEncryptor for RsaEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> ConfdResult<Vec<u8>> {
        let rsa = self.public.rsa().map_err(|_| ConfdError::KeyFormat)?;
        let mut out = vec![0u8; rsa.size() as usize];
        let len = rsa
            .public_encrypt(plaintext, &mut out, Padding::PKCS1_OAEP)
            .map_err(|_| ConfdError::InvalidCipher)?;
        out.truncate(len);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> ConfdResult<Vec<u8>> {
        let private = self.private.as_ref().ok_or(ConfdError::DecryptionNotSupported)?;
        let rsa = private.rsa().map_err(|_| ConfdError::KeyFormat)?;
        let mut out = vec![0u8; rsa.size() as usize];
        let len = rsa
            .private_decrypt(ciphertext, &mut out, Padding::PKCS1_OAEP)
            .map_err(|_| ConfdError::InvalidCipher)?;
        out.truncate(len);
        Ok(out)
    }

    fn can_decrypt(&self) -> bool {
        self.private.is_some()
    }

    fn public_key_pem(&self) -> Option<String> {
        self.public
            .public_key_to_pem()
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }
}
