//! Token Encryption
//!
//! Symmetric encryption of token values at rest. Stored values are
//! base64(nonce || ciphertext || tag) under AES-256-GCM.

use base64::{engine::general_purpose, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};

use crate::error::CredentialError;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Encrypts and decrypts token values stored in the credential table.
pub trait TokenCipher: Send + Sync {
    /// Encrypt a plaintext token into its stored form.
    fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError>;

    /// Decrypt a stored value.
    fn decrypt(&self, stored: &str) -> Result<String, CredentialError>;
}

/// AES-256-GCM token cipher.
pub struct AesGcmCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl AesGcmCipher {
    /// Create from raw key bytes.
    pub fn new(key: &[u8]) -> Result<Self, CredentialError> {
        if key.len() != KEY_LEN {
            return Err(CredentialError::InvalidKey {
                message: format!("expected {} bytes, got {}", KEY_LEN, key.len()),
            });
        }

        let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| CredentialError::InvalidKey {
            message: "key rejected by AES-256-GCM".to_string(),
        })?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Create from a base64 key (standard or URL-safe alphabet).
    pub fn from_base64(encoded: &SecretString) -> Result<Self, CredentialError> {
        let text = encoded.expose_secret().trim();
        let bytes = general_purpose::STANDARD
            .decode(text)
            .or_else(|_| general_purpose::URL_SAFE.decode(text))
            .map_err(|e| CredentialError::InvalidKey {
                message: e.to_string(),
            })?;
        Self::new(&bytes)
    }

    /// Generate a fresh random key, base64-encoded.
    pub fn generate_key() -> Result<SecretString, CredentialError> {
        let mut key = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| CredentialError::InvalidKey {
                message: "system random source unavailable".to_string(),
            })?;
        Ok(SecretString::new(general_purpose::STANDARD.encode(key)))
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CredentialError::EncryptionFailed {
                message: "nonce generation failed".to_string(),
            })?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| CredentialError::EncryptionFailed {
                message: "seal failed".to_string(),
            })?;

        let mut stored = Vec::with_capacity(NONCE_LEN + in_out.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&in_out);
        Ok(general_purpose::STANDARD.encode(stored))
    }

    fn decrypt(&self, stored: &str) -> Result<String, CredentialError> {
        let raw = general_purpose::STANDARD
            .decode(stored.trim())
            .map_err(|e| CredentialError::DecryptionFailed {
                message: e.to_string(),
            })?;

        if raw.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CredentialError::DecryptionFailed {
                message: "stored value too short".to_string(),
            });
        }

        let (nonce_part, ciphertext) = raw.split_at(NONCE_LEN);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(nonce_part);

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| CredentialError::DecryptionFailed {
                message: "authentication failed; wrong key or tampered value".to_string(),
            })?;

        String::from_utf8(plaintext.to_vec()).map_err(|e| CredentialError::DecryptionFailed {
            message: e.to_string(),
        })
    }
}

/// Pass-through cipher for tests and local fixtures.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextCipher;

impl TokenCipher for PlaintextCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, stored: &str) -> Result<String, CredentialError> {
        Ok(stored.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> AesGcmCipher {
        AesGcmCipher::from_base64(&AesGcmCipher::generate_key().unwrap()).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = cipher();
        let stored = cipher.encrypt("access-token-123").unwrap();

        assert_ne!(stored, "access-token-123");
        assert_eq!(cipher.decrypt(&stored).unwrap(), "access-token-123");
    }

    #[test]
    fn test_nonce_is_fresh_per_value() {
        let cipher = cipher();
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let stored = cipher().encrypt("secret").unwrap();
        let result = cipher().decrypt(&stored);
        assert!(matches!(result, Err(CredentialError::DecryptionFailed { .. })));
    }

    #[test]
    fn test_tampered_value_fails() {
        let cipher = cipher();
        let stored = cipher.encrypt("secret").unwrap();
        let mut raw = general_purpose::STANDARD.decode(&stored).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = general_purpose::STANDARD.encode(raw);

        assert!(cipher.decrypt(&tampered).is_err());
        assert!(cipher.decrypt("AAAA").is_err());
        assert!(cipher.decrypt("not base64!").is_err());
    }

    #[test]
    fn test_invalid_key_length() {
        let short = SecretString::new(general_purpose::STANDARD.encode([1u8; 16]));
        assert!(matches!(
            AesGcmCipher::from_base64(&short),
            Err(CredentialError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_url_safe_key_accepted() {
        let key = SecretString::new(general_purpose::URL_SAFE.encode([0xfbu8; KEY_LEN]));
        assert!(AesGcmCipher::from_base64(&key).is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        assert!(format!("{:?}", cipher()).contains("REDACTED"));
    }
}
