/// Credential vault - authenticated encryption for OAuth secrets at rest
///
/// Tokens are encrypted with AES-256-GCM and stored as
/// `base64(nonce || ciphertext || tag)`. Decryption fails closed on a
/// tampered or truncated payload; callers must treat that as fatal for the
/// operation instead of retrying with the same ciphertext.
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;

use crate::shared::errors::{AppError, AppResult};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl CredentialVault {
    pub fn new(key: &[u8]) -> AppResult<Self> {
        if key.len() != KEY_LEN {
            return Err(AppError::CryptoError(format!(
                "Vault key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| AppError::CryptoError("Invalid vault key".to_string()))?;

        Ok(Self { cipher })
    }

    /// Build the vault from the `CREDENTIAL_VAULT_KEY` environment variable
    /// (base64-encoded 32-byte key).
    pub fn from_env() -> AppResult<Self> {
        let encoded = std::env::var("CREDENTIAL_VAULT_KEY").map_err(|_| {
            AppError::CryptoError("CREDENTIAL_VAULT_KEY environment variable not found".to_string())
        })?;

        let key = BASE64
            .decode(encoded.trim())
            .map_err(|e| AppError::CryptoError(format!("Invalid vault key encoding: {}", e)))?;

        Self::new(&key)
    }

    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| AppError::CryptoError("Encryption failed".to_string()))?;

        let mut stored = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(stored))
    }

    pub fn decrypt(&self, stored: &str) -> AppResult<String> {
        let raw = BASE64
            .decode(stored)
            .map_err(|e| AppError::CryptoError(format!("Invalid ciphertext encoding: {}", e)))?;

        // Nonce plus at least the 16-byte GCM tag; exactly nonce+tag is
        // the empty plaintext
        if raw.len() < NONCE_LEN + 16 {
            return Err(AppError::CryptoError(
                "Ciphertext is truncated".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self.cipher.decrypt(nonce, ciphertext).map_err(|_| {
            AppError::CryptoError("Decryption failed: payload tampered or wrong key".to_string())
        })?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::CryptoError("Decrypted payload is not valid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vault() -> CredentialVault {
        CredentialVault::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn round_trip_preserves_plaintext() {
        let vault = test_vault();

        for input in ["", "token", "a much longer secret with spaces and ünicode ✓"] {
            let stored = vault.encrypt(input).unwrap();
            assert_eq!(vault.decrypt(&stored).unwrap(), input);
        }
    }

    #[test]
    fn empty_plaintext_round_trips() {
        // AES-GCM of "" is exactly nonce + tag with no body; the
        // truncation guard must still let it through
        let vault = test_vault();
        let stored = vault.encrypt("").unwrap();
        assert_eq!(
            BASE64.decode(&stored).unwrap().len(),
            NONCE_LEN + 16
        );
        assert_eq!(vault.decrypt(&stored).unwrap(), "");
    }

    #[test]
    fn encrypt_is_nonce_randomized() {
        let vault = test_vault();
        let a = vault.encrypt("same plaintext").unwrap();
        let b = vault.encrypt("same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(CredentialVault::new(&[1u8; 16]).is_err());
        assert!(CredentialVault::new(&[1u8; 33]).is_err());
    }

    #[test]
    fn decrypt_fails_on_flipped_byte() {
        let vault = test_vault();
        let stored = vault.encrypt("secret-token").unwrap();

        let mut raw = BASE64.decode(&stored).unwrap();
        // Flip one byte in every position class: nonce, body, tag
        for idx in [0, raw.len() / 2, raw.len() - 1] {
            raw[idx] ^= 0x01;
            let tampered = BASE64.encode(&raw);
            assert!(vault.decrypt(&tampered).is_err());
            raw[idx] ^= 0x01;
        }
    }

    #[test]
    fn decrypt_fails_on_truncation() {
        let vault = test_vault();
        let stored = vault.encrypt("secret-token").unwrap();

        let raw = BASE64.decode(&stored).unwrap();
        let truncated = BASE64.encode(&raw[..NONCE_LEN + 4]);
        assert!(vault.decrypt(&truncated).is_err());
    }

    #[test]
    fn decrypt_fails_with_different_key() {
        let vault = test_vault();
        let other = CredentialVault::new(&[9u8; 32]).unwrap();

        let stored = vault.encrypt("secret-token").unwrap();
        assert!(other.decrypt(&stored).is_err());
    }
}
