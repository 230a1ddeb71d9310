//! Encryption of credential columns at rest.
//!
//! Secrets stored in the `social_accounts` table may be AES-256-GCM encrypted.
//! The stored form is hex of `nonce (12 bytes) || ciphertext || auth_tag`.

use aes_gcm::{
    aead::{generic_array::typenum::U12, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use log::debug;
use std::env;

/// Environment variable holding the hex-encoded 32-byte key.
pub const ENCRYPTION_KEY_VAR: &str = "TOKEN_ENCRYPTION_KEY";

/// The length of the nonce in bytes (96 bits for AES-GCM)
const NONCE_LENGTH: usize = 12;

/// AES-256-GCM cipher for credential columns.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Builds a cipher from a 64-character hex key.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let key_bytes = hex::decode(key_hex.trim()).map_err(|e| {
            format!(
                "{} is not valid hex: {}. Generate a key with: openssl rand -hex 32",
                ENCRYPTION_KEY_VAR, e
            )
        })?;

        if key_bytes.len() != 32 {
            return Err(format!(
                "{} must be exactly 32 bytes (64 hex chars), got {} bytes",
                ENCRYPTION_KEY_VAR,
                key_bytes.len()
            )
            .into());
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| format!("Invalid encryption key: {}", e))?;
        Ok(Self { cipher })
    }

    /// Loads the cipher from `TOKEN_ENCRYPTION_KEY`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(SecretCipher))`: If the key is set and valid
    /// - `Ok(None)`: If the key is not set; stored secrets are then read as plaintext
    /// - `Err`: If the key is set but malformed
    pub fn from_env() -> Result<Option<Self>, Box<dyn std::error::Error + Send + Sync>> {
        match env::var(ENCRYPTION_KEY_VAR) {
            Ok(key_hex) if !key_hex.trim().is_empty() => Ok(Some(Self::from_hex_key(&key_hex)?)),
            _ => Ok(None),
        }
    }

    /// Encrypts a secret with a fresh random nonce.
    pub fn encrypt(
        &self,
        plaintext: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| format!("Failed to generate random nonce: {}", e))?;
        let nonce: Nonce<U12> = nonce_bytes.into();

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| format!("Encryption failed: {}", e))?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        debug!("Secret encrypted successfully");
        Ok(hex::encode(sealed))
    }

    /// Decrypts a value produced by [`SecretCipher::encrypt`].
    pub fn decrypt(
        &self,
        sealed_hex: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let sealed = hex::decode(sealed_hex.trim())
            .map_err(|e| format!("Invalid hex in encrypted secret: {}", e))?;

        if sealed.len() < NONCE_LENGTH {
            return Err("Encrypted secret is too short".into());
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let nonce_array: [u8; NONCE_LENGTH] =
            nonce_bytes.try_into().map_err(|_| "Invalid nonce length")?;
        let nonce: Nonce<U12> = nonce_array.into();

        let plaintext = self
            .cipher
            .decrypt(&nonce, ciphertext)
            .map_err(|_| "Decryption failed - wrong key or corrupted data")?;

        String::from_utf8(plaintext)
            .map_err(|e| format!("Decrypted secret is not valid UTF-8: {}", e).into())
    }
}

/// Reveals a stored secret, decrypting it when a cipher is configured.
pub fn reveal(
    cipher: Option<&SecretCipher>,
    stored: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    match cipher {
        Some(cipher) if !stored.is_empty() => cipher.decrypt(stored),
        _ => Ok(stored.to_string()),
    }
}
