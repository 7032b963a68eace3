//! Sealed credential tokens.
//!
//! A token is URL-safe base64 of `version || nonce || ciphertext`, sealed
//! with XChaCha20-Poly1305 under the process key. The Poly1305 tag makes
//! tampering and wrong keys indistinguishable: both fail authentication.

use std::fmt;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chacha20poly1305::aead::generic_array::GenericArray;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::XChaCha20Poly1305;
use rand::RngCore;
use thiserror::Error;

use super::Credentials;
use crate::config::ConfigError;

/// Symmetric key length in bytes.
pub const KEY_LENGTH: usize = 32;

const NONCE_LENGTH: usize = 24;
const TAG_LENGTH: usize = 16;
const TOKEN_VERSION: u8 = 0x01;

/// Credential token could not be opened (or sealed).
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("credential token is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("credential token too short: {0} bytes")]
    Truncated(usize),

    #[error("unsupported credential token version {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("credential token failed authentication")]
    Authentication,

    #[error("credential payload is not a valid credential record: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("credential sealing failed")]
    Sealing,
}

/// Process-wide symmetric key, loaded once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultKey([u8; KEY_LENGTH]);

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse a URL-safe base64 key, padded or not.
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(ConfigError::MissingKey);
        }

        let bytes = decode_url_safe(encoded).map_err(ConfigError::InvalidKeyEncoding)?;
        let key: [u8; KEY_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ConfigError::InvalidKeyLength {
                    expected: KEY_LENGTH,
                    actual: bytes.len(),
                })?;

        Ok(Self(key))
    }

    /// Padded URL-safe base64 form, as accepted by [`VaultKey::from_base64`].
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.0)
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey(..)")
    }
}

fn decode_url_safe(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if encoded.ends_with('=') {
        URL_SAFE.decode(encoded)
    } else {
        URL_SAFE_NO_PAD.decode(encoded)
    }
}

/// Authenticated encryption of credential records.
#[derive(Clone)]
pub struct CredentialVault {
    key: VaultKey,
}

impl CredentialVault {
    pub fn new(key: VaultKey) -> Self {
        Self { key }
    }

    /// Seal the given credentials into a token.
    ///
    /// Only used to build inputs; the job path never encrypts.
    pub fn encrypt(&self, credentials: &Credentials) -> Result<String, VaultError> {
        let plaintext = serde_json::to_vec(credentials)?;
        let sealed = self.seal(&plaintext)?;
        Ok(URL_SAFE.encode(sealed))
    }

    /// Open a token and parse the credential record inside.
    pub fn decrypt(&self, token: &str) -> Result<Credentials, VaultError> {
        let data = decode_url_safe(token.trim())?;
        let plaintext = self.open(&data)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(GenericArray::from_slice(&self.key.0))
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let mut nonce = [0u8; NONCE_LENGTH];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|_| VaultError::Sealing)?;

        let mut token = Vec::with_capacity(1 + NONCE_LENGTH + ciphertext.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);
        Ok(token)
    }

    fn open(&self, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        if data.len() < 1 + NONCE_LENGTH + TAG_LENGTH {
            return Err(VaultError::Truncated(data.len()));
        }

        let (version, rest) = (data[0], &data[1..]);
        if version != TOKEN_VERSION {
            return Err(VaultError::UnsupportedVersion(version));
        }

        let (nonce, ciphertext) = rest.split_at(NONCE_LENGTH);
        self.cipher()
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::Authentication)
    }
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn vault(seed: u8) -> CredentialVault {
        CredentialVault::new(VaultKey::from_bytes([seed; KEY_LENGTH]))
    }

    #[test]
    fn test_round_trip() {
        let vault = vault(7);
        let records = [
            Credentials::new(Role::Admin),
            Credentials::new(Role::Librarian),
            Credentials::new(Role::Member),
            Credentials::new(Role::Other("archivist".to_string())),
            Credentials::default(),
        ];

        for creds in records {
            let token = vault.encrypt(&creds).unwrap();
            assert_eq!(vault.decrypt(&token).unwrap(), creds);
        }
    }

    #[test]
    fn test_encrypt_keeps_supplied_role() {
        let vault = vault(7);
        let token = vault.encrypt(&Credentials::new(Role::Admin)).unwrap();

        assert_eq!(vault.decrypt(&token).unwrap().role(), Role::Admin);
    }

    #[test]
    fn test_fresh_nonce_per_token() {
        let vault = vault(7);
        let creds = Credentials::new(Role::Member);

        assert_ne!(vault.encrypt(&creds).unwrap(), vault.encrypt(&creds).unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = vault(7).encrypt(&Credentials::new(Role::Admin)).unwrap();

        let result = vault(8).decrypt(&token);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_tampered_token_fails() {
        let vault = vault(7);
        let token = vault.encrypt(&Credentials::new(Role::Member)).unwrap();

        let mut raw = URL_SAFE.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = URL_SAFE.encode(&raw);

        assert!(matches!(vault.decrypt(&tampered), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_malformed_tokens_fail() {
        let vault = vault(7);

        assert!(matches!(vault.decrypt("not base64 at all!"), Err(VaultError::Encoding(_))));
        assert!(matches!(vault.decrypt("AQID"), Err(VaultError::Truncated(3))));

        let token = vault.encrypt(&Credentials::new(Role::Member)).unwrap();
        let mut raw = URL_SAFE.decode(&token).unwrap();
        raw[0] = 0x80;
        assert!(matches!(
            vault.decrypt(&URL_SAFE.encode(&raw)),
            Err(VaultError::UnsupportedVersion(0x80))
        ));
    }

    #[test]
    fn test_non_credential_payload_fails() {
        let vault = vault(7);

        for payload in [&b"not json"[..], &b"[1, 2]"[..], &br#"{"userType": 5}"#[..]] {
            let token = URL_SAFE.encode(vault.seal(payload).unwrap());
            assert!(matches!(vault.decrypt(&token), Err(VaultError::InvalidPayload(_))));
        }
    }

    #[test]
    fn test_key_from_base64() {
        let key = VaultKey::from_bytes([42; KEY_LENGTH]);
        let encoded = key.to_base64();

        assert_eq!(VaultKey::from_base64(&encoded).unwrap(), key);
        assert_eq!(
            VaultKey::from_base64(encoded.trim_end_matches('=')).unwrap(),
            key
        );
    }

    #[test]
    fn test_bad_keys_rejected() {
        assert!(matches!(VaultKey::from_base64("  "), Err(ConfigError::MissingKey)));
        assert!(matches!(
            VaultKey::from_base64("***"),
            Err(ConfigError::InvalidKeyEncoding(_))
        ));
        assert!(matches!(
            VaultKey::from_base64(&URL_SAFE.encode([1u8; 16])),
            Err(ConfigError::InvalidKeyLength { expected: 32, actual: 16 })
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let key = VaultKey::from_bytes([42; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "VaultKey(..)");
    }
}
