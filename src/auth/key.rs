use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::types::normalize_email;

type HmacSha256 = Hmac<Sha256>;

/// Number of base64url characters kept from the digest. 12 chars carry 72 bits.
pub const KEY_LENGTH: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("MOD_LINK_SECRET is missing")]
    MissingSecret,

    #[error("Invalid modification link secret: {0}")]
    InvalidSecret(String),
}

/// Derives the permanent modification key for an email.
///
/// The key is `base64url(HMAC-SHA256(secret, normalize(email)))[..12]`. The same
/// email always yields the same key, and without the secret the key cannot be
/// mapped back to an email.
#[derive(Clone)]
pub struct KeyDeriver {
    mac: HmacSha256,
}

impl KeyDeriver {
    pub fn new(secret: &str) -> Result<Self, KeyError> {
        if secret.is_empty() {
            return Err(KeyError::MissingSecret);
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| KeyError::InvalidSecret(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Build from an optional configured secret, failing when it is absent.
    pub fn from_config(secret: Option<&str>) -> Result<Self, KeyError> {
        Self::new(secret.ok_or(KeyError::MissingSecret)?)
    }

    pub fn derive(&self, email: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(normalize_email(email).as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut encoded = URL_SAFE_NO_PAD.encode(digest);
        encoded.truncate(KEY_LENGTH);
        encoded
    }

    /// True when `key` is the derived key of `email`.
    pub fn matches(&self, email: &str, key: &str) -> bool {
        self.derive(email) == key
    }
}

impl std::fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDeriver").finish_non_exhaustive()
    }
}
