//! Payload decryption.
//!
//! SPARTN payloads are encrypted with AES-128 in counter mode where the full 128-bit
//! IV derived from the transport fields is the initial counter block.
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;

use crate::prelude::*;

/// 128-bit AES key.
#[derive(Clone, PartialEq, Eq)]
pub struct Key([u8; 16]);

impl Key {
    /// Environment variable consulted for the key when one is not configured.
    pub const ENV_VAR: &'static str = "MQTTKEY";

    #[must_use]
    pub fn new(key: [u8; 16]) -> Self {
        Self(key)
    }

    /// Decode a key from a hexadecimal string.
    ///
    /// # Errors
    /// [Error::InvalidKey] if `hex` is not valid hexadecimal or not 16 bytes.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = hex::decode(hex.trim()).map_err(|err| Error::InvalidKey(err.to_string()))?;
        let key: [u8; 16] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| Error::InvalidKey(format!("expected 16 bytes, got {}", b.len())))?;
        Ok(Self(key))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

// Keep key material out of logs.
impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key(..)")
    }
}

/// Block-cipher decryption of frame payloads.
pub trait Decryptor: Send + Sync {
    /// Decrypt `ciphertext`, returning plaintext of the same length.
    ///
    /// # Errors
    /// [Error::Decryption] if the cipher cannot be applied.
    fn decrypt(&self, ciphertext: &[u8], key: &Key, iv: &[u8; 16]) -> Result<Vec<u8>>;
}

/// AES-128-CTR, the SPARTN payload cipher.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesCtrDecryptor;

impl Decryptor for AesCtrDecryptor {
    fn decrypt(&self, ciphertext: &[u8], key: &Key, iv: &[u8; 16]) -> Result<Vec<u8>> {
        let mut cipher = Ctr128BE::<Aes128>::new(key.as_bytes().into(), iv.into());
        let mut plaintext = ciphertext.to_vec();
        cipher
            .try_apply_keystream(&mut plaintext)
            .map_err(|err| Error::Decryption(err.to_string()))?;
        Ok(plaintext)
    }
}
