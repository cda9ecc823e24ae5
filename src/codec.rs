//! Application server key codec.
//!
//! The server hands out its VAPID public key as unpadded URL-safe base64. The
//! push capability wants raw bytes, so the text is re-padded, mapped back to
//! the standard alphabet and decoded strictly.

use std::fmt;

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use thiserror::Error;

/// Length of an uncompressed SEC1 P-256 point.
pub const UNCOMPRESSED_P256_LEN: usize = 65;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyFormatError {
    #[error("invalid base64url key: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("key must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("key is not an uncompressed P-256 point (leading byte {0:#04x})")]
    NotUncompressedPoint(u8),
}

/// Decodes URL-safe base64 (padded or not) into bytes.
pub fn decode(base64url: &str) -> Result<Vec<u8>, KeyFormatError> {
    let padding = (4 - base64url.len() % 4) % 4;
    let mut standard = String::with_capacity(base64url.len() + padding);
    for c in base64url.chars() {
        standard.push(match c {
            '-' => '+',
            '_' => '/',
            other => other,
        });
    }
    standard.extend(std::iter::repeat_n('=', padding));

    Ok(STANDARD.decode(standard)?)
}

/// Encodes bytes as unpadded URL-safe base64, the form the server publishes.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A decoded VAPID application server key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Decodes `base64url` and checks it is an uncompressed P-256 point.
    pub fn parse(base64url: &str) -> Result<Self, KeyFormatError> {
        let bytes = decode(base64url)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeyFormatError> {
        if bytes.len() != UNCOMPRESSED_P256_LEN {
            return Err(KeyFormatError::Length {
                expected: UNCOMPRESSED_P256_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != 0x04 {
            return Err(KeyFormatError::NotUncompressedPoint(bytes[0]));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64url(&self) -> String {
        encode(&self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_base64url()).finish()
    }
}
