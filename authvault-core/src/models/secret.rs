//! OTP secret key material.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

/// RFC 4648 base32 alphabet
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Error returned when a base32 secret cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretDecodeError {
    /// The input contained a character outside the base32 alphabet
    #[error("invalid base32 character '{0}'")]
    InvalidCharacter(char),

    /// The input decoded to zero bytes
    #[error("secret is empty")]
    Empty,
}

/// Raw OTP key bytes.
///
/// The buffer is zeroized on drop and never printed by `Debug`. Serialized
/// as unpadded base32, which is how every supported backup format and the
/// vault itself store secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpSecret(Zeroizing<Vec<u8>>);

impl OtpSecret {
    /// Wraps raw key bytes
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Decodes a base32 secret.
    ///
    /// Whitespace, dashes and `=` padding are ignored and lowercase letters
    /// are accepted, matching what authenticator apps show to users.
    ///
    /// # Errors
    ///
    /// Returns an error for characters outside the alphabet or empty input.
    pub fn from_base32(encoded: &str) -> Result<Self, SecretDecodeError> {
        let mut out = Zeroizing::new(Vec::with_capacity(encoded.len() * 5 / 8));
        let mut buffer: u32 = 0;
        let mut bits: u32 = 0;

        for ch in encoded.chars() {
            if ch.is_whitespace() || ch == '-' || ch == '=' {
                continue;
            }
            let upper = ch.to_ascii_uppercase();
            let value = BASE32_ALPHABET
                .iter()
                .position(|&c| char::from(c) == upper)
                .ok_or(SecretDecodeError::InvalidCharacter(ch))?;

            buffer = (buffer << 5) | u32::try_from(value).unwrap_or_default();
            bits += 5;
            if bits >= 8 {
                bits -= 8;
                out.push(((buffer >> bits) & 0xff) as u8);
            }
        }

        if out.is_empty() {
            return Err(SecretDecodeError::Empty);
        }
        Ok(Self(out))
    }

    /// Encodes the secret as unpadded base32
    #[must_use]
    pub fn to_base32(&self) -> String {
        let mut out = String::with_capacity(self.0.len().div_ceil(5) * 8);
        let mut buffer: u32 = 0;
        let mut bits: u32 = 0;

        for &byte in self.0.iter() {
            buffer = (buffer << 8) | u32::from(byte);
            bits += 8;
            while bits >= 5 {
                bits -= 5;
                out.push(char::from(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize]));
            }
        }
        if bits > 0 {
            out.push(char::from(
                BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize],
            ));
        }
        out
    }

    /// Returns the raw key bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the key length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the key is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for OtpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OtpSecret([REDACTED; {}])", self.0.len())
    }
}

impl Serialize for OtpSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = Zeroizing::new(self.to_base32());
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for OtpSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Zeroizing::new(String::deserialize(deserializer)?);
        Self::from_base32(&encoded).map_err(serde::de::Error::custom)
    }
}
