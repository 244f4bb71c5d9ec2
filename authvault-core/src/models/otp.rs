//! One-time password parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of digits in a generated code
pub const DEFAULT_DIGITS: u32 = 6;

/// Default TOTP period in seconds
pub const DEFAULT_PERIOD: u32 = 30;

/// Number of characters in a Steam Guard code
pub const STEAM_DIGITS: u32 = 5;

/// HMAC hash algorithm used to compute codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HashAlgorithm {
    /// HMAC-SHA1 (the default in nearly every issuer)
    #[default]
    Sha1,
    /// HMAC-SHA256
    Sha256,
    /// HMAC-SHA512
    Sha512,
    /// HMAC-MD5 (legacy, still found in some exports)
    Md5,
}

impl HashAlgorithm {
    /// Parses an algorithm name as written by backup formats.
    ///
    /// Accepts `SHA1`, `sha-1`, `HmacSHA1` and similar spellings.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name
            .trim()
            .to_ascii_uppercase()
            .replace('-', "")
            .trim_start_matches("HMAC")
            .to_string();
        match normalized.as_str() {
            "SHA1" => Some(Self::Sha1),
            "SHA256" => Some(Self::Sha256),
            "SHA512" => Some(Self::Sha512),
            "MD5" => Some(Self::Md5),
            _ => None,
        }
    }

    /// Returns the canonical name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
            Self::Md5 => "MD5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of one-time password and its moving factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OtpKind {
    /// Time-based code (RFC 6238)
    Totp {
        /// Period in seconds
        period: u32,
    },
    /// Counter-based code (RFC 4226)
    Hotp {
        /// Current counter value
        counter: u64,
    },
    /// Steam Guard code (TOTP with a custom alphabet)
    Steam {
        /// Period in seconds
        period: u32,
    },
}

impl OtpKind {
    /// Returns the lowercase type name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Totp { .. } => "totp",
            Self::Hotp { .. } => "hotp",
            Self::Steam { .. } => "steam",
        }
    }
}

impl Default for OtpKind {
    fn default() -> Self {
        Self::Totp {
            period: DEFAULT_PERIOD,
        }
    }
}

/// Parameters needed to generate codes for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OtpParams {
    /// Code kind and moving factor
    #[serde(flatten)]
    pub kind: OtpKind,
    /// HMAC algorithm
    #[serde(rename = "algo")]
    pub algorithm: HashAlgorithm,
    /// Number of digits in a code
    pub digits: u32,
}

impl OtpParams {
    /// Creates TOTP parameters
    #[must_use]
    pub const fn totp(algorithm: HashAlgorithm, digits: u32, period: u32) -> Self {
        Self {
            kind: OtpKind::Totp { period },
            algorithm,
            digits,
        }
    }

    /// Creates HOTP parameters
    #[must_use]
    pub const fn hotp(algorithm: HashAlgorithm, digits: u32, counter: u64) -> Self {
        Self {
            kind: OtpKind::Hotp { counter },
            algorithm,
            digits,
        }
    }

    /// Creates Steam Guard parameters
    #[must_use]
    pub const fn steam(period: u32) -> Self {
        Self {
            kind: OtpKind::Steam { period },
            algorithm: HashAlgorithm::Sha1,
            digits: STEAM_DIGITS,
        }
    }

    /// Checks that the parameters can produce codes.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=10).contains(&self.digits) {
            return Err(format!("unsupported digit count {}", self.digits));
        }
        match self.kind {
            OtpKind::Totp { period } | OtpKind::Steam { period } if period == 0 => {
                Err("period must be greater than zero".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl Default for OtpParams {
    fn default() -> Self {
        Self::totp(HashAlgorithm::Sha1, DEFAULT_DIGITS, DEFAULT_PERIOD)
    }
}
