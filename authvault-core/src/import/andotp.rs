//! andOTP importer.
//!
//! Reads the plaintext JSON export: an array of token objects with a base32
//! `secret`. Encrypted andOTP exports are not supported and fall through to
//! "not recognized".

use serde::Deserialize;

use crate::models::{DEFAULT_DIGITS, DEFAULT_PERIOD, HashAlgorithm, ImportableEntry, OtpParams, OtpSecret};

use super::source::ByteSource;
use super::traits::{ConversionError, FormatCandidate, FormatParseError, Parsed};

/// Separator used by old andOTP versions that had no issuer field
const LEGACY_LABEL_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, Deserialize)]
struct AndOtpToken {
    secret: String,
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default)]
    label: String,
    #[serde(default = "default_digits")]
    digits: u32,
    #[serde(rename = "type", default = "default_type")]
    kind: String,
    #[serde(default = "default_algorithm")]
    algorithm: String,
    #[serde(default)]
    period: Option<u32>,
    #[serde(default)]
    counter: Option<u64>,
}

const fn default_digits() -> u32 {
    DEFAULT_DIGITS
}

fn default_type() -> String {
    "TOTP".to_string()
}

fn default_algorithm() -> String {
    "SHA1".to_string()
}

impl AndOtpToken {
    /// Issuer and account, splitting `Issuer - account` labels when the
    /// token predates the issuer field
    fn issuer_and_label(&self) -> (String, String) {
        match self.issuer.as_deref().map(str::trim) {
            Some(issuer) if !issuer.is_empty() => (issuer.to_string(), self.label.clone()),
            _ => match self.label.split_once(LEGACY_LABEL_SEPARATOR) {
                Some((issuer, account)) => (issuer.trim().to_string(), account.trim().to_string()),
                None => (String::new(), self.label.clone()),
            },
        }
    }

    fn to_entry(&self, index: usize) -> Result<ImportableEntry, ConversionError> {
        let invalid = |reason: String| ConversionError::InvalidEntry { index, reason };

        let algorithm = HashAlgorithm::parse(&self.algorithm)
            .ok_or_else(|| invalid(format!("unsupported algorithm {}", self.algorithm)))?;
        let period = self.period.unwrap_or(DEFAULT_PERIOD);
        let otp = match self.kind.to_ascii_uppercase().as_str() {
            "TOTP" => OtpParams::totp(algorithm, self.digits, period),
            "HOTP" => OtpParams::hotp(algorithm, self.digits, self.counter.unwrap_or(0)),
            "STEAM" => OtpParams::steam(period),
            other => return Err(invalid(format!("unsupported token type {other}"))),
        };
        otp.validate().map_err(invalid)?;

        let secret = OtpSecret::from_base32(&self.secret).map_err(|e| invalid(e.to_string()))?;
        let (issuer, label) = self.issuer_and_label();
        Ok(ImportableEntry::new(issuer, label, secret, otp))
    }
}

/// Reads andOTP plaintext JSON exports
#[derive(Debug, Default)]
pub struct AndOtpCandidate {
    tokens: Option<Vec<AndOtpToken>>,
}

impl AndOtpCandidate {
    /// Format identifier
    pub const FORMAT_ID: &'static str = "andotp";

    /// Creates an unparsed candidate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatCandidate for AndOtpCandidate {
    fn format_id(&self) -> &str {
        Self::FORMAT_ID
    }

    fn display_name(&self) -> &str {
        "andOTP"
    }

    fn parse(&mut self, source: &mut ByteSource) -> Result<Parsed, FormatParseError> {
        let value: serde_json::Value = serde_json::from_slice(source.read_remaining())
            .map_err(|e| FormatParseError::not_recognized(format!("not JSON: {e}")))?;
        let serde_json::Value::Array(items) = value else {
            return Err(FormatParseError::not_recognized("top level is not an array"));
        };
        if let Some(first) = items.first()
            && first.get("secret").is_none()
        {
            return Err(FormatParseError::not_recognized(
                "array elements have no secret field",
            ));
        }

        let tokens = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<AndOtpToken>(item)
                    .map_err(|e| FormatParseError::malformed(format!("token {index}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::trace!(count = tokens.len(), "andOTP tokens parsed");
        self.tokens = Some(tokens);
        Ok(Parsed::PLAIN)
    }

    fn is_encrypted(&self) -> bool {
        false
    }

    fn convert(&self) -> Result<Vec<ImportableEntry>, ConversionError> {
        self.tokens
            .as_ref()
            .ok_or(ConversionError::NotParsed)?
            .iter()
            .enumerate()
            .map(|(index, token)| token.to_entry(index))
            .collect()
    }

    fn discard(&mut self) {
        self.tokens = None;
    }
}
