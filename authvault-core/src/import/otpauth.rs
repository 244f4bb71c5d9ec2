//! Plain-text `otpauth://` URI lists.
//!
//! One Key URI per line, as exported by many authenticator apps and
//! password managers. Blank lines and lines starting with `#` are skipped.

use crate::models::{DEFAULT_DIGITS, DEFAULT_PERIOD, HashAlgorithm, ImportableEntry, OtpParams, OtpSecret};

use super::source::ByteSource;
use super::traits::{ConversionError, FormatCandidate, FormatParseError, Parsed};

const SCHEME: &str = "otpauth://";

/// Parses a single Key URI into an entry
fn parse_uri(uri: &str) -> Result<ImportableEntry, String> {
    let rest = uri
        .strip_prefix(SCHEME)
        .ok_or_else(|| format!("expected {SCHEME} URI"))?;
    let (kind, rest) = rest.split_once('/').ok_or("missing label")?;
    let (raw_label, query) = rest.split_once('?').unwrap_or((rest, ""));

    let label = urlencoding::decode(raw_label).map_err(|e| format!("invalid label: {e}"))?;
    let (label_issuer, account) = match label.split_once(':') {
        Some((issuer, account)) => (issuer.trim().to_string(), account.trim().to_string()),
        None => (String::new(), label.trim().to_string()),
    };

    let mut secret = None;
    let mut issuer = None;
    let mut algorithm = HashAlgorithm::default();
    let mut digits = DEFAULT_DIGITS;
    let mut period = DEFAULT_PERIOD;
    let mut counter = None;
    let mut steam_encoder = false;

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(raw_value)
            .map_err(|e| format!("invalid value for {key}: {e}"))?;
        match key.to_ascii_lowercase().as_str() {
            "secret" => {
                secret = Some(OtpSecret::from_base32(&value).map_err(|e| format!("secret: {e}"))?);
            }
            "issuer" => issuer = Some(value.trim().to_string()),
            "algorithm" => {
                algorithm = HashAlgorithm::parse(&value)
                    .ok_or_else(|| format!("unsupported algorithm {value}"))?;
            }
            "digits" => digits = value.parse().map_err(|_| format!("invalid digits {value}"))?,
            "period" => period = value.parse().map_err(|_| format!("invalid period {value}"))?,
            "counter" => {
                counter = Some(value.parse().map_err(|_| format!("invalid counter {value}"))?);
            }
            "encoder" => steam_encoder = value.eq_ignore_ascii_case("steam"),
            _ => {}
        }
    }

    let otp = match kind.to_ascii_lowercase().as_str() {
        "totp" if steam_encoder => OtpParams::steam(period),
        "totp" => OtpParams::totp(algorithm, digits, period),
        "hotp" => OtpParams::hotp(
            algorithm,
            digits,
            counter.ok_or("hotp URI without counter")?,
        ),
        "steam" => OtpParams::steam(period),
        other => return Err(format!("unsupported type {other}")),
    };
    otp.validate()?;

    let secret = secret.ok_or("missing secret")?;
    let issuer = issuer.filter(|i| !i.is_empty()).unwrap_or(label_issuer);
    Ok(ImportableEntry::new(issuer, account, secret, otp))
}

/// Reads newline-separated `otpauth://` URIs
#[derive(Debug, Default)]
pub struct OtpAuthCandidate {
    entries: Option<Vec<ImportableEntry>>,
}

impl OtpAuthCandidate {
    /// Format identifier
    pub const FORMAT_ID: &'static str = "otpauth";

    /// Creates an unparsed candidate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatCandidate for OtpAuthCandidate {
    fn format_id(&self) -> &str {
        Self::FORMAT_ID
    }

    fn display_name(&self) -> &str {
        "otpauth URI list"
    }

    fn parse(&mut self, source: &mut ByteSource) -> Result<Parsed, FormatParseError> {
        let content = std::str::from_utf8(source.read_remaining())
            .map_err(|_| FormatParseError::not_recognized("not UTF-8 text"))?;

        let mut lines = content
            .trim_start_matches('\u{feff}')
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
            .peekable();

        match lines.peek() {
            None => return Err(FormatParseError::not_recognized("no URIs")),
            Some((_, first)) if !first.starts_with(SCHEME) => {
                return Err(FormatParseError::not_recognized(format!(
                    "first line is not an {SCHEME} URI"
                )));
            }
            Some(_) => {}
        }

        let entries = lines
            .map(|(number, line)| {
                parse_uri(line)
                    .map_err(|reason| FormatParseError::malformed(format!("line {number}: {reason}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.entries = Some(entries);
        Ok(Parsed::PLAIN)
    }

    fn is_encrypted(&self) -> bool {
        false
    }

    fn convert(&self) -> Result<Vec<ImportableEntry>, ConversionError> {
        self.entries.clone().ok_or(ConversionError::NotParsed)
    }

    fn discard(&mut self) {
        self.entries = None;
    }
}
