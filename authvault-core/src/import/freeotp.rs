//! FreeOTP importer.
//!
//! FreeOTP on Android keeps its tokens in a shared-preferences XML file:
//!
//! ```xml
//! <map>
//!     <string name="tokenOrder">["Example:alice"]</string>
//!     <string name="Example:alice">{"algo":"SHA1","counter":0,"digits":6,
//!         "issuerExt":"Example","label":"alice","period":30,
//!         "secret":[72,-17,...],"type":"TOTP"}</string>
//! </map>
//! ```
//!
//! The JSON inside each `<string>` is XML-escaped. Secrets are stored as
//! signed bytes.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use serde::Deserialize;

use crate::models::{HashAlgorithm, ImportableEntry, OtpParams, OtpSecret};

use super::source::ByteSource;
use super::traits::{ConversionError, FormatCandidate, FormatParseError, Parsed};

const TOKEN_ORDER_KEY: &str = "tokenOrder";

/// A single token as serialized by FreeOTP
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FreeOtpToken {
    #[serde(default = "default_algo")]
    algo: String,
    #[serde(default)]
    counter: u64,
    #[serde(default = "default_digits")]
    digits: u32,
    #[serde(default)]
    issuer_ext: String,
    #[serde(default)]
    issuer_int: String,
    #[serde(default)]
    label: String,
    #[serde(default = "default_period")]
    period: u32,
    secret: Vec<i8>,
    #[serde(rename = "type", default = "default_type")]
    kind: String,
}

fn default_algo() -> String {
    "SHA1".to_string()
}

const fn default_digits() -> u32 {
    crate::models::DEFAULT_DIGITS
}

const fn default_period() -> u32 {
    crate::models::DEFAULT_PERIOD
}

fn default_type() -> String {
    "TOTP".to_string()
}

impl FreeOtpToken {
    fn to_entry(&self, index: usize) -> Result<ImportableEntry, ConversionError> {
        let invalid = |reason: String| ConversionError::InvalidEntry { index, reason };

        let algorithm = HashAlgorithm::parse(&self.algo)
            .ok_or_else(|| invalid(format!("unsupported algorithm {}", self.algo)))?;
        let otp = match self.kind.to_ascii_uppercase().as_str() {
            "TOTP" => OtpParams::totp(algorithm, self.digits, self.period),
            "HOTP" => OtpParams::hotp(algorithm, self.digits, self.counter),
            other => return Err(invalid(format!("unsupported token type {other}"))),
        };
        otp.validate().map_err(invalid)?;

        if self.secret.is_empty() {
            return Err(invalid("empty secret".to_string()));
        }
        let secret = OtpSecret::from_bytes(
            self.secret
                .iter()
                .map(|b| u8::from_ne_bytes(b.to_ne_bytes()))
                .collect(),
        );

        let issuer = if self.issuer_ext.is_empty() {
            &self.issuer_int
        } else {
            &self.issuer_ext
        };
        Ok(ImportableEntry::new(issuer.clone(), self.label.clone(), secret, otp))
    }
}

/// Reads FreeOTP shared-preferences backups
#[derive(Debug, Default)]
pub struct FreeOtpCandidate {
    tokens: Option<Vec<FreeOtpToken>>,
}

impl FreeOtpCandidate {
    /// Format identifier
    pub const FORMAT_ID: &'static str = "freeotp";

    /// Creates an unparsed candidate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects `(name, text)` of every `<string>` child of the `<map>` root
    fn read_strings(content: &str) -> Result<Vec<(String, String)>, FormatParseError> {
        let mut reader = Reader::from_str(content.trim_start_matches('\u{feff}'));

        let mut seen_root = false;
        let mut current: Option<(String, String)> = None;
        let mut strings = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                if seen_root {
                    FormatParseError::malformed(format!("invalid XML: {e}"))
                } else {
                    FormatParseError::not_recognized(format!("not XML: {e}"))
                }
            })?;

            match event {
                Event::Start(e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if !seen_root {
                        if tag != "map" {
                            return Err(FormatParseError::not_recognized(format!(
                                "root element is <{tag}>, expected <map>"
                            )));
                        }
                        seen_root = true;
                    } else if tag == "string" {
                        let name = e
                            .attributes()
                            .flatten()
                            .find(|attr| attr.key.as_ref() == b"name")
                            .ok_or_else(|| {
                                FormatParseError::malformed("<string> without a name attribute")
                            })?
                            .decode_and_unescape_value(reader.decoder())
                            .map_err(|e| {
                                FormatParseError::malformed(format!("invalid name attribute: {e}"))
                            })?
                            .into_owned();
                        current = Some((name, String::new()));
                    }
                }
                Event::Empty(e) if !seen_root => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if tag != "map" {
                        return Err(FormatParseError::not_recognized(format!(
                            "root element is <{tag}>, expected <map>"
                        )));
                    }
                    return Ok(strings);
                }
                Event::Text(e) => {
                    if let Some((_, text)) = current.as_mut() {
                        text.push_str(&String::from_utf8_lossy(&e));
                    } else if !seen_root && !e.iter().all(u8::is_ascii_whitespace) {
                        return Err(FormatParseError::not_recognized("text before root element"));
                    }
                }
                Event::GeneralRef(e) => {
                    let resolved = resolve_reference(&e)?;
                    if let Some((_, text)) = current.as_mut() {
                        text.push_str(&resolved);
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"string" => strings.extend(current.take()),
                    b"map" => return Ok(strings),
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if seen_root {
            Err(FormatParseError::malformed("unexpected end of document"))
        } else {
            Err(FormatParseError::not_recognized("no root element"))
        }
    }
}

/// Resolves a character reference or one of the predefined XML entities
fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, FormatParseError> {
    let name = String::from_utf8_lossy(reference);
    match reference.resolve_char_ref() {
        Ok(Some(ch)) => Ok(ch.to_string()),
        Ok(None) => resolve_predefined_entity(&name)
            .map(str::to_string)
            .ok_or_else(|| FormatParseError::malformed(format!("unknown entity &{name};"))),
        Err(e) => Err(FormatParseError::malformed(format!(
            "invalid character reference &{name};: {e}"
        ))),
    }
}

impl FormatCandidate for FreeOtpCandidate {
    fn format_id(&self) -> &str {
        Self::FORMAT_ID
    }

    fn display_name(&self) -> &str {
        "FreeOTP"
    }

    fn parse(&mut self, source: &mut ByteSource) -> Result<Parsed, FormatParseError> {
        let content = std::str::from_utf8(source.read_remaining())
            .map_err(|_| FormatParseError::not_recognized("not UTF-8 text"))?;
        let strings = Self::read_strings(content)?;

        let order_json = strings
            .iter()
            .find(|(name, _)| name == TOKEN_ORDER_KEY)
            .map(|(_, text)| text.as_str())
            .ok_or_else(|| FormatParseError::not_recognized("no tokenOrder preference"))?;
        let order: Vec<String> = serde_json::from_str(order_json)
            .map_err(|e| FormatParseError::malformed(format!("invalid tokenOrder: {e}")))?;

        let mut keyed = Vec::new();
        for (name, text) in &strings {
            if name == TOKEN_ORDER_KEY {
                continue;
            }
            let token: FreeOtpToken = serde_json::from_str(text)
                .map_err(|e| FormatParseError::malformed(format!("token {name}: {e}")))?;
            keyed.push((name.as_str(), token));
        }

        let mut tokens = Vec::with_capacity(keyed.len());
        for key in &order {
            if let Some(pos) = keyed.iter().position(|(name, _)| name == key) {
                tokens.push(keyed.remove(pos).1);
            } else {
                tracing::debug!(token = %key, "tokenOrder references a missing token");
            }
        }
        tokens.extend(keyed.into_iter().map(|(_, token)| token));

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
