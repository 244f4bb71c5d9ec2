//! List vault entries command.

use std::fmt::Write as _;

use authvault_core::config::AppSettings;
use authvault_core::models::VaultEntry;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{escape_csv_field, open_vault};

/// List command handler
pub fn cmd_list(settings: &AppSettings, format: OutputFormat) -> Result<(), CliError> {
    let (_, vault) = open_vault(settings)?;
    let rows: Vec<EntryOutput> = vault.entries.iter().map(EntryOutput::from).collect();

    match format {
        OutputFormat::Table => println!("{}", format_table(&rows)),
        OutputFormat::Json => println!("{}", format_json(&rows)?),
        OutputFormat::Csv => println!("{}", format_csv(&rows)),
    }
    Ok(())
}

/// Format entries as a table string
#[must_use]
pub fn format_table(rows: &[EntryOutput]) -> String {
    if rows.is_empty() {
        return "No entries found.".to_string();
    }

    let mut output = String::new();

    let issuer_width = rows.iter().map(|r| r.issuer.len()).max().unwrap_or(6).max(6);
    let account_width = rows.iter().map(|r| r.account.len()).max().unwrap_or(7).max(7);
    let type_width = 5;

    let _ = writeln!(
        output,
        "{:<issuer_width$}  {:<account_width$}  {:<type_width$}  {:<6}  DIGITS",
        "ISSUER", "ACCOUNT", "TYPE", "ALGO"
    );
    let _ = writeln!(
        output,
        "{:-<issuer_width$}  {:-<account_width$}  {:-<type_width$}  {:-<6}  ------",
        "", "", "", ""
    );
    for row in rows {
        let _ = writeln!(
            output,
            "{:<issuer_width$}  {:<account_width$}  {:<type_width$}  {:<6}  {}",
            row.issuer, row.account, row.kind, row.algorithm, row.digits
        );
    }

    output.trim_end().to_string()
}

/// Format entries as JSON string
///
/// # Errors
///
/// Returns `CliError::Config` if JSON serialization fails.
pub fn format_json(rows: &[EntryOutput]) -> Result<String, CliError> {
    serde_json::to_string_pretty(rows)
        .map_err(|e| CliError::Config(format!("Failed to serialize to JSON: {e}")))
}

/// Format entries as CSV string
#[must_use]
pub fn format_csv(rows: &[EntryOutput]) -> String {
    let mut output = String::from("uuid,issuer,account,type,algorithm,digits\n");
    for row in rows {
        let _ = writeln!(
            output,
            "{},{},{},{},{},{}",
            row.uuid,
            escape_csv_field(&row.issuer),
            escape_csv_field(&row.account),
            row.kind,
            row.algorithm,
            row.digits
        );
    }
    output.trim_end().to_string()
}

/// Entry summary for CLI output; never carries the secret
#[derive(Debug, Clone, serde::Serialize)]
pub struct EntryOutput {
    pub uuid: String,
    pub issuer: String,
    pub account: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub algorithm: &'static str,
    pub digits: u32,
}

impl From<&VaultEntry> for EntryOutput {
    fn from(entry: &VaultEntry) -> Self {
        Self {
            uuid: entry.uuid.to_string(),
            issuer: entry.issuer.clone(),
            account: entry.name.clone(),
            kind: entry.info.kind.as_str(),
            algorithm: entry.info.algorithm.as_str(),
            digits: entry.info.digits,
        }
    }
}
