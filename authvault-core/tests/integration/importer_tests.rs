//! Integration tests for the built-in backup formats
//!
//! Fixtures are written to temporary directories and imported through the
//! default registry into a real vault file.

use std::fs;
use std::path::Path;

use authvault_core::config::ConfigManager;
use authvault_core::error::ImportError;
use authvault_core::import::{
    ByteSource, CandidateRegistry, Credential, DEFAULT_MAX_IMPORT_SIZE, ImportCoordinator,
    ImportOutcome, VaultMergeSink,
};
use authvault_core::models::{ImportableEntry, OtpKind, OtpParams, OtpSecret, VaultEntry};
use authvault_core::vault::{KdfParams, Vault, VaultStore};
use secrecy::SecretString;
use tempfile::TempDir;

const ANDOTP_JSON: &str = r#"[
  {"secret": "JBSWY3DPEHPK3PXP", "issuer": "GitHub", "label": "bob", "digits": 6,
   "type": "TOTP", "algorithm": "SHA1", "period": 30},
  {"secret": "GEZDGNBV", "label": "Example - alice", "digits": 6,
   "type": "HOTP", "algorithm": "SHA1", "counter": 3},
  {"secret": "MFRGG", "issuer": "Steam", "label": "gamer", "digits": 5,
   "type": "STEAM", "algorithm": "SHA1", "period": 30}
]"#;

const FREEOTP_XML: &str = r#"<?xml version='1.0' encoding='utf-8' standalone='yes' ?>
<map>
    <string name="tokenOrder">[&quot;Example:alice&quot;]</string>
    <string name="Example:alice">{&quot;algo&quot;:&quot;SHA1&quot;,&quot;digits&quot;:6,&quot;issuerExt&quot;:&quot;Example&quot;,&quot;label&quot;:&quot;alice&quot;,&quot;period&quot;:30,&quot;secret&quot;:[72,101,108,108,111],&quot;type&quot;:&quot;TOTP&quot;}</string>
</map>
"#;

const OTPAUTH_LIST: &str = "\
otpauth://totp/GitLab:carol?secret=JBSWY3DPEHPK3PXP&issuer=GitLab
otpauth://hotp/dave?secret=GEZDGNBV&counter=1
";

fn target_store(dir: &TempDir) -> VaultMergeSink {
    let (store, vault) = VaultStore::create_plain(dir.path().join("target.json"))
        .expect("Failed to create target vault");
    VaultMergeSink::new(store, vault)
}

fn write_fixture(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("Failed to write fixture");
    path
}

fn import_file(coordinator: &mut ImportCoordinator<VaultMergeSink>, path: &Path) -> ImportOutcome {
    let source = ByteSource::from_path(path, DEFAULT_MAX_IMPORT_SIZE).expect("Failed to read fixture");
    match coordinator.begin_import(source).expect("Import refused") {
        authvault_core::import::ImportProgress::Finished(outcome) => outcome,
        authvault_core::import::ImportProgress::Suspended(handle) => {
            panic!("unexpected suspension for {}", handle.format_id())
        }
    }
}

fn reopen(path: &Path) -> Vault {
    VaultStore::open(path, None).expect("Failed to reopen vault").1
}

/// Writes an encrypted vault with `n` entries and returns its path
fn encrypted_backup(dir: &TempDir, password: &str, n: usize) -> std::path::PathBuf {
    let path = dir.path().join("backup.json");
    let (store, mut vault) =
        VaultStore::create_encrypted(&path, &SecretString::from(password), KdfParams::light())
            .expect("Failed to create encrypted vault");
    for i in 0..n {
        vault.add_entry(VaultEntry::from_import(&ImportableEntry::new(
            "Backup",
            format!("user{i}@example.com"),
            OtpSecret::from_bytes(vec![0x42; 20]),
            OtpParams::default(),
        )));
    }
    store.save(&vault).expect("Failed to save encrypted vault");
    path
}

// ============================================================================
// Plaintext formats
// ============================================================================

#[test]
fn test_andotp_import_into_vault() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let fixture = write_fixture(&dir, "andotp.json", ANDOTP_JSON.as_bytes());
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    let outcome = import_file(&mut coordinator, &fixture);
    assert_eq!(
        outcome,
        ImportOutcome::Success {
            format: "andotp".to_string(),
            count: 3
        }
    );

    let vault = reopen(&dir.path().join("target.json"));
    assert_eq!(vault.len(), 3);
    assert_eq!(vault.entries[1].issuer, "Example");
    assert_eq!(vault.entries[1].name, "alice");
    assert_eq!(vault.entries[1].info.kind, OtpKind::Hotp { counter: 3 });
    assert_eq!(vault.entries[2].info.kind, OtpKind::Steam { period: 30 });
}

#[test]
fn test_freeotp_import() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let fixture = write_fixture(&dir, "tokens.xml", FREEOTP_XML.as_bytes());
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    let outcome = import_file(&mut coordinator, &fixture);
    assert_eq!(outcome.merged_count(), 1);
    let entry = &coordinator.sink().vault().entries[0];
    assert_eq!(entry.issuer, "Example");
    assert_eq!(entry.secret.as_bytes(), b"Hello");
}

#[test]
fn test_otpauth_list_import() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let fixture = write_fixture(&dir, "uris.txt", OTPAUTH_LIST.as_bytes());
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    assert_eq!(
        import_file(&mut coordinator, &fixture),
        ImportOutcome::Success {
            format: "otpauth".to_string(),
            count: 2
        }
    );
}

#[test]
fn test_plain_vault_backup_import() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let backup_path = dir.path().join("backup.json");
    let (store, mut vault) = VaultStore::create_plain(&backup_path).unwrap();
    vault.add_entry(VaultEntry::from_import(&ImportableEntry::new(
        "Plain",
        "one",
        OtpSecret::from_bytes(vec![1; 10]),
        OtpParams::default(),
    )));
    store.save(&vault).unwrap();

    let mut coordinator = ImportCoordinator::new(target_store(&dir));
    assert_eq!(
        import_file(&mut coordinator, &backup_path),
        ImportOutcome::Success {
            format: "vault".to_string(),
            count: 1
        }
    );
}

#[test]
fn test_duplicates_are_kept() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let fixture = write_fixture(&dir, "andotp.json", ANDOTP_JSON.as_bytes());
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    import_file(&mut coordinator, &fixture);
    import_file(&mut coordinator, &fixture);

    let (_, vault) = coordinator.into_sink().into_parts();
    assert_eq!(vault.len(), 6);
    assert_eq!(reopen(&dir.path().join("target.json")).len(), 6);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unknown_bytes_report_every_format() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let fixture = write_fixture(&dir, "random.bin", &[0xff, 0x00, 0x13, 0x37, 0xfe]);
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    let outcome = import_file(&mut coordinator, &fixture);
    let ImportOutcome::NoFormatMatched { failures } = &outcome else {
        panic!("expected NoFormatMatched, got {outcome}");
    };
    let ids: Vec<&str> = failures.iter().map(|f| f.format_id.as_str()).collect();
    assert_eq!(ids, CandidateRegistry::with_defaults().format_ids());
    assert!(coordinator.sink().vault().is_empty());
}

#[test]
fn test_broken_vault_is_a_parse_failure() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let fixture = write_fixture(
        &dir,
        "broken.json",
        br#"{"version": 1, "header": {"slots": null, "params": null}, "db": 17}"#,
    );
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    let outcome = import_file(&mut coordinator, &fixture);
    let ImportOutcome::ParseFailed { failures } = &outcome else {
        panic!("expected ParseFailed, got {outcome}");
    };
    assert_eq!(failures[0].format_id, "vault");
    assert!(failures[0].error.is_malformed());
    assert_eq!(failures.len(), 4);
}

#[test]
fn test_bad_andotp_secret_fails_conversion() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let fixture = write_fixture(&dir, "bad.json", br######"[{"secret": "#####"}]"######);
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    assert!(matches!(
        import_file(&mut coordinator, &fixture),
        ImportOutcome::ConversionFailed { ref format, .. } if format == "andotp"
    ));
    assert!(coordinator.sink().vault().is_empty());
}

#[test]
fn test_missing_and_oversized_files() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    assert!(matches!(
        ByteSource::from_path(&dir.path().join("missing.json"), DEFAULT_MAX_IMPORT_SIZE),
        Err(ImportError::FileNotFound(_))
    ));

    let fixture = write_fixture(&dir, "big.txt", &[b'x'; 64]);
    assert!(matches!(
        ByteSource::from_path(&fixture, 16),
        Err(ImportError::FileTooLarge { size: 64, limit: 16 })
    ));
}

// ============================================================================
// Encrypted vault backups
// ============================================================================

#[test]
fn test_encrypted_vault_end_to_end() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let backup = encrypted_backup(&dir, "correct horse", 4);
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    let source = ByteSource::from_path(&backup, DEFAULT_MAX_IMPORT_SIZE).unwrap();
    let handle = coordinator
        .begin_import(source)
        .unwrap()
        .into_handle()
        .expect("encrypted vault should suspend");
    assert_eq!(handle.format_id(), "vault");
    assert_eq!(handle.slots().len(), 1);
    assert!(coordinator.sink().vault().is_empty());

    assert!(matches!(
        coordinator
            .resume(&handle, Credential::password("battery staple"))
            .unwrap(),
        ImportOutcome::CredentialRejected { attempts: 1, .. }
    ));
    assert!(coordinator.sink().vault().is_empty());

    assert_eq!(
        coordinator
            .resume(&handle, Credential::password("correct horse"))
            .unwrap(),
        ImportOutcome::Success {
            format: "vault".to_string(),
            count: 4
        }
    );
    assert_eq!(reopen(&dir.path().join("target.json")).len(), 4);
}

#[test]
fn test_deferred_import_survives_restart() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let backup = encrypted_backup(&dir, "pw", 2);
    let config = ConfigManager::with_config_dir(dir.path().join("config"));

    let id = {
        let mut coordinator = ImportCoordinator::new(target_store(&dir));
        let source = ByteSource::from_path(&backup, DEFAULT_MAX_IMPORT_SIZE).unwrap();
        let handle = coordinator.begin_import(source).unwrap().into_handle().unwrap();
        let frozen = coordinator.freeze(&handle).unwrap();
        config.save_pending(&frozen).unwrap();
        handle.id()
    };

    let listed = config.list_pending().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);

    let (store, vault) = VaultStore::open(dir.path().join("target.json"), None).unwrap();
    let mut coordinator = ImportCoordinator::new(VaultMergeSink::new(store, vault));
    let handle = coordinator.thaw(config.load_pending(id).unwrap()).unwrap();
    assert_eq!(handle.id(), id);

    let outcome = coordinator
        .resume(&handle, Credential::password("pw"))
        .unwrap();
    assert_eq!(outcome.merged_count(), 2);
    assert!(config.remove_pending(id).unwrap());
    assert!(config.list_pending().unwrap().is_empty());
}

#[test]
fn test_thaw_rejects_tampered_payload() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let backup = encrypted_backup(&dir, "pw", 1);
    let mut coordinator = ImportCoordinator::new(target_store(&dir));

    let source = ByteSource::from_path(&backup, DEFAULT_MAX_IMPORT_SIZE).unwrap();
    let handle = coordinator.begin_import(source).unwrap().into_handle().unwrap();
    let mut frozen = coordinator.freeze(&handle).unwrap();
    frozen.payload = hex::encode(b"not a vault");

    assert!(matches!(
        coordinator.thaw(frozen),
        Err(ImportError::CorruptPending { .. })
    ));
    assert!(!coordinator.has_pending());
}
