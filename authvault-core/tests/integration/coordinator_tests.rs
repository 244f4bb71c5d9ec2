//! Integration tests for the import coordinator state machine
//!
//! Uses a scripted candidate that accepts inputs starting with a fixed
//! prefix and produces one entry per following line, so detection order,
//! suspension and merging can be observed without real backup formats.

use std::sync::{Arc, Mutex};

use authvault_core::error::ImportError;
use authvault_core::import::{
    ByteSource, CandidateRegistry, ConversionError, Credential, CredentialRejected,
    CredentialSlot, FormatCandidate, FormatParseError, ImportCoordinator, ImportOutcome,
    ImportProgress, MemorySink, MergeError, MergeSink, Parsed,
};
use authvault_core::models::{ImportableEntry, OtpParams, OtpSecret};
use secrecy::ExposeSecret;
use uuid::Uuid;

type Trials = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

/// Accepts inputs starting with `prefix`; one entry per remaining line
struct Scripted {
    id: &'static str,
    prefix: &'static str,
    password: Option<&'static str>,
    trials: Trials,
    lines: Option<Vec<String>>,
    unlocked: bool,
}

impl FormatCandidate for Scripted {
    fn format_id(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        self.id
    }

    fn parse(&mut self, source: &mut ByteSource) -> Result<Parsed, FormatParseError> {
        let bytes = source.read_remaining().to_vec();
        self.trials
            .lock()
            .unwrap()
            .push((self.id.to_string(), bytes.clone()));

        let text = String::from_utf8(bytes).map_err(|_| FormatParseError::not_recognized("binary"))?;
        let body = text
            .strip_prefix(self.prefix)
            .ok_or_else(|| FormatParseError::not_recognized(format!("no {} prefix", self.prefix)))?;
        self.lines = Some(body.lines().filter(|l| !l.is_empty()).map(String::from).collect());
        Ok(Parsed {
            encrypted: self.password.is_some(),
        })
    }

    fn is_encrypted(&self) -> bool {
        self.password.is_some()
    }

    fn convert(&self) -> Result<Vec<ImportableEntry>, ConversionError> {
        if self.password.is_some() && !self.unlocked {
            return Err(ConversionError::Locked);
        }
        let lines = self.lines.as_ref().ok_or(ConversionError::NotParsed)?;
        Ok(lines
            .iter()
            .map(|line| {
                ImportableEntry::new(
                    self.id,
                    line.clone(),
                    OtpSecret::from_bytes(line.as_bytes().to_vec()),
                    OtpParams::default(),
                )
            })
            .collect())
    }

    fn supply_credential(&mut self, credential: &Credential) -> Result<(), CredentialRejected> {
        match (self.password, credential) {
            (Some(expected), Credential::Password(given)) if given.expose_secret() == expected => {
                self.unlocked = true;
                Ok(())
            }
            _ => Err(CredentialRejected::new("wrong password")),
        }
    }

    fn credential_slots(&self) -> Vec<CredentialSlot> {
        vec![CredentialSlot::password(Uuid::nil())]
    }

    fn discard(&mut self) {
        self.lines = None;
    }
}

fn registry(specs: &[(&'static str, &'static str, Option<&'static str>)], trials: &Trials) -> CandidateRegistry {
    let mut registry = CandidateRegistry::new();
    for &(id, prefix, password) in specs {
        let trials = Arc::clone(trials);
        registry.register(id, move || {
            Box::new(Scripted {
                id,
                prefix,
                password,
                trials: Arc::clone(&trials),
                lines: None,
                unlocked: false,
            }) as Box<dyn FormatCandidate>
        });
    }
    registry
}

fn source(text: &str) -> ByteSource {
    ByteSource::from_bytes(text.as_bytes().to_vec())
}

fn tried(trials: &Trials) -> Vec<String> {
    trials.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
}

/// Sink that always fails
struct BrokenSink;

impl MergeSink for BrokenSink {
    fn merge(&mut self, _entries: &[ImportableEntry]) -> Result<(), MergeError> {
        Err(MergeError::Rejected("disk full".to_string()))
    }
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn test_second_of_three_candidates_matches() {
    let trials = Trials::default();
    let registry = registry(
        &[("first", "A:", None), ("second", "B:", None), ("third", "", None)],
        &trials,
    );
    let mut coordinator = ImportCoordinator::with_registry(registry, MemorySink::new());

    let progress = coordinator
        .begin_import(source("B:\none\ntwo\nthree\n"))
        .unwrap();

    assert_eq!(
        progress.outcome(),
        Some(&ImportOutcome::Success {
            format: "second".to_string(),
            count: 3
        })
    );
    assert_eq!(tried(&trials), vec!["first", "second"]);
    assert_eq!(coordinator.sink().entries().len(), 3);
    assert_eq!(coordinator.sink().batches(), 1);
}

#[test]
fn test_every_trial_sees_the_whole_input() {
    let trials = Trials::default();
    let registry = registry(
        &[("a", "x", None), ("b", "y", None), ("c", "z", None)],
        &trials,
    );
    let mut coordinator = ImportCoordinator::with_registry(registry, MemorySink::new());
    let input = "not matching anything\nat all";

    coordinator.begin_import(source(input)).unwrap();

    let trials = trials.lock().unwrap();
    assert_eq!(trials.len(), 3);
    for (_, seen) in trials.iter() {
        assert_eq!(seen.as_slice(), input.as_bytes());
    }
}

#[test]
fn test_no_match_reports_failures_in_registry_order() {
    let trials = Trials::default();
    let registry = registry(
        &[("a", "x", None), ("b", "y", None), ("c", "z", None)],
        &trials,
    );
    let mut coordinator = ImportCoordinator::with_registry(registry, MemorySink::new());

    let progress = coordinator.begin_import(source("nothing")).unwrap();
    let Some(ImportOutcome::NoFormatMatched { failures }) = progress.outcome() else {
        panic!("expected NoFormatMatched, got {progress:?}");
    };

    let ids: Vec<&str> = failures.iter().map(|f| f.format_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(failures.iter().all(|f| !f.error.is_malformed()));
    assert!(coordinator.sink().entries().is_empty());
}

#[test]
fn test_empty_registry_reports_no_match() {
    let mut coordinator =
        ImportCoordinator::with_registry(CandidateRegistry::new(), MemorySink::new());
    let progress = coordinator.begin_import(source("anything")).unwrap();
    assert_eq!(
        progress.outcome(),
        Some(&ImportOutcome::NoFormatMatched {
            failures: Vec::new()
        })
    );
}

// ============================================================================
// Suspension
// ============================================================================

#[test]
fn test_encrypted_match_suspends_without_merging() {
    let trials = Trials::default();
    let registry = registry(
        &[("locked", "LOCK", Some("hunter2")), ("plain", "", None)],
        &trials,
    );
    let mut coordinator = ImportCoordinator::with_registry(registry, MemorySink::new());

    let handle = coordinator
        .begin_import(source("LOCK\na\nb\n"))
        .unwrap()
        .into_handle()
        .expect("import should suspend");

    assert_eq!(handle.format_id(), "locked");
    assert_eq!(handle.slots().len(), 1);
    assert_eq!(tried(&trials), vec!["locked"]);
    assert!(coordinator.has_pending());
    assert!(coordinator.sink().entries().is_empty());

    let rejected = coordinator
        .resume(&handle, Credential::password("wrong"))
        .unwrap();
    assert_eq!(
        rejected,
        ImportOutcome::CredentialRejected {
            attempts: 1,
            remaining: None
        }
    );
    assert!(coordinator.sink().entries().is_empty());

    let done = coordinator
        .resume(&handle, Credential::password("hunter2"))
        .unwrap();
    assert_eq!(
        done,
        ImportOutcome::Success {
            format: "locked".to_string(),
            count: 2
        }
    );
    assert!(!coordinator.has_pending());

    assert!(matches!(
        coordinator.resume(&handle, Credential::password("hunter2")),
        Err(ImportError::InvalidHandle(_))
    ));
}

#[test]
fn test_second_import_is_refused_while_suspended() {
    let trials = Trials::default();
    let registry = registry(&[("locked", "LOCK", Some("pw"))], &trials);
    let mut coordinator = ImportCoordinator::with_registry(registry, MemorySink::new());

    let handle = coordinator
        .begin_import(source("LOCK\na"))
        .unwrap()
        .into_handle()
        .unwrap();

    match coordinator.begin_import(source("LOCK\nb")) {
        Err(ImportError::ImportPending(id)) => assert_eq!(id, handle.id()),
        other => panic!("expected ImportPending, got {other:?}"),
    }

    coordinator.abandon(&handle);
    assert!(coordinator.begin_import(source("LOCK\nb")).is_ok());
}

#[test]
fn test_abandon_invalidates_handle_and_merges_nothing() {
    let trials = Trials::default();
    let registry = registry(&[("locked", "LOCK", Some("pw"))], &trials);
    let mut coordinator = ImportCoordinator::with_registry(registry, MemorySink::new());

    let handle = coordinator
        .begin_import(source("LOCK\na\nb"))
        .unwrap()
        .into_handle()
        .unwrap();

    coordinator.abandon(&handle);
    coordinator.abandon(&handle);

    assert!(!coordinator.has_pending());
    assert!(matches!(
        coordinator.resume(&handle, Credential::password("pw")),
        Err(ImportError::InvalidHandle(_))
    ));
    assert!(coordinator.freeze(&handle).is_err());
    assert!(coordinator.pending_slots(&handle).is_err());
    assert_eq!(coordinator.sink().batches(), 0);
}

#[test]
fn test_attempt_limit_discards_import() {
    let trials = Trials::default();
    let registry = registry(&[("locked", "LOCK", Some("pw"))], &trials);
    let mut coordinator = ImportCoordinator::with_registry(registry, MemorySink::new())
        .with_max_credential_attempts(Some(2));

    let handle = coordinator
        .begin_import(source("LOCK\na"))
        .unwrap()
        .into_handle()
        .unwrap();

    assert_eq!(
        coordinator.resume(&handle, Credential::password("x")).unwrap(),
        ImportOutcome::CredentialRejected {
            attempts: 1,
            remaining: Some(1)
        }
    );
    assert_eq!(
        coordinator.resume(&handle, Credential::password("y")).unwrap(),
        ImportOutcome::AttemptsExhausted { attempts: 2 }
    );
    assert!(!coordinator.has_pending());
    assert!(coordinator.resume(&handle, Credential::password("pw")).is_err());
}

// ============================================================================
// Freeze / thaw
// ============================================================================

#[test]
fn test_frozen_import_resumes_in_another_coordinator() {
    let trials = Trials::default();
    let specs = [("locked", "LOCK", Some("pw")), ("plain", "", None)];

    let mut first = ImportCoordinator::with_registry(registry(&specs, &trials), MemorySink::new());
    let handle = first
        .begin_import(source("LOCK\na\nb\nc"))
        .unwrap()
        .into_handle()
        .unwrap();
    first.resume(&handle, Credential::password("nope")).unwrap();

    let frozen = first.freeze(&handle).unwrap();
    assert!(!first.has_pending());
    drop(first);

    let json = serde_json::to_string(&frozen).unwrap();
    let restored: authvault_core::import::FrozenImport = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, frozen);

    let mut second = ImportCoordinator::with_registry(registry(&specs, &trials), MemorySink::new())
        .with_max_credential_attempts(Some(2));
    let thawed = second.thaw(restored).unwrap();
    assert_eq!(thawed.id(), handle.id());
    assert_eq!(thawed.format_id(), "locked");

    // the earlier rejection carries over
    assert_eq!(
        second.resume(&thawed, Credential::password("nope")).unwrap(),
        ImportOutcome::AttemptsExhausted { attempts: 2 }
    );
}

#[test]
fn test_thaw_then_success() {
    let trials = Trials::default();
    let specs = [("locked", "LOCK", Some("pw"))];

    let mut first = ImportCoordinator::with_registry(registry(&specs, &trials), MemorySink::new());
    let handle = first
        .begin_import(source("LOCK\na\nb"))
        .unwrap()
        .into_handle()
        .unwrap();
    let frozen = first.freeze(&handle).unwrap();

    let mut second = ImportCoordinator::with_registry(registry(&specs, &trials), MemorySink::new());
    let thawed = second.thaw(frozen).unwrap();
    assert_eq!(
        second.resume(&thawed, Credential::password("pw")).unwrap(),
        ImportOutcome::Success {
            format: "locked".to_string(),
            count: 2
        }
    );
    assert_eq!(second.into_sink().entries().len(), 2);
}

#[test]
fn test_thaw_with_unregistered_format() {
    let trials = Trials::default();
    let mut first = ImportCoordinator::with_registry(
        registry(&[("locked", "LOCK", Some("pw"))], &trials),
        MemorySink::new(),
    );
    let handle = first
        .begin_import(source("LOCK\na"))
        .unwrap()
        .into_handle()
        .unwrap();
    let frozen = first.freeze(&handle).unwrap();

    let mut other = ImportCoordinator::with_registry(
        registry(&[("plain", "", None)], &trials),
        MemorySink::new(),
    );
    assert!(matches!(
        other.thaw(frozen),
        Err(ImportError::UnknownFormat(format)) if format == "locked"
    ));
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merge_failure_is_reported() {
    let trials = Trials::default();
    let registry = registry(&[("plain", "", None)], &trials);
    let mut coordinator = ImportCoordinator::with_registry(registry, BrokenSink);

    let progress = coordinator.begin_import(source("a\nb")).unwrap();
    assert!(matches!(
        progress,
        ImportProgress::Finished(ImportOutcome::MergeFailed { ref reason }) if reason.contains("disk full")
    ));
    assert!(!coordinator.has_pending());
}
