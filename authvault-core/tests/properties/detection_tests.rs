//! Property-based tests for format detection
//!
//! Detection must hand every candidate the same bytes no matter what the
//! earlier candidates consumed, and must account for every failed trial.

use std::io::Read;
use std::sync::{Arc, Mutex};

use authvault_core::import::{
    ByteSource, CandidateRegistry, ConversionError, FormatCandidate, FormatParseError,
    ImportCoordinator, ImportOutcome, ImportProgress, MemorySink, OtpAuthCandidate, Parsed,
};
use authvault_core::models::ImportableEntry;
use proptest::prelude::*;

type Seen = Arc<Mutex<Vec<Vec<u8>>>>;

/// Consumes part of the source and always fails
struct Greedy {
    take: usize,
    seen: Seen,
}

impl FormatCandidate for Greedy {
    fn format_id(&self) -> &str {
        "greedy"
    }

    fn display_name(&self) -> &str {
        "Greedy"
    }

    fn parse(&mut self, source: &mut ByteSource) -> Result<Parsed, FormatParseError> {
        let start = source.position();
        self.seen
            .lock()
            .unwrap()
            .push(source.as_bytes()[start..].to_vec());
        let mut buf = vec![0u8; self.take];
        let _ = source.read(&mut buf);
        if self.take % 2 == 0 {
            Err(FormatParseError::not_recognized("never matches"))
        } else {
            Err(FormatParseError::malformed("looked close"))
        }
    }

    fn is_encrypted(&self) -> bool {
        false
    }

    fn convert(&self) -> Result<Vec<ImportableEntry>, ConversionError> {
        Err(ConversionError::NotParsed)
    }

    fn discard(&mut self) {}
}

fn greedy_registry(takes: &[usize], seen: &Seen) -> CandidateRegistry {
    let mut registry = CandidateRegistry::new();
    for (i, &take) in takes.iter().enumerate() {
        let seen = Arc::clone(seen);
        registry.register(format!("greedy-{i}"), move || {
            Box::new(Greedy {
                take,
                seen: Arc::clone(&seen),
            }) as Box<dyn FormatCandidate>
        });
    }
    registry
}

fn otpauth_line() -> impl Strategy<Value = String> {
    ("[A-Za-z]{1,12}", "[a-z0-9]{1,12}", "[A-Z2-7]{8,32}").prop_map(|(issuer, account, secret)| {
        format!("otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: every trial starts at the first byte
    #[test]
    fn prop_trials_see_identical_bytes(
        bytes in prop::collection::vec(any::<u8>(), 0..512),
        takes in prop::collection::vec(0usize..64, 1..6),
    ) {
        let seen = Seen::default();
        let mut coordinator =
            ImportCoordinator::with_registry(greedy_registry(&takes, &seen), MemorySink::new());

        let progress = coordinator.begin_import(ByteSource::from_bytes(bytes.clone())).unwrap();

        let seen = seen.lock().unwrap();
        prop_assert_eq!(seen.len(), takes.len());
        for trial in seen.iter() {
            prop_assert_eq!(trial, &bytes);
        }
        prop_assert!(progress.outcome().is_some());
    }

    /// Property: exhaustion reports one failure per candidate, in order,
    /// and is classified by whether any candidate saw a malformed input
    #[test]
    fn prop_failures_follow_registry_order(
        takes in prop::collection::vec(0usize..64, 1..8),
    ) {
        let seen = Seen::default();
        let mut coordinator =
            ImportCoordinator::with_registry(greedy_registry(&takes, &seen), MemorySink::new());

        let progress = coordinator.begin_import(ByteSource::from_bytes(b"input".to_vec())).unwrap();
        let outcome = progress.outcome().unwrap();
        let failures = outcome.failures();

        prop_assert_eq!(failures.len(), takes.len());
        for (i, failure) in failures.iter().enumerate() {
            prop_assert_eq!(&failure.format_id, "greedy");
            prop_assert_eq!(failure.error.is_malformed(), takes[i] % 2 == 1);
        }
        let any_malformed = takes.iter().any(|t| t % 2 == 1);
        prop_assert_eq!(matches!(outcome, ImportOutcome::ParseFailed { .. }), any_malformed);
        prop_assert!(coordinator.sink().entries().is_empty());
    }

    /// Property: arbitrary bytes never suspend or merge through the
    /// default formats unless they parse
    #[test]
    fn prop_default_registry_handles_arbitrary_bytes(
        bytes in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut coordinator = ImportCoordinator::new(MemorySink::new());
        let progress = coordinator.begin_import(ByteSource::from_bytes(bytes)).unwrap();

        match progress {
            ImportProgress::Finished(ImportOutcome::Success { count, .. }) => {
                prop_assert_eq!(coordinator.sink().entries().len(), count);
            }
            ImportProgress::Finished(_) => {
                prop_assert!(coordinator.sink().entries().is_empty());
            }
            ImportProgress::Suspended(handle) => {
                prop_assert!(coordinator.has_pending());
                coordinator.abandon(&handle);
            }
        }
    }

    /// Property: a URI list imports one entry per line
    #[test]
    fn prop_otpauth_count_matches_lines(lines in prop::collection::vec(otpauth_line(), 1..20)) {
        let text = lines.join("\n");
        let mut coordinator = ImportCoordinator::new(MemorySink::new());

        let progress = coordinator
            .begin_import(ByteSource::from_bytes(text.into_bytes()))
            .unwrap();

        prop_assert_eq!(
            progress.outcome(),
            Some(&ImportOutcome::Success { format: "otpauth".to_string(), count: lines.len() })
        );
    }

    /// Property: converting a parsed candidate twice yields the same entries
    #[test]
    fn prop_convert_is_idempotent(lines in prop::collection::vec(otpauth_line(), 1..10)) {
        let mut candidate = OtpAuthCandidate::new();
        let mut source = ByteSource::from_bytes(lines.join("\n").into_bytes());
        candidate.parse(&mut source).unwrap();

        let first = candidate.convert().unwrap();
        let second = candidate.convert().unwrap();
        prop_assert_eq!(first, second);
    }
}
