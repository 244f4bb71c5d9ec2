//! Integration tests for the async credential prompt driver

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use authvault_core::import::{
    ByteSource, Credential, CredentialPrompt, CredentialResponse, CredentialSlot,
    ImportCoordinator, ImportOutcome, MemorySink, SuspendedHandle, resolve_with_prompt,
};
use authvault_core::models::{ImportableEntry, OtpParams, OtpSecret, VaultEntry};
use authvault_core::vault::{KdfParams, MasterKey, PasswordSlot, Slot, Vault, VaultFile};
use secrecy::SecretString;

/// Replays canned answers and records every request
struct ScriptedPrompt {
    answers: Mutex<VecDeque<Option<&'static str>>>,
    requests: Mutex<Vec<(String, usize, u32)>>,
}

impl ScriptedPrompt {
    fn new(answers: &[Option<&'static str>]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn attempts(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|r| r.2).collect()
    }
}

#[async_trait]
impl CredentialPrompt for ScriptedPrompt {
    async fn collect(
        &self,
        format: &str,
        slots: &[CredentialSlot],
        attempt: u32,
    ) -> CredentialResponse {
        self.requests
            .lock()
            .unwrap()
            .push((format.to_string(), slots.len(), attempt));
        tokio::task::yield_now().await;
        match self.answers.lock().unwrap().pop_front().flatten() {
            Some(password) => CredentialResponse::Provided(Credential::password(password)),
            None => CredentialResponse::Cancelled,
        }
    }
}

fn encrypted_backup(password: &str, n: usize) -> Vec<u8> {
    let mut vault = Vault::new();
    for i in 0..n {
        vault.add_entry(VaultEntry::from_import(&ImportableEntry::new(
            "Prompted",
            format!("account{i}"),
            OtpSecret::from_bytes(vec![9; 16]),
            OtpParams::default(),
        )));
    }
    let key = MasterKey::generate().expect("Failed to generate key");
    let slot = PasswordSlot::create(&key, &SecretString::from(password), KdfParams::light())
        .expect("Failed to create slot");
    VaultFile::seal(&vault, &key, vec![Slot::Password(slot)])
        .and_then(|file| file.to_bytes())
        .expect("Failed to seal vault")
}

fn suspend(coordinator: &mut ImportCoordinator<MemorySink>, bytes: Vec<u8>) -> SuspendedHandle {
    coordinator
        .begin_import(ByteSource::from_bytes(bytes))
        .expect("Import refused")
        .into_handle()
        .expect("Encrypted backup should suspend")
}

#[tokio::test]
async fn retries_until_the_right_password() {
    let mut coordinator = ImportCoordinator::new(MemorySink::new());
    let handle = suspend(&mut coordinator, encrypted_backup("s3cret", 3));
    let prompt = ScriptedPrompt::new(&[Some("guess"), Some("another"), Some("s3cret")]);

    let outcome = resolve_with_prompt(&mut coordinator, &handle, &prompt)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::Success {
            format: "vault".to_string(),
            count: 3
        }
    );
    assert_eq!(prompt.attempts(), vec![1, 2, 3]);
    assert_eq!(prompt.requests.lock().unwrap()[0].0, "vault");
    assert_eq!(coordinator.sink().entries().len(), 3);
}

#[tokio::test]
async fn cancelling_leaves_the_import_suspended() {
    let mut coordinator = ImportCoordinator::new(MemorySink::new());
    let handle = suspend(&mut coordinator, encrypted_backup("pw", 2));
    let prompt = ScriptedPrompt::new(&[Some("wrong"), None]);

    let outcome = resolve_with_prompt(&mut coordinator, &handle, &prompt)
        .await
        .unwrap();

    assert_eq!(outcome, ImportOutcome::Cancelled);
    assert!(coordinator.has_pending());
    assert_eq!(coordinator.pending_attempts(&handle).unwrap(), 1);
    assert!(coordinator.sink().entries().is_empty());

    coordinator.abandon(&handle);
    assert!(!coordinator.has_pending());
}

#[tokio::test]
async fn thawed_import_keeps_counting_attempts() {
    let bytes = encrypted_backup("pw", 1);
    let mut first =
        ImportCoordinator::new(MemorySink::new()).with_max_credential_attempts(Some(3));
    let handle = suspend(&mut first, bytes);
    let early = ScriptedPrompt::new(&[Some("a"), Some("b"), None]);
    let outcome = resolve_with_prompt(&mut first, &handle, &early).await.unwrap();
    assert_eq!(outcome, ImportOutcome::Cancelled);
    assert_eq!(early.attempts(), vec![1, 2, 3]);

    let frozen = first.freeze(&handle).unwrap();
    assert_eq!(frozen.attempts, 2);

    let mut second =
        ImportCoordinator::new(MemorySink::new()).with_max_credential_attempts(Some(3));
    let restored = second.thaw(frozen).unwrap();
    let late = ScriptedPrompt::new(&[Some("c"), Some("pw")]);
    let outcome = resolve_with_prompt(&mut second, &restored, &late)
        .await
        .unwrap();

    assert_eq!(outcome, ImportOutcome::AttemptsExhausted { attempts: 3 });
    assert_eq!(late.attempts(), vec![3]);
    assert!(!second.has_pending());
}

#[tokio::test]
async fn attempt_limit_ends_the_loop() {
    let mut coordinator =
        ImportCoordinator::new(MemorySink::new()).with_max_credential_attempts(Some(2));
    let handle = suspend(&mut coordinator, encrypted_backup("pw", 1));
    let prompt = ScriptedPrompt::new(&[Some("a"), Some("b"), Some("pw")]);

    let outcome = resolve_with_prompt(&mut coordinator, &handle, &prompt)
        .await
        .unwrap();

    assert_eq!(outcome, ImportOutcome::AttemptsExhausted { attempts: 2 });
    assert_eq!(prompt.attempts(), vec![1, 2]);
}

#[tokio::test]
async fn stale_handle_is_an_error() {
    let mut coordinator = ImportCoordinator::new(MemorySink::new());
    let bytes = encrypted_backup("pw", 1);
    let stale = suspend(&mut coordinator, bytes.clone());
    coordinator.abandon(&stale);
    let _fresh = suspend(&mut coordinator, bytes);

    let prompt = ScriptedPrompt::new(&[Some("pw")]);
    assert!(resolve_with_prompt(&mut coordinator, &stale, &prompt).await.is_err());
}
