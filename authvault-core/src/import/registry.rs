//! Ordered list of backup formats to try.
//!
//! Order is priority: formats with strict, unambiguous signatures come
//! before formats that could accept arbitrary text.

use super::andotp::AndOtpCandidate;
use super::freeotp::FreeOtpCandidate;
use super::native::VaultCandidate;
use super::otpauth::OtpAuthCandidate;
use super::source::ByteSource;
use super::traits::FormatCandidate;

type CandidateFactory = Box<dyn Fn() -> Box<dyn FormatCandidate> + Send + Sync>;

struct Registration {
    id: String,
    factory: CandidateFactory,
}

/// Builds fresh format candidates in priority order
pub struct CandidateRegistry {
    formats: Vec<Registration>,
}

impl CandidateRegistry {
    /// Creates an empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Creates a registry with every built-in format
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(VaultCandidate::FORMAT_ID, || {
            Box::new(VaultCandidate::new())
        });
        registry.register(FreeOtpCandidate::FORMAT_ID, || {
            Box::new(FreeOtpCandidate::new())
        });
        registry.register(AndOtpCandidate::FORMAT_ID, || {
            Box::new(AndOtpCandidate::new())
        });
        registry.register(OtpAuthCandidate::FORMAT_ID, || {
            Box::new(OtpAuthCandidate::new())
        });
        registry
    }

    /// Appends a format at the lowest priority.
    ///
    /// Registering an id twice replaces the earlier factory in place.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn FormatCandidate> + Send + Sync + 'static,
    {
        let id = id.into();
        let factory: CandidateFactory = Box::new(factory);
        if let Some(existing) = self.formats.iter_mut().find(|r| r.id == id) {
            existing.factory = factory;
        } else {
            self.formats.push(Registration { id, factory });
        }
    }

    /// Builds one candidate per registered format, in order.
    ///
    /// The source is not read; it is only part of the contract so that a
    /// registry may filter by cheap properties such as emptiness.
    #[must_use]
    pub fn candidates_for(&self, source: &ByteSource) -> Vec<Box<dyn FormatCandidate>> {
        tracing::trace!(size = source.len(), formats = self.formats.len(), "Building candidates");
        self.formats.iter().map(|r| (r.factory)()).collect()
    }

    /// Builds the candidate registered under `id`
    #[must_use]
    pub fn create(&self, id: &str) -> Option<Box<dyn FormatCandidate>> {
        self.formats
            .iter()
            .find(|r| r.id == id)
            .map(|r| (r.factory)())
    }

    /// Registered format identifiers in priority order
    #[must_use]
    pub fn format_ids(&self) -> Vec<&str> {
        self.formats.iter().map(|r| r.id.as_str()).collect()
    }

    /// Number of registered formats
    #[must_use]
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Returns true if no formats are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl Default for CandidateRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for CandidateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateRegistry")
            .field("formats", &self.format_ids())
            .finish()
    }
}
