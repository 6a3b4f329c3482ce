#![forbid(unsafe_code)]

//! Element identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of `Id` attribute values for the signature elements.
pub trait IdGenerator: Send + Sync {
    /// Return a fresh identifier, valid as an XML `ID` (starts with a letter).
    fn next_id(&self) -> String;
}

/// `id-<uuid v4>`; collision-resistant across processes and threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        format!("id-{}", uuid::Uuid::new_v4())
    }
}

/// `<prefix>-1`, `<prefix>-2`, ... for reproducible output in tests and
/// fixtures. Unique only within one generator instance.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", self.prefix)
    }
}
