//! Document store abstraction consumed by the versioned repository.
//!
//! A store only has to offer lookups, sorted paging, plain inserts and one
//! atomic compare-and-swap write keyed by id and expected version. Everything
//! else about optimistic locking lives in [`crate::repository`].

pub mod memory;

pub use memory::InMemoryDocumentStore;

use crate::core::{Record, RecordId, Result};
use async_trait::async_trait;

/// Zero-based page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    pub fn offset(&self) -> usize {
        self.index.saturating_mul(self.size)
    }
}

/// One page of records as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StorePage<R> {
    pub items: Vec<R>,
    pub has_next_page: bool,
}

impl<R> StorePage<R> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_next_page: false,
        }
    }
}

/// Result of an atomic conditional write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<R> {
    /// The write landed; carries the stored record with its new version.
    Applied(R),
    /// No record is stored under the id.
    Missing,
    /// The stored version differs from the expected one.
    Conflict { actual: Option<u64> },
}

#[async_trait]
pub trait DocumentStore<R: Record>: Send + Sync + 'static {
    async fn find_by_id(&self, id: &RecordId) -> Result<Option<R>>;

    /// Returns records ordered by `date_updated` ascending (absent first),
    /// ties broken by insertion order.
    async fn find_page(&self, request: PageRequest) -> Result<StorePage<R>>;

    /// Inserts a new record, assigning an id when absent and the first version.
    async fn insert(&self, record: R) -> Result<R>;

    /// Atomically replaces the stored record when its version equals `expected`.
    ///
    /// Read, comparison and write form one critical section per id; on success
    /// the stored version becomes `expected + 1`.
    async fn replace_if_version(&self, record: R, expected: Option<u64>)
    -> Result<WriteOutcome<R>>;
}
