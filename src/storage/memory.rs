use super::{DocumentStore, PageRequest, StorePage, WriteOutcome};
use crate::core::{CrudError, FIRST_VERSION, Record, RecordId, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

struct Slot<R> {
    /// Insertion sequence, used as the stable tie-breaker when paging.
    seq: u64,
    record: R,
}

struct Documents<R> {
    slots: HashMap<RecordId, Slot<R>>,
    next_seq: u64,
}

/// Process-local document store.
///
/// A single `RwLock` guards the collection; conditional writes take the write
/// lock for the whole read-compare-write so concurrent writers to one id are
/// serialized.
pub struct InMemoryDocumentStore<R> {
    documents: RwLock<Documents<R>>,
}

impl<R: Record> InMemoryDocumentStore<R> {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Documents {
                slots: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<R: Record> Default for InMemoryDocumentStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> DocumentStore<R> for InMemoryDocumentStore<R> {
    async fn find_by_id(&self, id: &RecordId) -> Result<Option<R>> {
        let documents = self.documents.read().await;
        Ok(documents.slots.get(id).map(|slot| slot.record.clone()))
    }

    async fn find_page(&self, request: PageRequest) -> Result<StorePage<R>> {
        let documents = self.documents.read().await;
        let mut ordered = documents.slots.values().collect::<Vec<_>>();
        ordered.sort_by(|left, right| {
            left.record
                .meta()
                .date_updated
                .cmp(&right.record.meta().date_updated)
                .then_with(|| left.seq.cmp(&right.seq))
        });

        let offset = request.offset();
        let items = ordered
            .iter()
            .skip(offset)
            .take(request.size)
            .map(|slot| slot.record.clone())
            .collect::<Vec<_>>();
        let has_next_page = ordered.len() > offset.saturating_add(request.size);

        Ok(StorePage {
            items,
            has_next_page,
        })
    }

    async fn insert(&self, mut record: R) -> Result<R> {
        let mut documents = self.documents.write().await;

        let id = record
            .meta_mut()
            .id
            .get_or_insert_with(RecordId::generate)
            .clone();
        if documents.slots.contains_key(&id) {
            return Err(CrudError::Precondition(format!(
                "Cannot insert record '{id}': id already exists"
            )));
        }
        record.meta_mut().version = Some(FIRST_VERSION);

        let seq = documents.next_seq;
        documents.next_seq += 1;
        documents.slots.insert(
            id,
            Slot {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn replace_if_version(
        &self,
        mut record: R,
        expected: Option<u64>,
    ) -> Result<WriteOutcome<R>> {
        let Some(id) = record.id().cloned() else {
            return Err(CrudError::Precondition(
                "Cannot perform update on null id".to_string(),
            ));
        };

        let mut documents = self.documents.write().await;
        let Some(slot) = documents.slots.get_mut(&id) else {
            return Ok(WriteOutcome::Missing);
        };

        let actual = slot.record.version();
        if actual != expected {
            return Ok(WriteOutcome::Conflict { actual });
        }

        record.meta_mut().version = Some(expected.map_or(FIRST_VERSION, |v| v + 1));
        slot.record = record.clone();
        Ok(WriteOutcome::Applied(record))
    }
}
