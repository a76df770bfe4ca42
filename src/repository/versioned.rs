use super::batch::BatchDispatch;
use crate::core::{CrudError, Record, RecordId, Result};
use crate::storage::{DocumentStore, PageRequest, StorePage, WriteOutcome};
use futures::stream::{self, BoxStream, StreamExt};
use log::debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// Store-facing component enforcing optimistic concurrency on records.
///
/// Every write to an existing record goes through the store's conditional
/// write, so the version comparison always happens against the value stored
/// at commit time rather than against whatever the caller read earlier.
pub struct VersionedRepository<R, S> {
    store: Arc<S>,
    _record: PhantomData<fn() -> R>,
}

impl<R, S> Clone for VersionedRepository<R, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<R, S> VersionedRepository<R, S>
where
    R: Record,
    S: DocumentStore<R>,
{
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn find_by_id(&self, id: &RecordId) -> Result<Option<R>> {
        self.store.find_by_id(id).await
    }

    /// Loads page `index` (zero-based) of `size` records.
    pub async fn find_page(&self, index: usize, size: usize) -> Result<StorePage<R>> {
        if size == 0 {
            return Err(CrudError::Precondition(
                "Page size must be greater than zero".to_string(),
            ));
        }
        self.store.find_page(PageRequest::new(index, size)).await
    }

    /// Streams every stored record, fetching `page_size` records at a time.
    ///
    /// Pages are pulled lazily as the stream is polled; calling again starts
    /// over from the first page.
    pub fn stream_all(&self, page_size: usize) -> BoxStream<'static, Result<R>> {
        let store = Arc::clone(&self.store);
        let page_size = page_size.max(1);

        stream::try_unfold(Some(0usize), move |next_index| {
            let store = Arc::clone(&store);
            async move {
                let Some(index) = next_index else {
                    return Ok::<_, CrudError>(None);
                };
                let page = store.find_page(PageRequest::new(index, page_size)).await?;
                let next = page.has_next_page.then_some(index + 1);
                let items = stream::iter(page.items.into_iter().map(Ok::<R, CrudError>));
                Ok(Some((items, next)))
            }
        })
        .map(|page| match page {
            Ok(items) => items.boxed(),
            Err(err) => stream::once(async move { Err(err) }).boxed(),
        })
        .flatten()
        .boxed()
    }

    /// Inserts a new record; the store assigns the id and first version.
    pub async fn persist(&self, record: R) -> Result<R> {
        let inserted = self.store.insert(record).await?;
        debug!(
            "Inserted record {} at version {:?}",
            inserted.id().map(RecordId::as_str).unwrap_or_default(),
            inserted.version()
        );
        Ok(inserted)
    }

    /// Writes `record` over the stored one if their versions match.
    ///
    /// Fails with `Precondition` when the id is unset, `NotFound` when nothing
    /// is stored under the id and `VersionConflict` when another writer got
    /// there first.
    pub async fn update(&self, record: R) -> Result<R> {
        let Some(id) = record.id().cloned() else {
            return Err(CrudError::Precondition(
                "Cannot perform update on null id".to_string(),
            ));
        };

        let expected = record.version();
        match self.store.replace_if_version(record, expected).await? {
            WriteOutcome::Applied(stored) => {
                debug!(
                    "Updated record {} to version {:?}",
                    id,
                    stored.version()
                );
                Ok(stored)
            }
            WriteOutcome::Missing => Err(CrudError::not_found(&id)),
            WriteOutcome::Conflict { actual } => Err(CrudError::VersionConflict {
                id: id.to_string(),
                expected,
                actual,
            }),
        }
    }

    /// Inserts when the id is unset, otherwise behaves exactly like [`Self::update`].
    pub async fn persist_or_update(&self, record: R) -> Result<R> {
        if record.id().is_some() {
            self.update(record).await
        } else {
            self.persist(record).await
        }
    }

    /// Dispatches one independent [`Self::update`] per record.
    ///
    /// Returns as soon as every write is spawned; one element failing never
    /// stops the others. Must be called inside a tokio runtime.
    pub fn update_all<I>(&self, records: I) -> BatchDispatch<R>
    where
        I: IntoIterator<Item = R>,
    {
        self.dispatch_each(records, |repo, record| async move { repo.update(record).await })
    }

    /// Dispatches one independent [`Self::persist_or_update`] per record.
    pub fn persist_or_update_all<I>(&self, records: I) -> BatchDispatch<R>
    where
        I: IntoIterator<Item = R>,
    {
        self.dispatch_each(records, |repo, record| async move {
            repo.persist_or_update(record).await
        })
    }

    fn dispatch_each<I, F, Fut>(&self, records: I, write: F) -> BatchDispatch<R>
    where
        I: IntoIterator<Item = R>,
        F: Fn(Self, R) -> Fut,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let handles = records
            .into_iter()
            .map(|record| tokio::spawn(write(self.clone(), record)))
            .collect::<Vec<_>>();
        debug!("Dispatched {} batch writes", handles.len());
        BatchDispatch::new(handles)
    }
}
