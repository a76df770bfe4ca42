use super::mapper::RecordMapper;
use crate::core::{CrudError, Record, RecordId, Result};
use crate::dto::PageDto;
use crate::repository::VersionedRepository;
use crate::retry::RetryPolicy;
use crate::storage::DocumentStore;
use futures::stream::{BoxStream, StreamExt};
use log::debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// Page size used while streaming full listings.
pub const LIST_PAGE_SIZE: usize = 100;

/// Generic CRUD orchestration over a [`VersionedRepository`].
///
/// Writes to existing records run their whole load, transform and write cycle
/// under the service's [`RetryPolicy`], so a concurrent writer bumping the
/// version only costs another round trip.
pub struct CrudService<D, R, S, M> {
    repo: VersionedRepository<R, S>,
    mapper: Arc<M>,
    retry: RetryPolicy,
    list_page_size: usize,
    _external: PhantomData<fn() -> D>,
}

impl<D, R, S, M> Clone for CrudService<D, R, S, M> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            mapper: Arc::clone(&self.mapper),
            retry: self.retry.clone(),
            list_page_size: self.list_page_size,
            _external: PhantomData,
        }
    }
}

impl<D, R, S, M> CrudService<D, R, S, M>
where
    D: Send + Sync + 'static,
    R: Record,
    S: DocumentStore<R>,
    M: RecordMapper<D, R>,
{
    pub fn new(repo: VersionedRepository<R, S>, mapper: M) -> Self {
        Self {
            repo,
            mapper: Arc::new(mapper),
            retry: RetryPolicy::default(),
            list_page_size: LIST_PAGE_SIZE,
            _external: PhantomData,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_list_page_size(mut self, size: usize) -> Self {
        self.list_page_size = size.max(1);
        self
    }

    pub fn repository(&self) -> &VersionedRepository<R, S> {
        &self.repo
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn get(&self, id: &RecordId) -> Result<D> {
        let record = self.load(id).await?;
        self.mapper.map_to_external(&record)
    }

    pub async fn get_by_page(&self, index: usize, size: usize) -> Result<PageDto<D>> {
        let page = self.repo.find_page(index, size).await?;
        let content = page
            .items
            .iter()
            .map(|record| self.mapper.map_to_external(record))
            .collect::<Result<Vec<_>>>()?;
        Ok(PageDto::of(content, page.has_next_page, index, size))
    }

    /// Streams every record, fetching pages as the stream is polled.
    pub fn list(&self) -> BoxStream<'static, Result<D>> {
        let mapper = Arc::clone(&self.mapper);
        self.repo
            .stream_all(self.list_page_size)
            .map(move |record| record.and_then(|record| mapper.map_to_external(&record)))
            .boxed()
    }

    /// Replaces the record stored under `id` with one built from `external`.
    ///
    /// The replacement is stamped with the id and version of the record just
    /// loaded, never with whatever version `external` carried.
    pub async fn update(&self, id: &RecordId, external: &D) -> Result<D> {
        self.retry
            .retry_on_conflict("update", || async move {
                let current = self.load(id).await?;
                let mut replacement = self.mapper.map_to_stored(external)?;
                let meta = replacement.meta_mut();
                meta.id = current.id().cloned();
                meta.version = current.version();

                let stored = self.repo.update(replacement).await?;
                self.mapper.map_to_external(&stored)
            })
            .await
    }

    /// Applies the fields present in `external` onto the stored record.
    ///
    /// Id and version stay those of the record just loaded, even when the
    /// mapper copies them from `external`.
    pub async fn patch(&self, id: &RecordId, external: &D) -> Result<D> {
        self.retry
            .retry_on_conflict("patch", || async move {
                let mut current = self.load(id).await?;
                let loaded_id = current.id().cloned();
                let loaded_version = current.version();
                self.mapper.patch_stored_from_external(&mut current, external)?;
                let meta = current.meta_mut();
                meta.id = loaded_id;
                meta.version = loaded_version;

                let stored = self.repo.update(current).await?;
                self.mapper.map_to_external(&stored)
            })
            .await
    }

    /// Soft-deletes the record by flagging it archived.
    pub async fn delete(&self, id: &RecordId) -> Result<D> {
        self.retry
            .retry_on_conflict("delete", || async move {
                let mut current = self.load(id).await?;
                current.meta_mut().is_archived = true;

                let stored = self.repo.update(current).await?;
                debug!("Archived record {id}");
                self.mapper.map_to_external(&stored)
            })
            .await
    }

    /// Inserts a new record built from `external`.
    ///
    /// Any id or version carried by `external` is discarded; the store
    /// assigns fresh ones.
    pub async fn save(&self, external: &D) -> Result<D> {
        let mut record = self.mapper.map_to_stored(external)?;
        let meta = record.meta_mut();
        meta.id = None;
        meta.version = None;

        let stored = self.repo.persist(record).await?;
        self.mapper.map_to_external(&stored)
    }

    async fn load(&self, id: &RecordId) -> Result<R> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| CrudError::not_found(id))
    }
}
