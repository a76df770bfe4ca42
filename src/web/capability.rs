use crate::core::{Record, RecordId, Result};
use crate::dto::PageDto;
use crate::service::{CrudService, RecordMapper};
use crate::storage::DocumentStore;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Fetch one external representation by id.
#[async_trait]
pub trait Load<D>: Send + Sync + 'static {
    async fn load(&self, id: &RecordId) -> Result<D>;
}

/// Paged and full listings.
#[async_trait]
pub trait Page<D>: Send + Sync + 'static {
    async fn load_page(&self, index: usize, size: usize) -> Result<PageDto<D>>;

    /// Every record, produced as the response body is written.
    fn load_all(&self) -> BoxStream<'static, Result<D>>;
}

#[async_trait]
pub trait Save<D: Sync>: Send + Sync + 'static {
    async fn create(&self, external: &D) -> Result<D>;
}

/// Full replacement of an existing record.
#[async_trait]
pub trait Update<D: Sync>: Send + Sync + 'static {
    async fn replace(&self, id: &RecordId, external: &D) -> Result<D>;
}

/// Partial update of an existing record.
#[async_trait]
pub trait Patch<D: Sync>: Send + Sync + 'static {
    async fn patch_fields(&self, id: &RecordId, external: &D) -> Result<D>;
}

#[async_trait]
pub trait Delete<D>: Send + Sync + 'static {
    async fn remove(&self, id: &RecordId) -> Result<D>;
}

#[async_trait]
impl<D, R, S, M> Load<D> for CrudService<D, R, S, M>
where
    D: Send + Sync + 'static,
    R: Record,
    S: DocumentStore<R>,
    M: RecordMapper<D, R>,
{
    async fn load(&self, id: &RecordId) -> Result<D> {
        CrudService::get(self, id).await
    }
}

#[async_trait]
impl<D, R, S, M> Page<D> for CrudService<D, R, S, M>
where
    D: Send + Sync + 'static,
    R: Record,
    S: DocumentStore<R>,
    M: RecordMapper<D, R>,
{
    async fn load_page(&self, index: usize, size: usize) -> Result<PageDto<D>> {
        CrudService::get_by_page(self, index, size).await
    }

    fn load_all(&self) -> BoxStream<'static, Result<D>> {
        CrudService::list(self)
    }
}

#[async_trait]
impl<D, R, S, M> Save<D> for CrudService<D, R, S, M>
where
    D: Send + Sync + 'static,
    R: Record,
    S: DocumentStore<R>,
    M: RecordMapper<D, R>,
{
    async fn create(&self, external: &D) -> Result<D> {
        CrudService::save(self, external).await
    }
}

#[async_trait]
impl<D, R, S, M> Update<D> for CrudService<D, R, S, M>
where
    D: Send + Sync + 'static,
    R: Record,
    S: DocumentStore<R>,
    M: RecordMapper<D, R>,
{
    async fn replace(&self, id: &RecordId, external: &D) -> Result<D> {
        CrudService::update(self, id, external).await
    }
}

#[async_trait]
impl<D, R, S, M> Patch<D> for CrudService<D, R, S, M>
where
    D: Send + Sync + 'static,
    R: Record,
    S: DocumentStore<R>,
    M: RecordMapper<D, R>,
{
    async fn patch_fields(&self, id: &RecordId, external: &D) -> Result<D> {
        CrudService::patch(self, id, external).await
    }
}

#[async_trait]
impl<D, R, S, M> Delete<D> for CrudService<D, R, S, M>
where
    D: Send + Sync + 'static,
    R: Record,
    S: DocumentStore<R>,
    M: RecordMapper<D, R>,
{
    async fn remove(&self, id: &RecordId) -> Result<D> {
        CrudService::delete(self, id).await
    }
}
