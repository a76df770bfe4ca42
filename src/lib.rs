// ============================================================================
// crudbase Library
// ============================================================================
//
// Building blocks for CRUD services over a document store:
//
// - `storage`: document store trait with an atomic compare-and-swap write
// - `repository`: optimistic-locking update and upsert protocol
// - `retry`: conflict retry policy (unbounded or bounded with backoff)
// - `service`: generic CRUD orchestration with mapping hooks
// - `web`: axum routers over capability traits

pub mod codec;
pub mod config;
pub mod core;
pub mod dto;
pub mod json;
pub mod repository;
pub mod retry;
pub mod service;
pub mod storage;
pub mod util;
pub mod web;

pub use codec::{BaseEnum, EnumDocument, UNKNOWN_ID, decode_enum, encode_enum};
pub use config::{FrameworkConfig, RetryConfig};
pub use crate::core::{
    ApiError, CrudError, FIRST_VERSION, Record, RecordId, RecordMeta, Result, ServiceError,
};
pub use dto::{PageDto, RespDto};
pub use json::JsonMapper;
pub use repository::{BatchDispatch, VersionedRepository};
pub use retry::{RetryLimit, RetryPolicy};
pub use service::{CrudService, LIST_PAGE_SIZE, RecordMapper, UnimplementedMapper};
pub use storage::{DocumentStore, InMemoryDocumentStore, PageRequest, StorePage, WriteOutcome};
pub use web::{WebError, crud_routes, read_only_routes};
