use super::capability::{Delete, Load, Page, Patch, Save, Update};
use super::{Result, WebError};
use crate::core::{CrudError, RecordId};
use crate::json::JsonMapper;
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Page size used by `GET /page` when `size` is omitted.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Shared state handed to every generated handler.
pub struct ResourceState<H> {
    handler: Arc<H>,
    json: Arc<JsonMapper>,
    default_page_size: usize,
}

impl<H> Clone for ResourceState<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            json: Arc::clone(&self.json),
            default_page_size: self.default_page_size,
        }
    }
}

impl<H> ResourceState<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            json: Arc::new(JsonMapper::default()),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_json_mapper(mut self, json: JsonMapper) -> Self {
        self.json = Arc::new(json);
        self
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size.max(1);
        self
    }

    fn respond<T: Serialize>(&self, status: StatusCode, body: &T) -> Result<Response> {
        let text = self.json.to_string(body)?;
        Ok((status, [(header::CONTENT_TYPE, "application/json")], text).into_response())
    }
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    no: Option<usize>,
    size: Option<usize>,
}

/// `GET /`, `GET /page?no=&size=` and `GET /:id`.
pub fn read_only_routes<D, H>(handler: Arc<H>) -> Router
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: Load<D> + Page<D>,
{
    read_only_router::<D, H>(ResourceState::new(handler))
}

/// Read-only routes plus `POST /`, `PUT /:id`, `PATCH /:id` and `DELETE /:id`.
pub fn crud_routes<D, H>(handler: Arc<H>) -> Router
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: Load<D> + Page<D> + Save<D> + Update<D> + Patch<D> + Delete<D>,
{
    crud_router::<D, H>(ResourceState::new(handler))
}

pub fn read_only_router<D, H>(state: ResourceState<H>) -> Router
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: Load<D> + Page<D>,
{
    Router::new()
        .route("/", get(list_all::<D, H>))
        .route("/page", get(get_page::<D, H>))
        .route("/:id", get(get_one::<D, H>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn crud_router<D, H>(state: ResourceState<H>) -> Router
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: Load<D> + Page<D> + Save<D> + Update<D> + Patch<D> + Delete<D>,
{
    Router::new()
        .route("/", get(list_all::<D, H>).post(create::<D, H>))
        .route("/page", get(get_page::<D, H>))
        .route(
            "/:id",
            get(get_one::<D, H>)
                .put(replace::<D, H>)
                .patch(patch_one::<D, H>)
                .delete(remove::<D, H>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Streams the listing as one JSON array.
///
/// A failure on the first record still gets an error envelope. Later
/// failures abort the body mid-array.
async fn list_all<D, H>(State(state): State<ResourceState<H>>) -> Result<Response>
where
    D: Serialize + Send + Sync + 'static,
    H: Page<D>,
{
    let mut items = state.handler.load_all();
    let Some(first) = items.next().await.transpose()? else {
        debug!("listed no records");
        return state.respond(StatusCode::OK, &Vec::<D>::new());
    };

    let head = format!("[{}", state.json.to_string(&first)?);
    let json = Arc::clone(&state.json);
    let rest = items.map(move |item| {
        item.and_then(|item| json.to_string(&item))
            .map(|text| format!(",{text}"))
    });
    let chunks = stream::once(async move { Ok::<_, CrudError>(head) })
        .chain(rest)
        .chain(stream::once(async { Ok("]".to_string()) }));

    debug!("streaming record listing");
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(chunks),
    )
        .into_response())
}

async fn get_page<D, H>(
    State(state): State<ResourceState<H>>,
    Query(query): Query<PageQuery>,
) -> Result<Response>
where
    D: Serialize + Send + Sync + 'static,
    H: Page<D>,
{
    let index = query.no.unwrap_or(0);
    let size = query.size.unwrap_or(state.default_page_size);
    let page = state.handler.load_page(index, size).await?;
    state.respond(StatusCode::OK, &page)
}

async fn get_one<D, H>(
    State(state): State<ResourceState<H>>,
    Path(id): Path<String>,
) -> Result<Response>
where
    D: Serialize + Send + Sync + 'static,
    H: Load<D>,
{
    let item = state.handler.load(&RecordId::from(id)).await?;
    state.respond(StatusCode::OK, &item)
}

async fn create<D, H>(State(state): State<ResourceState<H>>, body: String) -> Result<Response>
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: Save<D>,
{
    let external: D = parse_body(&state, &body)?;
    let created = state.handler.create(&external).await?;
    debug!("created record");
    state.respond(StatusCode::CREATED, &created)
}

async fn replace<D, H>(
    State(state): State<ResourceState<H>>,
    Path(id): Path<String>,
    body: String,
) -> Result<Response>
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: Update<D>,
{
    let external: D = parse_body(&state, &body)?;
    let updated = state.handler.replace(&RecordId::from(id), &external).await?;
    state.respond(StatusCode::OK, &updated)
}

async fn patch_one<D, H>(
    State(state): State<ResourceState<H>>,
    Path(id): Path<String>,
    body: String,
) -> Result<Response>
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
    H: Patch<D>,
{
    let external: D = parse_body(&state, &body)?;
    let patched = state
        .handler
        .patch_fields(&RecordId::from(id), &external)
        .await?;
    state.respond(StatusCode::OK, &patched)
}

async fn remove<D, H>(
    State(state): State<ResourceState<H>>,
    Path(id): Path<String>,
) -> Result<Response>
where
    D: Serialize + Send + Sync + 'static,
    H: Delete<D>,
{
    let archived = state.handler.remove(&RecordId::from(id)).await?;
    state.respond(StatusCode::OK, &archived)
}

fn parse_body<D: DeserializeOwned, H>(state: &ResourceState<H>, body: &str) -> Result<D> {
    state
        .json
        .from_str(body)
        .map_err(|err| WebError::Input(format!("request body is not valid: {err}")))
}
