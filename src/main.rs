use anyhow::{Context, Result};
use clap::Parser;
use crudbase::core::{Record, RecordId, RecordMeta};
use crudbase::web::ResourceState;
use crudbase::{
    CrudService, FrameworkConfig, InMemoryDocumentStore, RecordMapper, RetryPolicy,
    VersionedRepository,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Demo server exposing an in-memory `notes` resource.
#[derive(Parser, Debug)]
#[command(name = "crudbase", version, about)]
struct Args {
    /// Address to listen on; overrides CRUDBASE_BIND_ADDR.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Note {
    #[serde(flatten)]
    meta: RecordMeta,
    title: String,
    body: String,
}

impl Record for Note {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteDto {
    id: Option<String>,
    version: Option<u64>,
    title: Option<String>,
    body: Option<String>,
    archived: Option<bool>,
    date_updated: Option<String>,
}

struct NoteMapper;

impl RecordMapper<NoteDto, Note> for NoteMapper {
    fn map_to_external(&self, note: &Note) -> crudbase::Result<NoteDto> {
        Ok(NoteDto {
            id: note.id().map(ToString::to_string),
            version: note.version(),
            title: Some(note.title.clone()),
            body: Some(note.body.clone()),
            archived: Some(note.is_archived()),
            date_updated: note.meta.date_updated.map(|dt| dt.to_rfc3339()),
        })
    }

    fn map_to_stored(&self, dto: &NoteDto) -> crudbase::Result<Note> {
        let now = crudbase::util::now();
        Ok(Note {
            meta: RecordMeta {
                id: dto.id.as_deref().map(RecordId::from),
                date_created: Some(now),
                date_updated: Some(now),
                ..RecordMeta::new()
            },
            title: dto.title.clone().unwrap_or_default(),
            body: dto.body.clone().unwrap_or_default(),
        })
    }

    fn patch_stored_from_external(&self, note: &mut Note, dto: &NoteDto) -> crudbase::Result<()> {
        if let Some(title) = &dto.title {
            note.title = title.clone();
        }
        if let Some(body) = &dto.body {
            note.body = body.clone();
        }
        note.meta.date_updated = Some(crudbase::util::now());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = FrameworkConfig::from_env().context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config = config.bind_addr(bind);
    }

    let service = CrudService::new(
        VersionedRepository::new(InMemoryDocumentStore::<Note>::new()),
        NoteMapper,
    )
    .with_retry_policy(RetryPolicy::from(&config.retry))
    .with_list_page_size(config.list_page_size);

    let notes = crudbase::web::crud_router::<NoteDto, _>(
        ResourceState::new(Arc::new(service)).with_default_page_size(config.default_page_size),
    );
    let app = axum::Router::new().nest("/notes", notes).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(bind_addr = %config.bind_addr, "crudbase demo started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crudbase=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
