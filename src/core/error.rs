use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use thiserror::Error;

/// Message prefix used when a record lookup comes back empty.
pub const CANNOT_FIND_ERR_MSG: &str = "Cannot find ";

/// HTTP status used by [`ServiceError`] when no explicit status is supplied.
pub const DEFAULT_HTTP_STATUS_CODE: u16 = 500;

#[derive(Error, Debug)]
pub enum CrudError {
    #[error("{0}")]
    NotFound(String),

    #[error(
        "Found version {} in store while record in memory has {} for '{id}'",
        display_version(.actual),
        display_version(.expected)
    )]
    VersionConflict {
        id: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("{0}")]
    NotImplemented(&'static str),

    #[error("Conflict retries exhausted in '{operation}' after {attempts} attempts: {last}")]
    ConflictExhausted {
        operation: String,
        attempts: u32,
        last: Box<CrudError>,
    },

    #[error("Retries exhausted in '{operation}' after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: Box<CrudError>,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CrudError>;

fn display_version(version: &Option<u64>) -> String {
    version.map_or_else(|| "none".to_string(), |v| v.to_string())
}

impl CrudError {
    /// Builds the not-found error for a record id.
    pub fn not_found(id: impl AsRef<str>) -> Self {
        Self::NotFound(format!("{CANNOT_FIND_ERR_MSG}{}", id.as_ref()))
    }

    /// Returns `true` for optimistic-lock failures that a fresh
    /// read-modify-write cycle can resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// HTTP status an outer web layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Precondition(_) => 400,
            Self::VersionConflict { .. } | Self::ConflictExhausted { .. } => 409,
            Self::RetriesExhausted { last, .. } => last.http_status(),
            Self::Service(err) => err.status(),
            Self::Api(err) => err.status(),
            Self::NotImplemented(_) | Self::Store(_) | Self::Json(_) => DEFAULT_HTTP_STATUS_CODE,
        }
    }
}

impl From<tokio::task::JoinError> for CrudError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Store(format!("background write task failed: {err}"))
    }
}

/// Domain failure translated into an externally visible response.
///
/// Carries a message, an HTTP status and an optional JSON entity that the web
/// layer places in the response envelope. Never retried.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
    status: u16,
    entity: Option<JsonValue>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: DEFAULT_HTTP_STATUS_CODE,
            entity: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_entity(mut self, entity: JsonValue) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn entity(&self) -> Option<&JsonValue> {
        self.entity.as_ref()
    }

    /// Decodes the attached entity as `T`, or `None` when absent or of another shape.
    pub fn entity_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.entity
            .as_ref()
            .and_then(|entity| serde_json::from_value(entity.clone()).ok())
    }
}

/// Failure reported by an upstream REST API the service called into.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (status {status})")]
pub struct ApiError {
    message: String,
    status: u16,
    body: Option<JsonValue>,
    uri_path: Option<String>,
    headers: BTreeMap<String, String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
            body: None,
            uri_path: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_uri_path(mut self, uri_path: impl Into<String>) -> Self {
        self.uri_path = Some(uri_path.into());
        self
    }

    /// Adds a response header; repeated names are joined with `", "`.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        self.headers
            .entry(name.into())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    pub fn uri_path(&self) -> Option<&str> {
        self.uri_path.as_deref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Upstream refused access (401 or 403).
    pub fn is_auth(&self) -> bool {
        matches!(self.status, 401 | 403)
    }

    /// Decodes the upstream response body as `T`.
    pub fn json_response<T: DeserializeOwned>(&self) -> Option<T> {
        self.body
            .as_ref()
            .and_then(|body| serde_json::from_value(body.clone()).ok())
    }
}
