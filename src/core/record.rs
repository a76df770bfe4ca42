use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Version assigned to a record on its first insert.
pub const FIRST_VERSION: u64 = 1;

/// Opaque record identifier, assigned by the store on first insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Bookkeeping fields shared by every stored record.
///
/// Concrete records embed this with `#[serde(flatten)]` so the fields sit
/// next to the domain fields in the stored document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a record already known to the store.
    pub fn stored(id: impl Into<RecordId>, version: u64) -> Self {
        Self {
            id: Some(id.into()),
            version: Some(version),
            ..Self::default()
        }
    }
}

/// A persisted domain entity with identity and version.
pub trait Record: Clone + Send + Sync + 'static {
    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    fn id(&self) -> Option<&RecordId> {
        self.meta().id.as_ref()
    }

    fn version(&self) -> Option<u64> {
        self.meta().version
    }

    fn is_archived(&self) -> bool {
        self.meta().is_archived
    }
}
