//! Response envelopes shared by services and the HTTP layer.

use crate::util::now_as_str;
use serde::{Deserialize, Serialize};

/// One page of external representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDto<D> {
    pub content: Vec<D>,
    pub has_next_page: bool,
    pub page_number: usize,
    /// Number of items actually returned.
    pub count: usize,
    /// Page size the caller asked for.
    pub requested_count: usize,
}

impl<D> PageDto<D> {
    pub fn of(
        content: Vec<D>,
        has_next_page: bool,
        page_number: usize,
        requested_count: usize,
    ) -> Self {
        Self {
            count: content.len(),
            content,
            has_next_page,
            page_number,
            requested_count,
        }
    }

    pub fn map<E>(self, f: impl FnMut(D) -> E) -> PageDto<E> {
        PageDto {
            content: self.content.into_iter().map(f).collect(),
            has_next_page: self.has_next_page,
            page_number: self.page_number,
            count: self.count,
            requested_count: self.requested_count,
        }
    }
}

/// Generic response wrapper: payload, status, optional error text and a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespDto<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp: Option<T>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T> RespDto<T> {
    /// Successful response with status 200.
    pub fn wrap(resp: T) -> Self {
        Self::wrap_with_status(resp, 200)
    }

    pub fn wrap_with_status(resp: T, status: u16) -> Self {
        Self {
            resp: Some(resp),
            status,
            error: None,
            timestamp: now_as_str(),
        }
    }

    pub fn error(error: impl Into<String>, status: u16) -> Self {
        Self {
            resp: None,
            status,
            error: Some(error.into()),
            timestamp: now_as_str(),
        }
    }

    /// Error response carrying a payload alongside the message.
    pub fn error_with(resp: T, error: impl Into<String>, status: u16) -> Self {
        Self {
            resp: Some(resp),
            ..Self::error(error, status)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
