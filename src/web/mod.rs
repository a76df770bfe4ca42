//! Thin axum CRUD surface.
//!
//! Handlers are generic over the capability traits in [`capability`], so any
//! type able to load, page, save, update, patch or delete external
//! representations can be mounted. [`crate::service::CrudService`] implements
//! all of them.

pub mod capability;
mod routes;

pub use capability::{Delete, Load, Page, Patch, Save, Update};
pub use routes::{
    DEFAULT_PAGE_SIZE, ResourceState, crud_router, crud_routes, read_only_router,
    read_only_routes,
};

use crate::core::CrudError;
use crate::dto::RespDto;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value as JsonValue;

#[derive(Debug)]
pub enum WebError {
    Crud(CrudError),
    /// Request payload could not be read.
    Input(String),
}

impl From<CrudError> for WebError {
    fn from(err: CrudError) -> Self {
        WebError::Crud(err)
    }
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Crud(err) => StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            WebError::Input(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body: RespDto<JsonValue> = match self {
            WebError::Crud(CrudError::Service(err)) => match err.entity() {
                Some(entity) => RespDto::error_with(entity.clone(), err.message(), status.as_u16()),
                None => RespDto::error(err.message(), status.as_u16()),
            },
            WebError::Crud(err) => {
                if status.is_server_error() {
                    tracing::error!(error = %err, "request failed");
                }
                RespDto::error(err.to_string(), status.as_u16())
            }
            WebError::Input(message) => RespDto::error(message, status.as_u16()),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::WebError;
    use crate::core::{ApiError, CrudError, ServiceError};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::{Value, json};

    async fn body_of(err: WebError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn service_error_entity_lands_in_resp() {
        let err = CrudError::from(
            ServiceError::new("quota exceeded")
                .with_status(429)
                .with_entity(json!({"limit": 10})),
        );

        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["resp"], json!({"limit": 10}));
        assert_eq!(body["error"], "quota exceeded");
        assert_eq!(body["status"], 429);
    }

    #[tokio::test]
    async fn upstream_status_is_forwarded() {
        let err = CrudError::from(ApiError::new("upstream said no", 403));
        let (status, body) = body_of(err.into()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.get("resp").is_none());
    }

    #[tokio::test]
    async fn input_errors_are_bad_requests() {
        let (status, body) = body_of(WebError::Input("bad body".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad body");
    }
}
