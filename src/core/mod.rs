pub mod error;
pub mod record;

pub use error::{
    ApiError, CANNOT_FIND_ERR_MSG, CrudError, DEFAULT_HTTP_STATUS_CODE, Result, ServiceError,
};
pub use record::{FIRST_VERSION, Record, RecordId, RecordMeta};
