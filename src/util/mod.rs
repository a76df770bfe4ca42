pub mod date;

pub use date::{
    DEFAULT_TIMESTAMP_FORMAT, convert_to_utc, from_epoch_millis, now, now_as_str, reformat,
};
