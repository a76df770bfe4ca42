//! Explicitly constructed JSON serializer.
//!
//! A [`JsonMapper`] carries the serialization options shared by a service and
//! its HTTP layer. Build one at startup and pass it by reference.

use crate::core::Result;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonMapper {
    omit_nulls: bool,
    pretty: bool,
}

impl Default for JsonMapper {
    fn default() -> Self {
        Self {
            omit_nulls: true,
            pretty: false,
        }
    }
}

impl JsonMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops object properties whose value is `null` when serializing.
    pub fn omit_nulls(mut self, omit_nulls: bool) -> Self {
        self.omit_nulls = omit_nulls;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<JsonValue> {
        let mut json = serde_json::to_value(value)?;
        if self.omit_nulls {
            strip_nulls(&mut json);
        }
        Ok(json)
    }

    pub fn to_string<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let json = self.to_value(value)?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        Ok(text)
    }

    /// Reinterprets an already parsed document as `T`.
    pub fn convert<T: DeserializeOwned>(&self, value: JsonValue) -> Result<T> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_str<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        Ok(serde_json::from_str(text)?)
    }

    /// Lenient parse: malformed input is logged and yields `None`.
    pub fn read<T: DeserializeOwned>(&self, text: &str) -> Option<T> {
        match serde_json::from_str(text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Unable to parse JSON into {}: {}", std::any::type_name::<T>(), err);
                None
            }
        }
    }
}

fn strip_nulls(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            map.retain(|_, field| !field.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        JsonValue::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}
