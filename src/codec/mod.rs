//! Storage encoding for enum-like values.
//!
//! An enum is written as a small document holding its display value and its
//! numeric id. Values the program does not know about survive a round trip
//! through the [`BaseEnum::unknown`] constructor instead of failing the read.

use serde::{Deserialize, Serialize};

/// Id recorded for values outside the known set.
pub const UNKNOWN_ID: i32 = -1;

pub trait BaseEnum: Sized + Clone + 'static {
    /// Every variant with a stable id.
    fn known() -> &'static [Self];

    fn id(&self) -> i32;

    fn value(&self) -> &str;

    /// Wraps a raw value that matches no known variant.
    fn unknown(raw: &str) -> Self;

    fn from_id(id: i32) -> Option<Self> {
        Self::known().iter().find(|variant| variant.id() == id).cloned()
    }

    /// Case-insensitive lookup by value; blank input yields `None`.
    fn from_value(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let found = Self::known()
            .iter()
            .find(|variant| variant.value().eq_ignore_ascii_case(value))
            .cloned();
        Some(found.unwrap_or_else(|| Self::unknown(value)))
    }
}

/// Stored shape of an enum value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDocument {
    pub value: String,
    pub ord: i32,
}

pub fn encode_enum<E: BaseEnum>(variant: &E) -> EnumDocument {
    EnumDocument {
        value: variant.value().to_string(),
        ord: variant.id(),
    }
}

/// Resolves by `ord`; unknown or unrecognised ids keep the raw `value`.
pub fn decode_enum<E: BaseEnum>(doc: &EnumDocument) -> E {
    match E::from_id(doc.ord) {
        Some(variant) if doc.ord != UNKNOWN_ID => variant,
        _ => E::unknown(&doc.value),
    }
}

/// `#[serde(with = "crudbase::codec::enum_document")]` adapter.
pub mod enum_document {
    use super::{BaseEnum, EnumDocument, decode_enum, encode_enum};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<E, S>(variant: &E, serializer: S) -> Result<S::Ok, S::Error>
    where
        E: BaseEnum,
        S: Serializer,
    {
        encode_enum(variant).serialize(serializer)
    }

    pub fn deserialize<'de, E, D>(deserializer: D) -> Result<E, D::Error>
    where
        E: BaseEnum,
        D: Deserializer<'de>,
    {
        EnumDocument::deserialize(deserializer).map(|doc| decode_enum(&doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    enum Priority {
        Low,
        High,
        Other(String),
    }

    impl BaseEnum for Priority {
        fn known() -> &'static [Self] {
            const KNOWN: &[Priority] = &[Priority::Low, Priority::High];
            KNOWN
        }

        fn id(&self) -> i32 {
            match self {
                Priority::Low => 0,
                Priority::High => 1,
                Priority::Other(_) => UNKNOWN_ID,
            }
        }

        fn value(&self) -> &str {
            match self {
                Priority::Low => "low",
                Priority::High => "high",
                Priority::Other(raw) => raw,
            }
        }

        fn unknown(raw: &str) -> Self {
            Priority::Other(raw.to_string())
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Ticket {
        #[serde(with = "enum_document")]
        priority: Priority,
    }

    #[test]
    fn known_variants_resolve_by_id() {
        let doc = encode_enum(&Priority::High);
        assert_eq!(doc.ord, 1);

        let renamed = EnumDocument {
            value: "HIGH!".to_string(),
            ord: 1,
        };
        assert_eq!(decode_enum::<Priority>(&renamed), Priority::High);
    }

    #[test]
    fn unknown_values_survive_round_trip() {
        let doc = encode_enum(&Priority::Other("urgent".to_string()));
        assert_eq!(doc.ord, UNKNOWN_ID);
        assert_eq!(
            decode_enum::<Priority>(&doc),
            Priority::Other("urgent".to_string())
        );

        let stale = EnumDocument {
            value: "legacy".to_string(),
            ord: 99,
        };
        assert_eq!(
            decode_enum::<Priority>(&stale),
            Priority::Other("legacy".to_string())
        );
    }

    #[test]
    fn from_value_is_case_insensitive() {
        assert_eq!(Priority::from_value(" LOW "), Some(Priority::Low));
        assert_eq!(Priority::from_value(""), None);
        assert_eq!(
            Priority::from_value("medium"),
            Some(Priority::Other("medium".to_string()))
        );
    }

    #[test]
    fn serde_adapter_writes_value_and_ord() {
        let ticket = Ticket {
            priority: Priority::Low,
        };
        let doc = serde_json::to_value(&ticket).unwrap();
        assert_eq!(doc, json!({"priority": {"value": "low", "ord": 0}}));

        let back: Ticket =
            serde_json::from_value(json!({"priority": {"value": "blocker", "ord": -1}})).unwrap();
        assert_eq!(back.priority, Priority::Other("blocker".to_string()));
    }
}
