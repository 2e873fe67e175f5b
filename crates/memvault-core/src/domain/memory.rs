//! Memory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied record content. Opaque to the store.
pub type MemoryFields = serde_json::Map<String, Value>;

/// Keys the store assigns itself; callers cannot set them.
const RESERVED_KEYS: [&str; 2] = ["id", "createdAt"];

/// A user-created record.
///
/// Serialized flat: `{"id": .., "createdAt": .., <caller fields>..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Store-assigned identifier, unique within the list.
    pub id: String,

    /// Store-assigned creation time, millisecond precision.
    #[serde(rename = "createdAt", with = "iso_millis")]
    pub created_at: DateTime<Utc>,

    /// Everything else the caller stored.
    #[serde(flatten)]
    pub fields: MemoryFields,
}

impl Memory {
    /// Build a record from caller fields, dropping any `id`/`createdAt` the
    /// caller passed in.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, mut fields: MemoryFields) -> Self {
        for key in RESERVED_KEYS {
            fields.remove(key);
        }
        Self {
            id: id.into(),
            created_at,
            fields,
        }
    }

    /// Look up a caller field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Successful save: the stored record and the list size after the write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMemory {
    pub memory: Memory,
    pub current_count: usize,
}

/// `createdAt` as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
