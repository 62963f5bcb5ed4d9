use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ChangeError;

/// Text round-trip for change-data values. Must round-trip exactly for every
/// value the associated producer can emit.
pub trait ChangeDataSerializer<T>: Send + Sync {
    fn serialize(&self, value: &T) -> Result<String, ChangeError>;
    fn deserialize(&self, text: &str) -> Result<T, ChangeError>;
}

/// JSON serializer for any serde value. serde_json escapes control
/// characters, so the output is always line-safe.
pub struct JsonChangeDataSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonChangeDataSerializer<T> {
    pub fn new() -> Self {
        JsonChangeDataSerializer {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonChangeDataSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChangeDataSerializer<T> for JsonChangeDataSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<String, ChangeError> {
        serde_json::to_string(value).map_err(|e| ChangeError::Serialize(e.to_string()))
    }

    fn deserialize(&self, text: &str) -> Result<T, ChangeError> {
        serde_json::from_str(text).map_err(|e| ChangeError::Deserialize(e.to_string()))
    }
}
