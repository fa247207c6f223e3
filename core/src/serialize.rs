//! serialize.rs
//! JSON boundary: values become bytes before the pipeline, and bytes become values after.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::StoreError;

pub fn encode<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<Vec<u8>, StoreError> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}
