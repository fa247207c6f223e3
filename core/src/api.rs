//! api.rs
//! Stable public API.
//!
//! Byte-level calls (`write_file`, `read_file`) run one pipeline each. Value-level
//! calls (`write`, `read`) add the JSON boundary around them: encoding happens before
//! any file is touched, decoding only after the read pipeline settled successfully.

use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::serialize;
use crate::stream::{read_pipeline, write_pipeline, CancelToken};
use crate::telemetry::{Phase, TelemetrySnapshot};
use crate::types::StoreError;

/// Compress `data` into `path` at `level` (1..=9) with the default codec.
pub fn write_file(
    path: impl AsRef<Path>,
    data: impl AsRef<[u8]>,
    level: u32,
) -> Result<TelemetrySnapshot, StoreError> {
    write_file_with(path, data, &ApiConfig::default().with_level(level), None)
}

pub fn write_file_with(
    path: impl AsRef<Path>,
    data: impl AsRef<[u8]>,
    config: &ApiConfig,
    cancel: Option<&CancelToken>,
) -> Result<TelemetrySnapshot, StoreError> {
    write_pipeline(path, Bytes::copy_from_slice(data.as_ref()), config, cancel)
}

/// Decompress `path` with the default codec.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, StoreError> {
    read_file_with(path, &ApiConfig::default(), None)
}

pub fn read_file_with(
    path: impl AsRef<Path>,
    config: &ApiConfig,
    cancel: Option<&CancelToken>,
) -> Result<Vec<u8>, StoreError> {
    read_file_with_report(path, config, cancel).map(|(bytes, _)| bytes)
}

pub fn read_file_with_report(
    path: impl AsRef<Path>,
    config: &ApiConfig,
    cancel: Option<&CancelToken>,
) -> Result<(Vec<u8>, TelemetrySnapshot), StoreError> {
    let (bytes, snapshot) = read_pipeline(path, config, cancel)?;
    Ok((bytes.to_vec(), snapshot))
}

/// Decompress `path` and return the payload as text.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String, StoreError> {
    let bytes = read_file(path)?;
    String::from_utf8(bytes)
        .map_err(|e| StoreError::Validation(format!("payload is not valid UTF-8: {e}")))
}

/// Serialize `value` as JSON and compress it into `path`.
pub fn write<T: Serialize + ?Sized>(
    path: impl AsRef<Path>,
    value: &T,
    level: u32,
) -> Result<TelemetrySnapshot, StoreError> {
    write_with(path, value, &ApiConfig::default().with_level(level), None)
}

pub fn write_with<T: Serialize + ?Sized>(
    path: impl AsRef<Path>,
    value: &T,
    config: &ApiConfig,
    cancel: Option<&CancelToken>,
) -> Result<TelemetrySnapshot, StoreError> {
    // Validate before encoding so a bad level never costs a serialization pass.
    config.validate()?;
    let start = Instant::now();
    let payload = serialize::encode(value, config.pretty)?;
    let encode_time = start.elapsed();
    debug!("[API] encoded {} bytes for {}", payload.len(), path.as_ref().display());

    let mut snapshot = write_pipeline(path, Bytes::from(payload), config, cancel)?;
    snapshot.phase_times.add(Phase::Encode, encode_time);
    Ok(snapshot)
}

/// Decompress `path` and parse the JSON payload into `T`.
pub fn read<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, StoreError> {
    read_with(path, &ApiConfig::default(), None)
}

pub fn read_with<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    config: &ApiConfig,
    cancel: Option<&CancelToken>,
) -> Result<T, StoreError> {
    read_with_report(path, config, cancel).map(|(value, _)| value)
}

/// [`read_with`] plus the pipeline snapshot, with JSON parsing charged to `Phase::Decode`.
pub fn read_with_report<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    config: &ApiConfig,
    cancel: Option<&CancelToken>,
) -> Result<(T, TelemetrySnapshot), StoreError> {
    let (bytes, mut snapshot) = read_pipeline(path, config, cancel)?;
    let start = Instant::now();
    let value = serialize::decode(&bytes)?;
    snapshot.phase_times.add(Phase::Decode, start.elapsed());
    Ok((value, snapshot))
}

/// Untyped variant of [`read`].
pub fn read_value(path: impl AsRef<Path>) -> Result<serde_json::Value, StoreError> {
    read(path)
}
