//! Serialization seam and the optional compression filter.
//!
//! The client never knows the wire format. It calls exactly four adapter
//! operations: `serialize`, `deserialize`, `encode_bytes` and `decode_bytes`.
//! `JsonAdapter` is the stock implementation.

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AdapterError;

/// Converts typed values to and from text, and text to and from bytes.
///
/// Methods are async so an implementation may offload heavy work; the client
/// treats every call as a suspension point.
#[async_trait]
pub trait SerializationAdapter: Send + Sync {
    async fn serialize<T>(&self, value: &T) -> Result<String, AdapterError>
    where
        T: Serialize + Sync + ?Sized;

    async fn deserialize<T>(&self, text: &str) -> Result<T, AdapterError>
    where
        T: DeserializeOwned + Send;

    async fn encode_bytes(&self, text: &str) -> Result<Vec<u8>, AdapterError>;

    async fn decode_bytes(&self, bytes: &[u8]) -> Result<String, AdapterError>;
}

/// JSON over UTF-8, backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

#[async_trait]
impl SerializationAdapter for JsonAdapter {
    async fn serialize<T>(&self, value: &T) -> Result<String, AdapterError>
    where
        T: Serialize + Sync + ?Sized,
    {
        Ok(serde_json::to_string(value)?)
    }

    async fn deserialize<T>(&self, text: &str) -> Result<T, AdapterError>
    where
        T: DeserializeOwned + Send,
    {
        Ok(serde_json::from_str(text)?)
    }

    async fn encode_bytes(&self, text: &str) -> Result<Vec<u8>, AdapterError> {
        Ok(text.as_bytes().to_vec())
    }

    async fn decode_bytes(&self, bytes: &[u8]) -> Result<String, AdapterError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// Optional pass-through filter on raw body bytes.
///
/// Applied to the encoded request body before sending and to the raw response
/// body before decoding.
pub trait Compression: Send + Sync + fmt::Debug {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, AdapterError>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, AdapterError>;
}
