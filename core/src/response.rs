//! Response materializer: reads a response body and wraps it in an envelope.

use std::str::FromStr;

use futures::StreamExt;
use serde::de::DeserializeOwned;

use crate::adapter::{Compression, SerializationAdapter};
use crate::error::{ReadError, RestError};
use crate::http::{BodyStream, HttpResponse, ResponseMeta};

/// How a response body is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Stream the whole body and take it as text.
    #[default]
    ReadToEnd,
    /// Read exactly `Content-Length` bytes, then decode them via the adapter.
    /// Fails when the server does not advertise a length.
    Bounded,
}

impl FromStr for ReadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" | "read-to-end" => Ok(ReadMode::ReadToEnd),
            "bounded" => Ok(ReadMode::Bounded),
            other => Err(format!("unknown read mode: {other}")),
        }
    }
}

/// A response body together with the transport metadata it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse<T> {
    pub data: T,
    pub response: ResponseMeta,
}

impl<T> RestResponse<T> {
    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

pub(crate) struct Materializer<'a, A> {
    adapter: &'a A,
    compression: Option<&'a dyn Compression>,
}

impl<'a, A: SerializationAdapter> Materializer<'a, A> {
    pub(crate) fn new(adapter: &'a A, compression: Option<&'a dyn Compression>) -> Self {
        Self {
            adapter,
            compression,
        }
    }

    pub(crate) fn adapter(&self) -> &'a A {
        self.adapter
    }

    /// Read the body as text. The body stream is consumed and dropped on
    /// every path out of this function.
    pub(crate) async fn read_text(
        &self,
        meta: &ResponseMeta,
        body: BodyStream,
        mode: ReadMode,
    ) -> Result<String, ReadError> {
        match (mode, self.compression) {
            (ReadMode::ReadToEnd, None) => {
                let bytes = read_to_end(body).await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            (ReadMode::ReadToEnd, Some(filter)) => {
                let bytes = read_to_end(body).await?;
                let bytes = filter.decompress(&bytes).map_err(ReadError::Decode)?;
                self.adapter
                    .decode_bytes(&bytes)
                    .await
                    .map_err(ReadError::Decode)
            }
            (ReadMode::Bounded, filter) => {
                let expected = meta.content_length.ok_or(ReadError::LengthUnknown)?;
                let mut bytes = read_bounded(body, expected).await?;
                if let Some(filter) = filter {
                    bytes = filter.decompress(&bytes).map_err(ReadError::Decode)?;
                }
                self.adapter
                    .decode_bytes(&bytes)
                    .await
                    .map_err(ReadError::Decode)
            }
        }
    }

    /// Untyped envelope: the decoded text as-is.
    pub(crate) async fn materialize_text(
        &self,
        response: HttpResponse,
        mode: ReadMode,
    ) -> Result<RestResponse<String>, ReadError> {
        let (meta, body) = response.into_parts();
        let data = self.read_text(&meta, body, mode).await?;
        Ok(RestResponse {
            data,
            response: meta,
        })
    }

    /// Typed envelope: deserialize previously read text into `T`.
    pub(crate) async fn deserialize<T, E>(
        &self,
        raw: RestResponse<String>,
    ) -> Result<RestResponse<T>, RestError<E>>
    where
        T: DeserializeOwned + Send,
    {
        let data = self
            .adapter
            .deserialize::<T>(&raw.data)
            .await
            .map_err(RestError::<E>::Deserialization)?;
        Ok(RestResponse {
            data,
            response: raw.response,
        })
    }
}

async fn read_to_end(mut body: BodyStream) -> Result<Vec<u8>, ReadError> {
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk.map_err(ReadError::Stream)?);
    }
    Ok(buf)
}

/// Upper bound on the buffer reserved before any body bytes have arrived.
const INITIAL_CAPACITY: u64 = 64 * 1024;

async fn read_bounded(mut body: BodyStream, expected: u64) -> Result<Vec<u8>, ReadError> {
    // Content-Length is server-supplied; the buffer only grows with bytes received.
    let mut buf = Vec::with_capacity(expected.min(INITIAL_CAPACITY) as usize);
    while (buf.len() as u64) < expected {
        match body.next().await {
            Some(chunk) => buf.extend_from_slice(&chunk.map_err(ReadError::Stream)?),
            None => {
                return Err(ReadError::Truncated {
                    expected,
                    received: buf.len() as u64,
                })
            }
        }
    }
    // Only reached with buf.len() >= expected, so the cast cannot truncate.
    buf.truncate(expected as usize);
    Ok(buf)
}
