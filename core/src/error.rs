//! Error types for the REST client.
//!
//! # Design
//! Failures are layered so callers can tell them apart without parsing
//! messages: the call never left the process (`UnsupportedVerb`,
//! `Serialization`), the network failed (`Timeout`, `Transport`), the body
//! could not be read (`ResponseRead`), or the server answered with a non-2xx
//! status (`Rest`). When classifying a non-2xx answer itself fails, the
//! secondary failure is wrapped in `ErrorHandling` together with the status
//! that triggered it.

use std::error::Error as StdError;

use serde::Deserialize;
use thiserror::Error;

use crate::http::{HttpMethod, ResponseMeta};

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure reported by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport's own deadline fired.
    #[error("request timed out")]
    TimedOut,

    /// The connection could not be established.
    #[error("connection error: {0}")]
    Connect(#[source] BoxError),

    /// Anything else; the original error is kept as-is.
    #[error(transparent)]
    Other(BoxError),
}

/// Failure inside a `SerializationAdapter` or `Compression` filter.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AdapterError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::with_source(err.to_string(), err)
    }
}

impl From<std::string::FromUtf8Error> for AdapterError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        AdapterError::with_source(format!("invalid UTF-8: {err}"), err)
    }
}

/// The response body could not be turned into text.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Bounded read requested but the server did not advertise a length.
    #[error("response length is not advertised, cannot perform a bounded read")]
    LengthUnknown,

    /// The body stream ended before the advertised length was received.
    #[error("response body truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    #[error("failed to read response body: {0}")]
    Stream(#[source] TransportError),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] AdapterError),
}

/// Problems with client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("failed to initialise transport: {0}")]
    Transport(#[source] TransportError),
}

/// Error payload type of a client that did not declare one.
///
/// Uninhabited: a `RestException<Undeclared>` never carries a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Undeclared {}

/// A non-2xx response, classified.
#[derive(Debug, Error)]
#[error("server responded with HTTP {status}")]
pub struct RestException<E> {
    pub status: u16,
    /// Decoded body text, kept even when `error` was deserialized from it.
    pub body: String,
    /// The body deserialized into the client's declared error type.
    pub error: Option<E>,
    pub response: ResponseMeta,
}

/// Errors returned by `RestClient` calls.
#[derive(Debug, Error)]
pub enum RestError<E = Undeclared> {
    /// The verb is not one the builder can send. Raised before any I/O.
    #[error("unsupported HTTP verb: {0}")]
    UnsupportedVerb(HttpMethod),

    /// The call exceeded the configured timeout.
    #[error("The REST call timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The caller's cancellation token fired before the call completed.
    #[error("REST call cancelled")]
    Cancelled,

    /// Network-level failure, propagated unchanged.
    #[error(transparent)]
    Transport(TransportError),

    /// A 2xx body could not be read.
    #[error(transparent)]
    ResponseRead(ReadError),

    /// The body or query could not be serialized by the adapter.
    #[error("failed to serialize request: {0}")]
    Serialization(#[source] AdapterError),

    /// A 2xx body could not be deserialized into the requested type.
    #[error("failed to deserialize response: {0}")]
    Deserialization(#[source] AdapterError),

    #[error(transparent)]
    Rest(RestException<E>),

    /// Reading or decoding the body of a non-2xx response failed.
    #[error("Error handling Error from web server (HTTP {status}). {source}")]
    ErrorHandling {
        status: u16,
        #[source]
        source: BoxError,
    },
}

impl<E> RestError<E> {
    /// HTTP status of the response that caused this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Rest(rex) => Some(rex.status),
            RestError::ErrorHandling { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server-supplied error payload, when one was deserialized.
    pub fn error_payload(&self) -> Option<&E> {
        match self {
            RestError::Rest(rex) => rex.error.as_ref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RestError::Timeout { .. })
    }
}
