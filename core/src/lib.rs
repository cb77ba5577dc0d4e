//! Generic REST call client.
//!
//! # Overview
//! Given a base endpoint, a verb, an optional body, an optional query value
//! and a serialization adapter, `RestClient` builds the request, sends it and
//! turns the response into a `RestResponse<T>` of the caller's type, the same
//! way for every verb and payload shape.
//!
//! # Design
//! - `RestClient` holds immutable per-call configuration; each call builds a
//!   fresh `CallDescriptor`, so concurrent calls on one client are independent.
//! - The pipeline is split along its seams: `RequestBuilder` (URI, body,
//!   headers), `Transport` (network), the materializer (body to text to `T`)
//!   and the classifier (non-2xx to `RestError`).
//! - The wire format lives behind `SerializationAdapter`; `JsonAdapter` is the
//!   stock one.
//! - Query values become a trailing path segment. Primitives render
//!   literally, other values are serialized and percent-encoded.
//!
//! # Example
//!
//! ```no_run
//! use restcall_core::{JsonAdapter, RestClient, RestError};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Item {
//!     name: String,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct ErrorModel {
//!     error: ErrorDetail,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct ErrorDetail {
//!     message: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RestClient::new(JsonAdapter, "https://api.example.com/items")?
//!     .with_header("Authorization", "Basic dXNlcjpwYXNz")
//!     .with_error_type::<ErrorModel>();
//!
//! match client.get_with_query::<Item, _>("abc-slug").await {
//!     Ok(item) => println!("{} ({})", item.data.name, item.status()),
//!     Err(RestError::Rest(rex)) => {
//!         if let Some(model) = rex.error {
//!             println!("server said: {}", model.error.message);
//!         }
//!     }
//!     Err(other) => return Err(other.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;

pub use adapter::{Compression, JsonAdapter, SerializationAdapter};
pub use client::RestClient;
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use error::{
    AdapterError, ConfigError, ReadError, RestError, RestException, TransportError, Undeclared,
};
pub use http::{BodyStream, HeaderSet, HttpMethod, HttpRequest, HttpResponse, ResponseMeta};
pub use request::{CallDescriptor, QueryValue, RequestBuilder, Structured};
pub use response::{ReadMode, RestResponse};
pub use transport::{ReqwestTransport, Transport};
