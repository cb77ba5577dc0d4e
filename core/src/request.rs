//! Request builder: turns a `CallDescriptor` into an `HttpRequest`.
//!
//! # Design
//! The query value is appended to the endpoint as an extra path segment
//! (`{endpoint}/{segment}`), not as a `?key=value` pair. Which rendering a
//! query takes is decided by the `QueryValue` impl of its type: primitives
//! render literally, everything else goes through the adapter and is
//! percent-encoded. Nothing inspects types at runtime.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::adapter::{Compression, SerializationAdapter};
use crate::error::{AdapterError, RestError};
use crate::http::{HeaderSet, HttpMethod, HttpRequest, CONTENT_TYPE_JSON};
use crate::response::ReadMode;

/// A value that can be appended to the endpoint as a trailing path segment.
pub trait QueryValue: Serialize + Sync {
    /// Literal rendering for primitive values.
    ///
    /// `None` (the default) routes the value through the serialization
    /// adapter and percent-encodes the result.
    fn literal(&self) -> Option<String> {
        None
    }
}

macro_rules! literal_query {
    ($($t:ty),* $(,)?) => {
        $(
            impl QueryValue for $t {
                fn literal(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

literal_query!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, String,
    str,
);

impl<T: QueryValue + ?Sized> QueryValue for &T {
    fn literal(&self) -> Option<String> {
        (**self).literal()
    }
}

/// Placeholder type for calls without a query.
impl QueryValue for () {}

impl QueryValue for serde_json::Value {
    fn literal(&self) -> Option<String> {
        match self {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Forces a value onto the serialized, percent-encoded query path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Structured<T>(pub T);

impl<T: Serialize + Sync> QueryValue for Structured<T> {}

/// Everything needed to make one call. Built fresh for every call.
#[derive(Debug)]
pub struct CallDescriptor<'a, B: ?Sized, Q: ?Sized> {
    pub endpoint: &'a str,
    pub verb: HttpMethod,
    pub body: Option<&'a B>,
    pub query: Option<&'a Q>,
    pub headers: HeaderSet,
    pub timeout: Duration,
    pub read_mode: ReadMode,
}

/// Builds outbound requests using a serialization adapter.
pub struct RequestBuilder<'a, A> {
    adapter: &'a A,
    compression: Option<&'a dyn Compression>,
}

impl<'a, A: SerializationAdapter> RequestBuilder<'a, A> {
    pub fn new(adapter: &'a A, compression: Option<&'a dyn Compression>) -> Self {
        Self {
            adapter,
            compression,
        }
    }

    /// Resolve the URI, serialize the body and apply headers.
    ///
    /// Fails with `UnsupportedVerb` before doing any work for verbs outside
    /// GET, POST and PUT. A body passed with GET is dropped without error.
    pub async fn build<B, Q, E>(
        &self,
        call: &CallDescriptor<'_, B, Q>,
    ) -> Result<HttpRequest, RestError<E>>
    where
        B: Serialize + Sync + ?Sized,
        Q: QueryValue + ?Sized,
    {
        if !call.verb.is_supported() {
            return Err(RestError::UnsupportedVerb(call.verb));
        }

        let uri = self
            .resolve_uri(call.endpoint, call.query)
            .await
            .map_err(RestError::<E>::Serialization)?;

        let mut headers = vec![("content-type".to_string(), CONTENT_TYPE_JSON.to_string())];

        let body = match call.body {
            Some(body) if call.verb.permits_body() => {
                Some(self.encode_body(body).await.map_err(RestError::<E>::Serialization)?)
            }
            Some(_) => {
                debug!(verb = %call.verb, "body ignored for verb without payload");
                None
            }
            None => None,
        };

        for (name, value) in call.headers.iter() {
            match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some(slot) => *slot = (name.to_string(), value.to_string()),
                None => headers.push((name.to_string(), value.to_string())),
            }
        }

        debug!(
            verb = %call.verb,
            %uri,
            body_len = body.as_ref().map_or(0, Vec::len),
            "request built"
        );

        Ok(HttpRequest {
            method: call.verb,
            uri,
            headers,
            body,
            timeout: call.timeout,
        })
    }

    async fn resolve_uri<Q>(&self, endpoint: &str, query: Option<&Q>) -> Result<String, AdapterError>
    where
        Q: QueryValue + ?Sized,
    {
        let Some(query) = query else {
            return Ok(endpoint.to_string());
        };
        let segment = match query.literal() {
            Some(text) => text,
            None => {
                let text = self.adapter.serialize(query).await?;
                urlencoding::encode(&text).into_owned()
            }
        };
        Ok(format!("{}/{}", endpoint.trim_end_matches('/'), segment))
    }

    async fn encode_body<B>(&self, body: &B) -> Result<Vec<u8>, AdapterError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let text = self.adapter.serialize(body).await?;
        let bytes = self.adapter.encode_bytes(&text).await?;
        match self.compression {
            Some(filter) => filter.compress(&bytes),
            None => Ok(bytes),
        }
    }
}
