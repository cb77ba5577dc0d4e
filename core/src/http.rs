//! HTTP wire types shared by the builder, the transport and the materializer.
//!
//! # Design
//! Requests are plain data: the builder produces an `HttpRequest`, a
//! `Transport` executes it. Responses keep their body as a byte stream so the
//! materializer can choose between reading to end and a bounded read of the
//! advertised length. Once the body is consumed only `ResponseMeta` survives,
//! and that is what callers see on the response envelope.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;

use crate::error::TransportError;

/// Media type sent with every request. There is no content negotiation.
pub const CONTENT_TYPE_JSON: &str = "application/json";

pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send + 'static>>;

/// HTTP verb of a call.
///
/// Only `Get`, `Post` and `Put` are executed; the remaining variants exist so
/// callers can name them and get `RestError::UnsupportedVerb` back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Whether the request builder knows how to send this verb.
    pub fn is_supported(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Post | HttpMethod::Put)
    }

    /// Whether a body supplied with this verb is written to the wire.
    pub fn permits_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered header mapping.
///
/// Keys are compared case-sensitively; inserting an existing key replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Deadline the transport should enforce for the whole exchange.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Case-insensitive header lookup, as HTTP treats names.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Status line and headers of a response, without its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Advertised `Content-Length`; `None` when the server did not send one.
    pub content_length: Option<u64>,
}

impl ResponseMeta {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response as returned by a `Transport`, body still unread.
pub struct HttpResponse {
    pub meta: ResponseMeta,
    pub body: BodyStream,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("meta", &self.meta)
            .field("body", &"BodyStream(..)")
            .finish()
    }
}

impl HttpResponse {
    pub fn new(meta: ResponseMeta, body: BodyStream) -> Self {
        Self { meta, body }
    }

    /// A response with a fully buffered body and an advertised length.
    pub fn from_bytes(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let meta = ResponseMeta {
            status,
            headers,
            content_length: Some(body.len() as u64),
        };
        let stream = futures::stream::once(async move { Ok::<_, TransportError>(body) });
        Self::new(meta, Box::pin(stream))
    }

    /// A response whose body arrives in `chunks` and whose length is not advertised.
    pub fn chunked(status: u16, headers: Vec<(String, String)>, chunks: Vec<Bytes>) -> Self {
        let meta = ResponseMeta {
            status,
            headers,
            content_length: None,
        };
        let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, TransportError>));
        Self::new(meta, Box::pin(stream))
    }

    pub fn status(&self) -> u16 {
        self.meta.status
    }

    pub fn is_success(&self) -> bool {
        self.meta.is_success()
    }

    pub fn into_parts(self) -> (ResponseMeta, BodyStream) {
        (self.meta, self.body)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
