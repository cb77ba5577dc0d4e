//! Transport seam and the reqwest-backed implementation.
//!
//! A `Transport` performs one exchange and reports timeouts as
//! `TransportError::TimedOut`, so the client never has to guess from error
//! text. Non-2xx responses are returned as data; classifying them is the
//! client's job.

use std::fmt;

use async_trait::async_trait;
use futures::TryStreamExt;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ResponseMeta};

/// Sends a built request over HTTP.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `Transport` on top of a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Other(Box::new(e)))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client (proxies, TLS roots, pooling).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        let mut req_builder = self
            .client
            .request(method, request.uri.as_str())
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let resp = req_builder.send().await.map_err(classify_reqwest_error)?;

        let meta = ResponseMeta {
            status: resp.status().as_u16(),
            headers: resp
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            content_length: resp.content_length(),
        };

        let stream = resp.bytes_stream().map_err(classify_reqwest_error);
        Ok(HttpResponse::new(meta, Box::pin(stream)))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::TimedOut
    } else if err.is_connect() {
        TransportError::Connect(Box::new(err))
    } else {
        TransportError::Other(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_builds_with_defaults() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let transport = ReqwestTransport::new().unwrap();
        let request = HttpRequest {
            method: HttpMethod::Get,
            uri: "http://127.0.0.1:1/items".to_string(),
            headers: Vec::new(),
            body: None,
            timeout: std::time::Duration::from_secs(5),
        };
        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }
}
