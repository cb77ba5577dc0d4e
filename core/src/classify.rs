//! Error classifier for non-2xx responses.
//!
//! Every non-2xx response becomes `RestError::Rest`. With a declared error
//! type the body is deserialized into it; a failure on that path is reported
//! as `RestError::ErrorHandling` carrying the status and the secondary cause.
//! A body stream that times out is still reported as `RestError::Timeout`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::adapter::SerializationAdapter;
use crate::client::timed_out;
use crate::error::{ReadError, RestError, RestException, TransportError};
use crate::http::HttpResponse;
use crate::response::{Materializer, ReadMode};

pub(crate) async fn classify<A, E>(
    materializer: &Materializer<'_, A>,
    response: HttpResponse,
    mode: ReadMode,
    timeout: Duration,
    decode_error: bool,
) -> RestError<E>
where
    A: SerializationAdapter,
    E: DeserializeOwned + Send,
{
    let (meta, body) = response.into_parts();
    let status = meta.status;

    let text = match materializer.read_text(&meta, body, mode).await {
        Ok(text) => text,
        Err(ReadError::Stream(TransportError::TimedOut)) => return timed_out(timeout),
        Err(err) => {
            error!(status, error = %err, "failed to read error body from web server");
            return RestError::ErrorHandling {
                status,
                source: Box::new(err),
            };
        }
    };

    let payload = if decode_error {
        match materializer.adapter().deserialize::<E>(&text).await {
            Ok(payload) => Some(payload),
            Err(err) => {
                error!(status, error = %err, "failed to decode error body from web server");
                return RestError::ErrorHandling {
                    status,
                    source: Box::new(err),
                };
            }
        }
    } else {
        None
    };

    warn!(status, "server returned an error status");
    RestError::Rest(RestException {
        status,
        body: text,
        error: payload,
        response: meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::JsonAdapter;
    use crate::error::Undeclared;
    use crate::http::{BodyStream, ResponseMeta};
    use bytes::Bytes;
    use serde::Deserialize;

    const TIMEOUT: Duration = Duration::from_secs(4);

    #[derive(Debug, Deserialize)]
    struct ErrorModel {
        error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    fn materializer() -> Materializer<'static, JsonAdapter> {
        Materializer::new(&JsonAdapter, None)
    }

    fn bad_request() -> HttpResponse {
        HttpResponse::from_bytes(
            400,
            vec![("content-type".to_string(), "application/json".to_string())],
            r#"{"error":{"message":"bad input"}}"#,
        )
    }

    #[tokio::test]
    async fn declared_error_type_is_exposed() {
        let err = classify::<_, ErrorModel>(&materializer(), bad_request(), ReadMode::ReadToEnd, TIMEOUT, true).await;
        match err {
            RestError::Rest(rex) => {
                assert_eq!(rex.status, 400);
                assert_eq!(rex.error.unwrap().error.message, "bad input");
                assert_eq!(rex.response.header("Content-Type"), Some("application/json"));
            }
            other => panic!("expected Rest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undeclared_error_type_keeps_body_only() {
        let err = classify::<_, Undeclared>(&materializer(), bad_request(), ReadMode::ReadToEnd, TIMEOUT, false).await;
        match err {
            RestError::Rest(rex) => {
                assert!(rex.error.is_none());
                assert_eq!(rex.body, r#"{"error":{"message":"bad input"}}"#);
            }
            other => panic!("expected Rest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_error_body_is_wrapped() {
        let response = HttpResponse::from_bytes(500, Vec::new(), "<html>boom</html>");
        let err = classify::<_, ErrorModel>(&materializer(), response, ReadMode::ReadToEnd, TIMEOUT, true).await;
        assert!(matches!(err, RestError::ErrorHandling { status: 500, .. }));
        assert!(err.to_string().starts_with("Error handling Error from web server"));
    }

    #[tokio::test]
    async fn unreadable_error_body_is_wrapped() {
        let response = HttpResponse::chunked(503, Vec::new(), vec![Bytes::from_static(b"down")]);
        let err = classify::<_, ErrorModel>(&materializer(), response, ReadMode::Bounded, TIMEOUT, true).await;
        match err {
            RestError::ErrorHandling { status, source } => {
                assert_eq!(status, 503);
                let cause = source.downcast_ref::<ReadError>().unwrap();
                assert!(matches!(cause, ReadError::LengthUnknown));
            }
            other => panic!("expected ErrorHandling, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_body_timeout_stays_a_timeout() {
        let meta = ResponseMeta {
            status: 502,
            headers: Vec::new(),
            content_length: None,
        };
        let body: BodyStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"err")),
            Err(TransportError::TimedOut),
        ]));
        let response = HttpResponse::new(meta, body);
        let err = classify::<_, ErrorModel>(&materializer(), response, ReadMode::ReadToEnd, TIMEOUT, true).await;
        assert!(matches!(err, RestError::Timeout { seconds: 4 }), "got {err:?}");
    }
}
