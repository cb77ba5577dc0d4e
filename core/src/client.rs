//! Generic REST client.
//!
//! # Design
//! `RestClient` holds only configuration: endpoint, adapter, transport,
//! headers, timeout, read mode and the declared error type. Calls take
//! `&self`, so the configuration cannot change while a call is in flight;
//! every call copies the headers into a fresh `CallDescriptor` and owns all of
//! its buffers. The whole pipeline (adapter work, send, body read and
//! deserialization) runs under the configured timeout; expiry is reported as
//! `RestError::Timeout`.

use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument, Span};

use crate::adapter::{Compression, SerializationAdapter};
use crate::classify::classify;
use crate::config::ClientConfig;
use crate::error::{ConfigError, ReadError, RestError, TransportError, Undeclared};
use crate::http::{HeaderSet, HttpMethod, HttpRequest};
use crate::request::{CallDescriptor, QueryValue, RequestBuilder};
use crate::response::{Materializer, ReadMode, RestResponse};
use crate::transport::{ReqwestTransport, Transport};

/// REST client over a base endpoint.
///
/// `A` is the serialization adapter, `E` the error payload type declared with
/// [`RestClient::with_error_type`].
pub struct RestClient<A, E = Undeclared> {
    endpoint: String,
    adapter: A,
    transport: Arc<dyn Transport>,
    headers: HeaderSet,
    timeout: Duration,
    read_mode: ReadMode,
    compression: Option<Arc<dyn Compression>>,
    error_type_declared: bool,
    _error: PhantomData<fn() -> E>,
}

impl<A: Clone, E> Clone for RestClient<A, E> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            adapter: self.adapter.clone(),
            transport: Arc::clone(&self.transport),
            headers: self.headers.clone(),
            timeout: self.timeout,
            read_mode: self.read_mode,
            compression: self.compression.clone(),
            error_type_declared: self.error_type_declared,
            _error: PhantomData,
        }
    }
}

impl<A, E> fmt::Debug for RestClient<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("endpoint", &self.endpoint)
            .field("transport", &self.transport)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("read_mode", &self.read_mode)
            .field("compression", &self.compression)
            .field("error_type_declared", &self.error_type_declared)
            .finish()
    }
}

impl<A: SerializationAdapter> RestClient<A, Undeclared> {
    pub fn new(adapter: A, endpoint: &str) -> Result<Self, ConfigError> {
        Self::from_config(adapter, ClientConfig::new(endpoint))
    }

    /// Create a client over the default reqwest transport.
    pub fn from_config(adapter: A, config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = ReqwestTransport::new().map_err(ConfigError::Transport)?;
        Ok(Self {
            endpoint: config.endpoint,
            adapter,
            transport: Arc::new(transport),
            headers: config.headers,
            timeout: config.timeout,
            read_mode: config.read_mode,
            compression: None,
            error_type_declared: false,
            _error: PhantomData,
        })
    }
}

impl<A, E> RestClient<A, E> {
    /// Declare the type server error bodies are deserialized into.
    ///
    /// Declaring `Undeclared` is the same as declaring nothing: error bodies
    /// are kept as raw text.
    pub fn with_error_type<E2: 'static>(self) -> RestClient<A, E2> {
        RestClient {
            endpoint: self.endpoint,
            adapter: self.adapter,
            transport: self.transport,
            headers: self.headers,
            timeout: self.timeout,
            read_mode: self.read_mode,
            compression: self.compression,
            error_type_declared: TypeId::of::<E2>() != TypeId::of::<Undeclared>(),
            _error: PhantomData,
        }
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    pub fn with_compression(mut self, compression: impl Compression + 'static) -> Self {
        self.compression = Some(Arc::new(compression));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn read_mode(&self) -> ReadMode {
        self.read_mode
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderSet {
        &mut self.headers
    }
}

impl<A, E> RestClient<A, E>
where
    A: SerializationAdapter,
    E: DeserializeOwned + Send,
{
    // --- GET ---

    pub async fn get<R>(&self) -> Result<RestResponse<R>, RestError<E>>
    where
        R: DeserializeOwned + Send,
    {
        self.call::<R, (), ()>(HttpMethod::Get, None, None).await
    }

    pub async fn get_with_query<R, Q>(&self, query: &Q) -> Result<RestResponse<R>, RestError<E>>
    where
        R: DeserializeOwned + Send,
        Q: QueryValue + ?Sized,
    {
        self.call::<R, (), Q>(HttpMethod::Get, None, Some(query)).await
    }

    /// GET and return the body text without deserializing it.
    pub async fn get_text(&self) -> Result<RestResponse<String>, RestError<E>> {
        self.call_text::<(), ()>(HttpMethod::Get, None, None).await
    }

    // --- POST ---

    pub async fn post<R, B>(&self, body: &B) -> Result<RestResponse<R>, RestError<E>>
    where
        R: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
    {
        self.call::<R, B, ()>(HttpMethod::Post, Some(body), None).await
    }

    pub async fn post_empty<R>(&self) -> Result<RestResponse<R>, RestError<E>>
    where
        R: DeserializeOwned + Send,
    {
        self.call::<R, (), ()>(HttpMethod::Post, None, None).await
    }

    pub async fn post_with_query<B, Q>(
        &self,
        body: &B,
        query: &Q,
    ) -> Result<RestResponse<String>, RestError<E>>
    where
        B: Serialize + Sync + ?Sized,
        Q: QueryValue + ?Sized,
    {
        self.call_text(HttpMethod::Post, Some(body), Some(query)).await
    }

    // --- PUT ---

    pub async fn put<R, B, Q>(&self, body: &B, query: &Q) -> Result<RestResponse<R>, RestError<E>>
    where
        R: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
        Q: QueryValue + ?Sized,
    {
        self.call::<R, B, Q>(HttpMethod::Put, Some(body), Some(query))
            .await
    }

    // --- generic entry points ---

    /// Make a call and deserialize the response body into `R`.
    pub async fn call<R, B, Q>(
        &self,
        verb: HttpMethod,
        body: Option<&B>,
        query: Option<&Q>,
    ) -> Result<RestResponse<R>, RestError<E>>
    where
        R: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
        Q: QueryValue + ?Sized,
    {
        let call = self.descriptor(verb, body, query);
        let pipeline = async {
            match self.execute(call).await {
                Ok(raw) => self.materializer().deserialize::<R, E>(raw).await,
                Err(err) => Err(err),
            }
        };
        self.with_deadline(pipeline).instrument(self.span(verb)).await
    }

    /// Make a call and return the decoded body text as-is.
    pub async fn call_text<B, Q>(
        &self,
        verb: HttpMethod,
        body: Option<&B>,
        query: Option<&Q>,
    ) -> Result<RestResponse<String>, RestError<E>>
    where
        B: Serialize + Sync + ?Sized,
        Q: QueryValue + ?Sized,
    {
        let call = self.descriptor(verb, body, query);
        self.with_deadline(self.execute(call))
            .instrument(self.span(verb))
            .await
    }

    /// Like [`RestClient::call`], but resolves to `RestError::Cancelled` as
    /// soon as `token` is cancelled.
    pub async fn call_with_cancel<R, B, Q>(
        &self,
        token: &CancellationToken,
        verb: HttpMethod,
        body: Option<&B>,
        query: Option<&Q>,
    ) -> Result<RestResponse<R>, RestError<E>>
    where
        R: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
        Q: QueryValue + ?Sized,
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!(verb = %verb, endpoint = %self.endpoint, "REST call cancelled");
                Err(RestError::Cancelled)
            }
            result = self.call(verb, body, query) => result,
        }
    }

    fn descriptor<'a, B: ?Sized, Q: ?Sized>(
        &'a self,
        verb: HttpMethod,
        body: Option<&'a B>,
        query: Option<&'a Q>,
    ) -> CallDescriptor<'a, B, Q> {
        CallDescriptor {
            endpoint: &self.endpoint,
            verb,
            body,
            query,
            headers: self.headers.clone(),
            timeout: self.timeout,
            read_mode: self.read_mode,
        }
    }

    fn span(&self, verb: HttpMethod) -> Span {
        tracing::debug_span!(
            "rest_call",
            verb = %verb,
            endpoint = %self.endpoint,
            uri = tracing::field::Empty,
        )
    }

    async fn with_deadline<T>(
        &self,
        pipeline: impl Future<Output = Result<T, RestError<E>>>,
    ) -> Result<T, RestError<E>> {
        match tokio::time::timeout(self.timeout, pipeline).await {
            Ok(result) => result,
            Err(_elapsed) => Err(timed_out(self.timeout)),
        }
    }

    fn materializer(&self) -> Materializer<'_, A> {
        Materializer::new(&self.adapter, self.compression.as_deref())
    }

    async fn execute<B, Q>(
        &self,
        call: CallDescriptor<'_, B, Q>,
    ) -> Result<RestResponse<String>, RestError<E>>
    where
        B: Serialize + Sync + ?Sized,
        Q: QueryValue + ?Sized,
    {
        let request = RequestBuilder::new(&self.adapter, self.compression.as_deref())
            .build::<B, Q, E>(&call)
            .await?;
        Span::current().record("uri", tracing::field::display(&request.uri));

        self.round_trip(request, call.read_mode).await
    }

    async fn round_trip(
        &self,
        request: HttpRequest,
        read_mode: ReadMode,
    ) -> Result<RestResponse<String>, RestError<E>> {
        let timeout = request.timeout;
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(TransportError::TimedOut) => return Err(timed_out(timeout)),
            Err(other) => return Err(RestError::Transport(other)),
        };

        debug!(
            status = response.status(),
            content_length = ?response.meta.content_length,
            "response received"
        );

        let materializer = self.materializer();
        if !response.is_success() {
            return Err(
                classify(
                    &materializer,
                    response,
                    read_mode,
                    timeout,
                    self.error_type_declared,
                )
                .await,
            );
        }

        materializer
            .materialize_text(response, read_mode)
            .await
            .map_err(|err| match err {
                ReadError::Stream(TransportError::TimedOut) => timed_out(timeout),
                other => RestError::ResponseRead(other),
            })
    }
}

pub(crate) fn timed_out<E>(timeout: Duration) -> RestError<E> {
    let seconds = timeout.as_secs();
    warn!(seconds, "REST call timed out");
    RestError::Timeout { seconds }
}
