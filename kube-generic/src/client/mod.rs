//! The transport used by the generic client
//!
//! The [`Client`] executes fully built requests against a [`tower::Service`] stack
//! and hands back a [`RawResponse`] that is either decoded into an object or only checked for success.
//! It performs no retries; errors from the stack or the API server are surfaced as received.
use std::{future::Future, time::Duration};

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tower::{buffer::Buffer, util::BoxService, BoxError, Service, ServiceExt};

use crate::{error::ErrorResponse, Config, Error, Result};

mod builder;
mod config_ext;
pub mod middleware;

pub use builder::{ClientBuilder, DynBody, GenericService};
pub use config_ext::ConfigExt;

/// Client for connecting with a Kubernetes cluster.
///
/// Instantiate the client from an existing [`Config`] with [`Client::try_from`],
/// or from any compatible [`Service`] with [`Client::new`].
///
/// Cloning is cheap; clones share the same underlying stack.
#[derive(Clone)]
pub struct Client {
    // - `Buffer` for cheap clone
    // - `BoxFuture` for dynamic response future type
    inner: Buffer<Request<Vec<u8>>, BoxFuture<'static, Result<Response<Bytes>, BoxError>>>,
    default_ns: String,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl Client {
    /// Create a [`Client`] using a custom `Service` stack.
    ///
    /// [`ConfigExt`](crate::client::ConfigExt) provides extensions for
    /// building a custom stack.
    ///
    /// To create with the default stack with a [`Config`], use
    /// [`Client::try_from`].
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
    /// use bytes::Bytes;
    /// use http_body_util::Full;
    /// use hyper_util::rt::TokioExecutor;
    /// use kube_generic::{client::ConfigExt, Client, Config};
    /// use tower::ServiceBuilder;
    ///
    /// let config = Config::new("http://127.0.0.1:8001".parse()?);
    /// let hyper_client: hyper_util::client::legacy::Client<_, Full<Bytes>> =
    ///     hyper_util::client::legacy::Builder::new(TokioExecutor::new()).build(config.http_connector());
    /// let service = ServiceBuilder::new()
    ///     .layer(config.base_uri_layer())
    ///     .map_request(|req: http::Request<Vec<u8>>| req.map(|b| Full::new(Bytes::from(b))))
    ///     .service(hyper_client);
    /// let client = Client::new(service, config.default_namespace);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new<S, B, T>(service: S, default_namespace: T) -> Self
    where
        S: Service<Request<Vec<u8>>, Response = Response<B>> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
        T: Into<String>,
    {
        // Collect response bodies and use a type erased error to avoid type parameters.
        let service = service
            .map_err(Into::<BoxError>::into)
            .and_then(|res: Response<B>| async move {
                let (parts, body) = res.into_parts();
                let bytes = match body.collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(err) => return Err(Into::<BoxError>::into(err)),
                };
                Ok::<_, BoxError>(Response::from_parts(parts, bytes))
            });
        Self {
            inner: Buffer::new(BoxService::new(service), 1024),
            default_ns: default_namespace.into(),
            timeout: None,
            cancel: None,
        }
    }

    /// Bind an external cancellation signal to a clone of this client
    ///
    /// Every call issued through the returned client aborts its in-flight
    /// transport call with [`Error::Cancelled`] once the token fires.
    /// A [`GenericClient`](crate::GenericClient) on this client also stops waiting
    /// for metadata resolution, which may run on another client.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
            ..self.clone()
        }
    }

    /// Set the timeout applied to every call, `None` disables it
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The namespace used for namespaced objects without one
    pub fn default_namespace(&self) -> &str {
        &self.default_ns
    }

    /// Drive `fut` until it completes or the bound cancellation token fires
    ///
    /// The future is dropped on cancellation, which yields [`Error::Cancelled`].
    pub(crate) async fn cancellable<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("call cancelled");
                    Err(Error::Cancelled)
                }
                res = fut => res,
            },
            None => fut.await,
        }
    }

    /// Perform a raw HTTP request against the API and return the raw response back.
    ///
    /// Non-success statuses are not errors at this point, see [`RawResponse::error`].
    pub async fn send(&self, request: Request<Vec<u8>>) -> Result<RawResponse> {
        let verb = request.extensions().get::<&'static str>().copied().unwrap_or("HTTP");
        tracing::debug!(verb, uri = %request.uri(), "sending request");

        let mut svc = self.inner.clone();
        let call = async move {
            let res = svc
                .ready()
                .await
                .map_err(unbox_service_error)?
                .call(request)
                .await
                .map_err(unbox_service_error)?;
            Ok::<_, Error>(res)
        };
        let call = async move {
            match self.timeout {
                Some(timeout) => tokio::time::timeout(timeout, call)
                    .await
                    .map_err(|_| Error::Timeout)?,
                None => call.await,
            }
        };
        let res = self.cancellable(call).await?;

        let (parts, body) = res.into_parts();
        tracing::trace!(verb, status = %parts.status, "received response");
        Ok(RawResponse {
            status: parts.status,
            body,
        })
    }

    /// Perform a raw HTTP request against the API and deserialize the response
    /// as JSON to some known type.
    pub async fn request<T>(&self, request: Request<Vec<u8>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send(request).await?.json()
    }

    /// Perform a raw HTTP request against the API and get back the response
    /// as a string
    pub async fn request_text(&self, request: Request<Vec<u8>>) -> Result<String> {
        self.send(request).await?.text()
    }
}

fn unbox_service_error(err: BoxError) -> Error {
    // Error decorating request
    err.downcast::<Error>()
        .map(|e| *e)
        // Error from the stack
        .unwrap_or_else(Error::Service)
}

/// The result of an executed request, not yet interpreted
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    body: Bytes,
}

impl RawResponse {
    /// The HTTP status of the response
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The raw response body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Check for success without decoding the body
    pub fn error(self) -> Result<()> {
        handle_api_errors(&self.body, self.status)
    }

    /// Decode the body into an existing object, overwriting it in place
    ///
    /// The target is left untouched when the status is an error or the body does not decode.
    pub fn decode_into<K: DeserializeOwned>(self, obj: &mut K) -> Result<()> {
        *obj = self.json()?;
        Ok(())
    }

    /// Decode the body as a new value
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        handle_api_errors(&self.body, self.status)?;
        serde_json::from_slice(&self.body).map_err(|e| {
            tracing::warn!("{}, {:?}", String::from_utf8_lossy(&self.body), e);
            Error::Decode(e)
        })
    }

    /// The body as a string
    pub fn text(self) -> Result<String> {
        handle_api_errors(&self.body, self.status)?;
        String::from_utf8(self.body.to_vec()).map_err(Error::FromUtf8)
    }
}

/// Kubernetes returned error handling
///
/// Either kube returned an explicit ApiError struct,
/// or it someohow returned something we couldn't parse as one.
///
/// In either case, present an ApiError upstream.
/// The latter is probably a bug if encountered.
fn handle_api_errors(body: &[u8], s: StatusCode) -> Result<()> {
    if s.is_client_error() || s.is_server_error() {
        if let Ok(errdata) = serde_json::from_slice::<ErrorResponse>(body) {
            tracing::debug!("Unsuccessful: {:?}", errdata);
            Err(Error::Api(errdata))
        } else {
            let text = String::from_utf8_lossy(body);
            tracing::warn!("Unsuccessful data error parse: {}", text);
            let ae = ErrorResponse {
                status: s.to_string(),
                code: s.as_u16(),
                message: format!("{:?}", text),
                reason: "Failed to parse error data".into(),
            };
            tracing::debug!("Unsuccessful: {:?} (reconstruct)", ae);
            Err(Error::Api(ae))
        }
    } else {
        Ok(())
    }
}

impl TryFrom<Config> for Client {
    type Error = Error;

    /// Builds a default [`Client`] from a [`Config`], see [`ClientBuilder`] if more customization is required
    fn try_from(config: Config) -> Result<Self> {
        Ok(ClientBuilder::<GenericService>::try_from(config)?.build())
    }
}
