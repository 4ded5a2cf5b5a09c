//! # Stateless REST utilities and request/response mapping
//!
//! Every provisioning call is a `POST {host}/rest/{action}` with a compact JSON
//! body. The server reports failures in the body, not the status line:
//!
//! - Body is an object carrying `errorMessage`: [`ClientError::Remote`], with
//!   whatever status it arrived with (usually 200).
//! - Otherwise non-2xx: [`ClientError::Http`] with the raw body.
//! - Otherwise 2xx: [`Response`], parsed into the endpoint's typed output on
//!   demand.

use crate::error::{
    ClientError, ClientResult, DecodeError, EncodeError, HttpError, RemoteError, TransportError,
};
use crate::http_client::HttpClient;
use bytes::Bytes;
use http::{
    HeaderName, HeaderValue, Request, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use url::Url;

/// Path prefix all provisioning actions live under
pub const REST_PREFIX: &str = "/rest/";

/// Remote provisioning actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Fetch the client-relevant server configuration
    Config,
    /// Suggest usernames for a person
    Suggest,
    /// Keep one suggested username and release the rest
    Select,
    /// Create the directory account
    Create,
}

impl Action {
    /// Path segment after `/rest/`
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Suggest => "suggest",
            Self::Select => "select",
            Self::Create => "create",
        }
    }

    /// Build the absolute URL of this action under `base`.
    ///
    /// Any path already on `base` is kept, so the API can be mounted below a
    /// prefix.
    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        let mut path = url.path().trim_end_matches('/').to_owned();
        path.push_str(REST_PREFIX);
        path.push_str(self.as_str());
        url.set_path(&path);
        url.set_query(None);
        url
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for provisioning request types
///
/// Implemented on the request body type itself; carries the action it is sent
/// to and the shape of a successful reply.
pub trait Endpoint: Serialize {
    /// Which action this request is sent to
    const ACTION: Action;

    /// Successful response body
    type Output: DeserializeOwned;

    /// Encode the request body.
    ///
    /// Default implementation serializes to compact JSON.
    fn encode_body(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a successful response body.
    fn decode_output(body: &[u8]) -> Result<Self::Output, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Per-request options for REST calls.
#[derive(Debug, Default, Clone)]
pub struct CallOptions {
    /// Extra headers to attach to this request.
    pub extra_headers: Vec<(HeaderName, HeaderValue)>,
}

/// Extension for stateless REST calls on any `HttpClient`.
///
/// Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use provisioner_common::rest::RestExt;
/// use provisioner_common::types::ServerConfig;
/// use provisioner_common::api::config::GetConfig;
///
/// let http = reqwest::Client::new();
/// let base = url::Url::parse("http://localhost:8080")?;
/// let config: ServerConfig = http.rest(base).send(&GetConfig).await?.into_output()?;
/// # Ok(())
/// # }
/// ```
pub trait RestExt: HttpClient {
    /// Start building a REST call for the given base URL.
    fn rest<'a>(&'a self, base: Url) -> RestCall<'a, Self>
    where
        Self: Sized,
    {
        RestCall {
            client: self,
            base,
            opts: CallOptions::default(),
        }
    }
}

impl<T: HttpClient> RestExt for T {}

/// Stateful REST call trait
///
/// Implemented by clients that know their host and decide how calls are
/// dispatched (directly, or one at a time through a queue).
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait RestClient {
    /// Get the base URI for the client.
    fn base_uri(&self) -> Url;

    /// Send a provisioning request and check the response envelope
    fn send<R>(&self, request: R) -> impl Future<Output = ClientResult<Response<R>>>
    where
        R: Endpoint + Send + Sync;
}

/// Stateless REST call builder.
pub struct RestCall<'a, C: HttpClient> {
    pub(crate) client: &'a C,
    pub(crate) base: Url,
    pub(crate) opts: CallOptions,
}

impl<'a, C: HttpClient> RestCall<'a, C> {
    /// Add an extra header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.opts.extra_headers.push((name, value));
        self
    }
    /// Replace the builder's options entirely.
    pub fn with_options(mut self, opts: CallOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Send the given typed request and return a response wrapper.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, request), fields(action = %R::ACTION)))]
    pub async fn send<R>(self, request: &R) -> ClientResult<Response<R>>
    where
        R: Endpoint,
    {
        let http_request = build_http_request(&self.base, request, &self.opts)?;

        let http_response = self
            .client
            .send_http(http_request)
            .await
            .map_err(TransportError::from_client_error)?;

        process_response(http_response)
    }
}

/// Build an HTTP request for a provisioning call given base URL and options
pub fn build_http_request<R>(
    base: &Url,
    req: &R,
    opts: &CallOptions,
) -> core::result::Result<Request<Vec<u8>>, ClientError>
where
    R: Endpoint,
{
    let body = req.encode_body()?;
    build_raw_request(base, R::ACTION, body, opts)
}

/// Build an HTTP request from an already-encoded body.
///
/// Used where the typed request has been erased, such as the request queue.
pub fn build_raw_request(
    base: &Url,
    action: Action,
    body: Vec<u8>,
    opts: &CallOptions,
) -> core::result::Result<Request<Vec<u8>>, ClientError> {
    let url = action.url(base);

    let mut builder = Request::builder()
        .method(http::Method::POST)
        .uri(url.as_str())
        .header(ACCEPT, "application/json");
    if !body.is_empty() {
        builder = builder.header(CONTENT_TYPE, "application/json");
    }
    for (name, value) in &opts.extra_headers {
        builder = builder.header(name, value);
    }

    builder
        .body(body)
        .map_err(|e| TransportError::InvalidRequest(e.to_string()).into())
}

/// Process the HTTP response from the server into a typed response statelessly.
///
/// The body is inspected before the status, since the server signals errors
/// with an `errorMessage` field.
#[inline]
pub fn process_response<R>(http_response: http::Response<Vec<u8>>) -> ClientResult<Response<R>>
where
    R: Endpoint,
{
    let status = http_response.status();
    let buffer = Bytes::from(http_response.into_body());

    if let Some(remote) = remote_error(&buffer, status) {
        #[cfg(feature = "tracing")]
        tracing::debug!(%status, message = %remote.error_message, "server reported an error");
        return Err(remote.into());
    }

    if !status.is_success() {
        return Err(HttpError {
            status,
            body: Some(buffer),
        }
        .into());
    }

    Ok(Response::new(buffer, status))
}

/// Extract an `errorMessage` envelope from a response body, if there is one.
pub fn remote_error(body: &[u8], status: StatusCode) -> Option<RemoteError> {
    // only objects; serde would happily read a struct out of a JSON array
    let value = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        _ => return None,
    };
    serde_json::from_value::<RemoteError>(value)
        .ok()
        .map(|mut remote| {
            remote.status = status;
            remote
        })
}

/// REST response wrapper that owns the response buffer
pub struct Response<R>
where
    R: Endpoint,
{
    _marker: PhantomData<fn() -> R>,
    buffer: Bytes,
    status: StatusCode,
}

impl<R> Response<R>
where
    R: Endpoint,
{
    /// Create a new response from a buffer and status code
    pub fn new(buffer: Bytes, status: StatusCode) -> Self {
        Self {
            buffer,
            status,
            _marker: PhantomData,
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the raw buffer
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Parse the response body into the endpoint's output
    pub fn parse(&self) -> Result<R::Output, ClientError> {
        Ok(R::decode_output(&self.buffer)?)
    }

    /// Consume the response and parse the output
    pub fn into_output(self) -> Result<R::Output, ClientError> {
        self.parse()
    }
}

impl<R: Endpoint> fmt::Debug for Response<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("action", &R::ACTION)
            .field("status", &self.status)
            .field("buffer", &String::from_utf8_lossy(&self.buffer))
            .finish()
    }
}
