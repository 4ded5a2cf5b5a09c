//! Provisioning API clients
//!
//! Two dispatch strategies share the [`RestClient`] trait:
//!
//! - [`BasicClient`] sends every call as soon as it is made. Used for bulk
//!   provisioning, where calls for different people are independent.
//! - [`RequestQueue`] lets only one call be in flight at a time and completes
//!   them in the order they were enqueued. Used for interactive sessions,
//!   where the server must see a release before the next suggest.

pub mod queue;

use std::sync::Arc;

use http::{HeaderValue, header::USER_AGENT};
use provisioner_common::{
    error::{ClientResult, TransportError},
    http_client::HttpClient,
    rest::{CallOptions, Endpoint, Response, RestClient, RestExt},
};
use smol_str::SmolStr;
use url::Url;

pub use queue::{QueuedCall, RequestQueue};

/// Default address of a locally running provisioning server.
pub const DEFAULT_HOST: &str = "http://localhost:8080";

/// Connection settings shared by both client flavours.
#[derive(Debug, Clone, bon::Builder)]
pub struct ProvisioningOptions {
    /// Base URL of the provisioning server (the part before `/rest/...`)
    pub host: Url,
    /// Optional `User-Agent` header value
    #[builder(into)]
    pub user_agent: Option<SmolStr>,
}

impl ProvisioningOptions {
    /// Per-call options derived from these settings
    pub fn call_options(&self) -> Result<CallOptions, TransportError> {
        let mut opts = CallOptions::default();
        if let Some(agent) = &self.user_agent {
            let value = HeaderValue::from_str(agent)
                .map_err(|e| TransportError::InvalidRequest(format!("invalid user agent: {e}")))?;
            opts.extra_headers.push((USER_AGENT, value));
        }
        Ok(opts)
    }
}

/// Client that dispatches every call immediately.
pub struct BasicClient<C = reqwest::Client> {
    http: Arc<C>,
    base: Url,
    opts: CallOptions,
}

impl BasicClient<reqwest::Client> {
    /// Create a client for `base` backed by a default `reqwest::Client`.
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }
}

impl<C> BasicClient<C> {
    /// Create a client for `base` using the given HTTP client.
    pub fn with_client(http: C, base: Url) -> Self {
        Self {
            http: Arc::new(http),
            base,
            opts: CallOptions::default(),
        }
    }

    /// Create a client from connection settings.
    pub fn from_options(http: C, options: &ProvisioningOptions) -> Result<Self, TransportError> {
        Ok(Self {
            http: Arc::new(http),
            base: options.host.clone(),
            opts: options.call_options()?,
        })
    }

    /// Shared handle to the underlying HTTP client
    pub fn http(&self) -> Arc<C> {
        self.http.clone()
    }
}

impl<C> Clone for BasicClient<C> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base: self.base.clone(),
            opts: self.opts.clone(),
        }
    }
}

impl<C: HttpClient + Send + Sync> RestClient for BasicClient<C> {
    fn base_uri(&self) -> Url {
        self.base.clone()
    }

    async fn send<R>(&self, request: R) -> ClientResult<Response<R>>
    where
        R: Endpoint + Send + Sync,
    {
        self.http
            .as_ref()
            .rest(self.base.clone())
            .with_options(self.opts.clone())
            .send(&request)
            .await
    }
}
