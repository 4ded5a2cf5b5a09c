//! Strict FIFO request queue with at most one call in flight.
//!
//! The provisioning server is not safe for overlapping calls from one client
//! context, so interactive sessions push every call through a
//! [`RequestQueue`]. Callbacks run in enqueue order, each one before the next
//! call is dispatched.
//!
//! There is no cancellation. A call whose transport never completes stalls
//! every call queued behind it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use provisioner_common::{
    error::{ClientError, ClientResult, TransportError},
    http_client::HttpClient,
    rest::{Action, CallOptions, Endpoint, Response, RestClient, build_raw_request, process_response},
};
use tokio::sync::oneshot;
use url::Url;

use super::ProvisioningOptions;

/// Callback run with the outcome of a queued call.
pub type Completion = Box<dyn FnOnce(ClientResult<http::Response<Vec<u8>>>) + Send + 'static>;

/// A call waiting in, or being dispatched from, a [`RequestQueue`].
pub struct QueuedCall {
    /// Remote action to invoke
    pub action: Action,
    /// Encoded request body
    pub payload: Vec<u8>,
    /// Runs once the call completes, before the next call is dispatched
    pub on_complete: Completion,
}

impl QueuedCall {
    /// Wrap an encoded body and its completion callback.
    pub fn new<F>(action: Action, payload: Vec<u8>, on_complete: F) -> Self
    where
        F: FnOnce(ClientResult<http::Response<Vec<u8>>>) + Send + 'static,
    {
        Self {
            action,
            payload,
            on_complete: Box::new(on_complete),
        }
    }

    /// Encode a typed request into a queued call.
    pub fn encode<R, F>(request: &R, on_complete: F) -> ClientResult<Self>
    where
        R: Endpoint,
        F: FnOnce(ClientResult<http::Response<Vec<u8>>>) + Send + 'static,
    {
        Ok(Self::new(R::ACTION, request.encode_body()?, on_complete))
    }
}

impl std::fmt::Debug for QueuedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedCall")
            .field("action", &self.action)
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedCall>,
    busy: bool,
}

struct QueueInner<C> {
    http: C,
    base: Url,
    opts: CallOptions,
    state: Mutex<QueueState>,
}

impl<C> QueueInner<C> {
    // never held across an await
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Serializes calls to the provisioning server.
///
/// Cloning yields another handle to the same queue.
pub struct RequestQueue<C = reqwest::Client> {
    inner: Arc<QueueInner<C>>,
}

impl<C> Clone for RequestQueue<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl RequestQueue<reqwest::Client> {
    /// Queue for `base` backed by a default `reqwest::Client`.
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }
}

impl<C> RequestQueue<C> {
    /// Queue for `base` using the given HTTP client.
    pub fn with_client(http: C, base: Url) -> Self {
        Self::build(http, base, CallOptions::default())
    }

    /// Queue built from connection settings.
    pub fn from_options(http: C, options: &ProvisioningOptions) -> Result<Self, TransportError> {
        Ok(Self::build(http, options.host.clone(), options.call_options()?))
    }

    fn build(http: C, base: Url, opts: CallOptions) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                http,
                base,
                opts,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// A call is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.inner.state().busy
    }

    /// Number of calls waiting behind the one in flight.
    pub fn len(&self) -> usize {
        self.inner.state().pending.len()
    }

    /// Nothing is waiting to be dispatched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> RequestQueue<C>
where
    C: HttpClient + Send + Sync + 'static,
{
    /// Append a call. If the queue is idle, start draining it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, call: QueuedCall) {
        let start = {
            let mut state = self.inner.state();
            state.pending.push_back(call);
            !std::mem::replace(&mut state.busy, true)
        };
        if start {
            tokio::spawn(drain(self.inner.clone()));
        }
    }

    /// Enqueue a raw call and wait for its response.
    pub async fn call(
        &self,
        action: Action,
        payload: Vec<u8>,
    ) -> ClientResult<http::Response<Vec<u8>>> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(QueuedCall::new(action, payload, move |result| {
            // receiver gone means the caller stopped waiting
            let _ = tx.send(result);
        }));
        rx.await.map_err(|_| {
            ClientError::Transport(TransportError::Other(
                "request queue dropped the call before it completed".into(),
            ))
        })?
    }
}

async fn drain<C>(inner: Arc<QueueInner<C>>)
where
    C: HttpClient + Send + Sync + 'static,
{
    loop {
        let next = {
            let mut state = inner.state();
            match state.pending.pop_front() {
                Some(call) => call,
                None => {
                    state.busy = false;
                    #[cfg(feature = "tracing")]
                    tracing::trace!("request queue idle");
                    return;
                }
            }
        };
        let QueuedCall {
            action,
            payload,
            on_complete,
        } = next;
        let result = dispatch(&inner, action, payload).await;
        on_complete(result);
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(inner, payload)))]
async fn dispatch<C>(
    inner: &QueueInner<C>,
    action: Action,
    payload: Vec<u8>,
) -> ClientResult<http::Response<Vec<u8>>>
where
    C: HttpClient + Send + Sync,
{
    let request = build_raw_request(&inner.base, action, payload, &inner.opts)?;
    let response = inner
        .http
        .send_http(request)
        .await
        .map_err(TransportError::from_client_error)?;
    Ok(response)
}

impl<C> RestClient for RequestQueue<C>
where
    C: HttpClient + Send + Sync + 'static,
{
    fn base_uri(&self) -> Url {
        self.inner.base.clone()
    }

    async fn send<R>(&self, request: R) -> ClientResult<Response<R>>
    where
        R: Endpoint + Send + Sync,
    {
        let payload = request.encode_body()?;
        let response = self.call(R::ACTION, payload).await?;
        process_response(response)
    }
}
