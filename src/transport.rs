//! Retrying HTTP transport.
//!
//! [`RetryTransport`] wraps a downstream `tower` service that executes HTTP requests and resends
//! requests whose response indicates a transient failure.
//!
//! Semantics:
//! - A request is a retry candidate when it is idempotent (by method, or by carrying an
//!   `Idempotency-Key`/`X-Idempotency-Key`) and its body can be sent again. This is decided once,
//!   before the first attempt.
//! - Retryable statuses are 408, 425, 429, 500, 502, 503, 504, plus 413 when the server sent
//!   `Retry-After`. Anything else is returned as-is.
//! - Downstream errors are returned immediately and never retried.
//! - The wait before a retry is the server's `Retry-After` when present, otherwise the current
//!   backoff interval with symmetric jitter applied.
//! - Cancellation is only observed while waiting. It ends the loop with the last response.
//! - A body rewind failure also ends the loop with the last response.
//! - Superseded response bodies are drained before the next attempt. The returned response is
//!   never touched.
//! - Retries are unbounded unless [`RetryTransportBuilder::max_retries`] is set.
//!
//! Example
//! ```rust
//! use http::{Request, Response, StatusCode};
//! use retryhttp::{Body, InstantSleeper, RetryContext, RetryTransport};
//! use std::convert::Infallible;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = calls.clone();
//! let next = tower::service_fn(move |_req: Request<Body>| {
//!     let attempt = counter.fetch_add(1, Ordering::SeqCst);
//!     async move {
//!         let status = if attempt < 2 { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::OK };
//!         let mut resp = Response::new(Body::empty());
//!         *resp.status_mut() = status;
//!         Ok::<_, Infallible>(resp)
//!     }
//! });
//!
//! let transport = RetryTransport::builder()
//!     .initial_interval(Duration::from_millis(10))
//!     .with_sleeper(InstantSleeper)
//!     .build(next);
//!
//! let req = Request::get("http://example.com/").body(Body::empty()).unwrap();
//! let resp = transport.execute(req, RetryContext::default()).await.unwrap();
//! assert_eq!(resp.status(), StatusCode::OK);
//! assert_eq!(calls.load(Ordering::SeqCst), 3);
//! # });
//! ```

use crate::backoff::Backoff;
use crate::body::Body;
use crate::classify::{is_request_idempotent, is_request_rewindable, is_response_retryable};
use crate::clock::{Clock, SystemClock};
use crate::config::{
    RetryTransportConfig, DEFAULT_INITIAL_INTERVAL, DEFAULT_INTERVAL_MULTIPLIER,
    DEFAULT_JITTER_FACTOR, DEFAULT_MAX_INTERVAL,
};
use crate::error::ConfigError;
use crate::header::retry_after;
use crate::jitter::Jitter;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::trace::{RetryContext, RetryInfo};
use futures::future::BoxFuture;
use http::request::Parts;
use http::{HeaderMap, Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

const TARGET: &str = "retryhttp::transport";

/// Immutable retry parameters shared by every clone of a transport.
#[derive(Debug)]
struct Policy {
    backoff: Backoff,
    jitter: Jitter,
    max_retries: Option<usize>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

/// Per-request loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RetryState {
    retry_count: usize,
    current_interval: Duration,
}

impl RetryState {
    fn new(initial: Duration) -> Self {
        Self { retry_count: 0, current_interval: initial }
    }

    fn advance(&mut self, backoff: &Backoff) {
        self.current_interval = backoff.next_interval(self.current_interval);
        self.retry_count += 1;
    }
}

impl Policy {
    /// `Retry-After` wins; otherwise the jittered backoff interval.
    fn wait_duration(&self, current: Duration, headers: &HeaderMap) -> Duration {
        if let Some(wait) = retry_after(headers, self.clock.now()) {
            return wait;
        }
        self.jitter.apply(current)
    }

    fn config(&self) -> RetryTransportConfig {
        RetryTransportConfig {
            initial_interval: self.backoff.initial(),
            interval_multiplier: self.backoff.multiplier(),
            jitter_factor: self.jitter.factor(),
            max_interval: self.backoff.max(),
            max_retries: self.max_retries,
        }
    }

    async fn run<S>(
        self: Arc<Self>,
        mut inner: S,
        req: Request<Body>,
        ctx: RetryContext,
    ) -> Result<Response<Body>, S::Error>
    where
        S: Service<Request<Body>, Response = Response<Body>>,
    {
        let (parts, body) = req.into_parts();
        let candidate =
            is_request_idempotent(&parts.method, &parts.headers) && is_request_rewindable(&body);
        let rewinder = if candidate { body.rewinder() } else { None };

        let mut state = RetryState::new(self.backoff.initial());
        let mut body = body;
        loop {
            let resp = inner.ready().await?.call(rebuild(&parts, body)).await?;
            let status = resp.status();

            if !candidate || !is_response_retryable(status, resp.headers()) {
                return Ok(resp);
            }
            if self.max_retries.is_some_and(|max| state.retry_count >= max) {
                tracing::debug!(
                    target: TARGET,
                    retries = state.retry_count,
                    status = status.as_u16(),
                    "retry limit reached; returning last response"
                );
                return Ok(resp);
            }

            body = match &rewinder {
                None => Body::empty(),
                Some(rewinder) => match rewinder.rewind() {
                    Ok(fresh) => fresh,
                    Err(err) => {
                        tracing::debug!(
                            target: TARGET,
                            error = %err,
                            status = status.as_u16(),
                            "cannot rewind request body; returning last response"
                        );
                        return Ok(resp);
                    }
                },
            };

            let wait = self.wait_duration(state.current_interval, resp.headers());
            tracing::debug!(
                target: TARGET,
                retry = state.retry_count + 1,
                status = status.as_u16(),
                wait_ms = wait.as_millis() as u64,
                "scheduling retry"
            );

            tokio::select! {
                biased;
                _ = ctx.cancellation().cancelled() => {
                    tracing::debug!(
                        target: TARGET,
                        retries = state.retry_count,
                        status = status.as_u16(),
                        "retry cancelled; returning last response"
                    );
                    return Ok(resp);
                }
                _ = self.sleeper.sleep(wait) => {}
            }

            if let Err(err) = resp.into_body().drain().await {
                tracing::debug!(target: TARGET, error = %err, "failed to drain superseded response");
            }

            state.advance(&self.backoff);
            ctx.client_trace()
                .retry(RetryInfo { retry_count: state.retry_count, status_code: status.as_u16() });
        }
    }
}

/// Fresh request for the next attempt, sharing everything but the body.
fn rebuild(parts: &Parts, body: Body) -> Request<Body> {
    let mut req = Request::new(body);
    *req.method_mut() = parts.method.clone();
    *req.uri_mut() = parts.uri.clone();
    *req.version_mut() = parts.version;
    *req.headers_mut() = parts.headers.clone();
    *req.extensions_mut() = parts.extensions.clone();
    req
}

#[track_caller]
fn valid<T>(res: Result<T, ConfigError>) -> T {
    match res {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

/// HTTP transport retrying transient failures of a downstream service.
///
/// Cheap to clone; clones share the same policy.
#[derive(Debug, Clone)]
pub struct RetryTransport<S> {
    inner: S,
    policy: Arc<Policy>,
}

impl RetryTransport<()> {
    /// Start configuring a transport with the default policy.
    pub fn builder() -> RetryTransportBuilder {
        RetryTransportBuilder::new()
    }
}

impl<S> RetryTransport<S> {
    /// Effective retry settings.
    pub fn config(&self) -> RetryTransportConfig {
        self.policy.config()
    }

    /// Reference to the wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutable reference to the wrapped service.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the transport, returning the wrapped service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> RetryTransport<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    /// Send `req` through the downstream service, retrying as long as the policy allows.
    ///
    /// Returns the first non-retryable response, or the last response when retrying stops early
    /// (cancellation, rewind failure, retry cap). Downstream errors are returned verbatim.
    pub fn execute(
        &self,
        req: Request<Body>,
        ctx: RetryContext,
    ) -> BoxFuture<'static, Result<Response<Body>, S::Error>> {
        Box::pin(self.policy.clone().run(self.inner.clone(), req, ctx))
    }
}

impl<S> Service<Request<Body>> for RetryTransport<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    /// Uses the [`RetryContext`] found in the request extensions, or a default one.
    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let ctx = req.extensions().get::<RetryContext>().cloned().unwrap_or_default();
        // Keep the service that was driven to readiness for this call.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(self.policy.clone().run(inner, req, ctx))
    }
}

/// `tower` layer wrapping services in a [`RetryTransport`].
#[derive(Debug, Clone)]
pub struct RetryTransportLayer {
    policy: Arc<Policy>,
}

impl<S> Layer<S> for RetryTransportLayer {
    type Service = RetryTransport<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryTransport { inner, policy: self.policy.clone() }
    }
}

/// Builder for [`RetryTransport`].
///
/// Every setter validates its argument and panics on an invalid value. Use
/// [`RetryTransportConfig::validate`] first when the values come from untrusted input.
#[derive(Debug, Clone)]
pub struct RetryTransportBuilder {
    backoff: Backoff,
    jitter: Jitter,
    max_retries: Option<usize>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl RetryTransportBuilder {
    /// Builder with defaults: 200ms initial interval, 1.5 multiplier, 0.2 jitter, 30s ceiling,
    /// unbounded retries.
    pub fn new() -> Self {
        Self {
            backoff: valid(Backoff::new(
                DEFAULT_INITIAL_INTERVAL,
                DEFAULT_INTERVAL_MULTIPLIER,
                DEFAULT_MAX_INTERVAL,
            )),
            jitter: valid(Jitter::new(DEFAULT_JITTER_FACTOR)),
            max_retries: None,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
        }
    }

    /// Builder initialized from `config`.
    ///
    /// # Panics
    /// If `config` does not pass [`RetryTransportConfig::validate`].
    #[track_caller]
    pub fn from_config(config: &RetryTransportConfig) -> Self {
        valid(config.validate());
        Self::new()
            .initial_interval(config.initial_interval)
            .interval_multiplier(config.interval_multiplier)
            .jitter_factor(config.jitter_factor)
            .max_interval(config.max_interval)
            .max_retries_opt(config.max_retries)
    }

    /// Wait before the first retry. Panics unless > 0.
    #[track_caller]
    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.backoff = valid(Backoff::new(interval, self.backoff.multiplier(), self.backoff.max()));
        self
    }

    /// Growth factor applied to the interval after each retry. Panics unless >= 1.0.
    #[track_caller]
    pub fn interval_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff = valid(Backoff::new(self.backoff.initial(), multiplier, self.backoff.max()));
        self
    }

    /// Fraction of the interval randomized in both directions. Panics unless within `[0.0, 1.0]`.
    #[track_caller]
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter = valid(Jitter::new(factor));
        self
    }

    /// Ceiling on the backoff interval. Panics unless > 0.
    #[track_caller]
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.backoff = valid(Backoff::new(self.backoff.initial(), self.backoff.multiplier(), max));
        self
    }

    /// Replace all backoff parameters at once.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace the jitter strategy.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Give up after `retries` retries, returning the last response.
    pub fn max_retries(self, retries: usize) -> Self {
        self.max_retries_opt(Some(retries))
    }

    fn max_retries_opt(mut self, retries: Option<usize>) -> Self {
        self.max_retries = retries;
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<T>(mut self, sleeper: T) -> Self
    where
        T: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Provide the clock used to resolve `Retry-After` dates.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    fn policy(self) -> Arc<Policy> {
        Arc::new(Policy {
            backoff: self.backoff,
            jitter: self.jitter,
            max_retries: self.max_retries,
            sleeper: self.sleeper,
            clock: self.clock,
        })
    }

    /// Wrap `next`.
    pub fn build<S>(self, next: S) -> RetryTransport<S> {
        RetryTransport { inner: next, policy: self.policy() }
    }

    /// Produce a layer applying this policy to any service.
    pub fn build_layer(self) -> RetryTransportLayer {
        RetryTransportLayer { policy: self.policy() }
    }
}

impl Default for RetryTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
