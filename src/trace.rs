//! Request-scoped retry hooks and cancellation.
//!
//! A [`RetryContext`] travels with one logical request. It carries the cancellation signal raced
//! against every wait, and an optional [`ClientTrace`] notified before each retry. Pass it
//! explicitly to [`RetryTransport::execute`](crate::RetryTransport::execute), or attach it to the
//! request extensions when going through the `tower` `Service` interface.

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Information about a retry that is about to be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryInfo {
    /// 1-based retry count for the request.
    pub retry_count: usize,
    /// Status code of the response that triggered the retry.
    pub status_code: u16,
}

type RetryHook = Arc<dyn Fn(RetryInfo) + Send + Sync>;

/// Hooks run at various stages of an outgoing request. Any hook may be unset.
#[derive(Clone, Default)]
pub struct ClientTrace {
    retry: Option<RetryHook>,
}

impl ClientTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook called synchronously, on the retry loop, before each retry.
    ///
    /// The hook must not block.
    pub fn on_retry<F>(mut self, hook: F) -> Self
    where
        F: Fn(RetryInfo) + Send + Sync + 'static,
    {
        self.retry = Some(Arc::new(hook));
        self
    }

    pub(crate) fn retry(&self, info: RetryInfo) {
        if let Some(hook) = &self.retry {
            hook(info);
        }
    }
}

impl fmt::Debug for ClientTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientTrace")
            .field("retry", &self.retry.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

/// Per-request retry options: cancellation plus tracing hooks.
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    cancellation: CancellationToken,
    trace: ClientTrace,
}

impl RetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop retrying once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Use the given trace hooks.
    pub fn with_client_trace(mut self, trace: ClientTrace) -> Self {
        self.trace = trace;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn client_trace(&self) -> &ClientTrace {
        &self.trace
    }
}
