#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # retryhttp
//!
//! A retrying HTTP transport for `tower`: wraps any service executing
//! `http::Request<Body>` and resends requests that failed transiently.
//!
//! ## Features
//!
//! - **Idempotency aware**: only idempotent methods, or requests with an `Idempotency-Key`, are retried
//! - **Rewindable bodies**: buffered bodies are resent as-is, streams through a rewind accessor
//! - **Backoff with jitter**: multiplicative growth, a ceiling and symmetric randomization
//! - **Server hints**: `Retry-After` (seconds or HTTP date) overrides the computed wait
//! - **Cancellation and hooks** through a request-scoped [`RetryContext`]
//! - **Deterministic tests** via injectable [`Sleeper`] and [`Clock`]
//!
//! ## Quick Start
//!
//! ```rust
//! use http::{Request, Response};
//! use retryhttp::{Body, ClientTrace, RetryContext, RetryTransport};
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let next = tower::service_fn(|_req: Request<Body>| async {
//!         Ok::<_, Infallible>(Response::new(Body::from("hello")))
//!     });
//!
//!     let transport = RetryTransport::builder()
//!         .initial_interval(Duration::from_millis(100))
//!         .max_interval(Duration::from_secs(5))
//!         .build(next);
//!
//!     let ctx = RetryContext::new().with_client_trace(
//!         ClientTrace::new().on_retry(|info| println!("retry #{}", info.retry_count)),
//!     );
//!     let req = Request::get("http://example.com/").body(Body::empty()).unwrap();
//!     let resp = transport.execute(req, ctx).await.unwrap();
//!     assert!(resp.status().is_success());
//! }
//! ```

pub mod backoff;
pub mod body;
pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod header;
pub mod jitter;
pub mod prelude;
pub mod sleeper;
pub mod trace;
pub mod transport;

// Re-exports
pub use backoff::Backoff;
pub use body::{Body, Rewinder};
pub use classify::{is_request_idempotent, is_request_rewindable, is_response_retryable};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::RetryTransportConfig;
pub use error::{BodyError, BoxError, ConfigError};
pub use jitter::Jitter;
pub use sleeper::{InstantSleeper, PendingSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use trace::{ClientTrace, RetryContext, RetryInfo};
pub use transport::{RetryTransport, RetryTransportBuilder, RetryTransportLayer};
