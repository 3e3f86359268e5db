//! Convenient re-exports for common retryhttp types.
pub use crate::{
    body::Body,
    config::RetryTransportConfig,
    error::ConfigError,
    trace::{ClientTrace, RetryContext, RetryInfo},
    transport::{RetryTransport, RetryTransportBuilder, RetryTransportLayer},
};
