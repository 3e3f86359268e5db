//! Retrying a flaky in-process backend.
//!
//! The backend answers 503 twice, then 429 with `Retry-After: 1`, then 200. Run with
//! `RUST_LOG=retryhttp=debug` to see the scheduling decisions.

use http::{Request, Response, StatusCode};
use retryhttp::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{service_fn, ServiceBuilder, ServiceExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("retryhttp=debug")),
        )
        .init();

    let calls = Arc::new(AtomicUsize::new(0));
    let backend = service_fn({
        let calls = calls.clone();
        move |_req: Request<Body>| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let mut resp = Response::new(Body::from("hello"));
                match attempt {
                    0 | 1 => *resp.status_mut() = StatusCode::SERVICE_UNAVAILABLE,
                    2 => {
                        *resp.status_mut() = StatusCode::TOO_MANY_REQUESTS;
                        resp.headers_mut().insert("Retry-After", "1".parse()?);
                    }
                    _ => {}
                }
                Ok::<_, Box<dyn std::error::Error + Send + Sync>>(resp)
            }
        }
    });

    let client = ServiceBuilder::new()
        .layer(
            RetryTransport::builder()
                .initial_interval(Duration::from_millis(100))
                .interval_multiplier(2.0)
                .max_interval(Duration::from_secs(2))
                .build_layer(),
        )
        .service(backend);

    let trace = ClientTrace::new().on_retry(|info| {
        println!("retry #{} after status {}", info.retry_count, info.status_code);
    });
    let mut req = Request::get("http://backend.local/greeting").body(Body::empty())?;
    req.extensions_mut().insert(RetryContext::new().with_client_trace(trace));

    let start = Instant::now();
    let resp = client.oneshot(req).await.map_err(|e| e as Box<dyn std::error::Error>)?;
    let status = resp.status();
    let body = resp.into_body().to_bytes().await?;

    println!(
        "{} {:?} after {} attempts in {:?}",
        status,
        body,
        calls.load(Ordering::SeqCst),
        start.elapsed()
    );
    Ok(())
}
