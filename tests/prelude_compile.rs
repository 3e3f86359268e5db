//! Compile-time prelude coverage test.
use retryhttp::prelude::*;
use std::time::Duration;
use tower::service_fn;
use tower_layer::Layer;
use tower_service::Service;

#[tokio::test]
async fn prelude_reexports_core_types() {
    let config = RetryTransportConfig { max_retries: Some(1), ..Default::default() };
    let layer: RetryTransportLayer = RetryTransportBuilder::from_config(&config)
        .initial_interval(Duration::from_millis(1))
        .build_layer();

    let mut svc = layer.layer(service_fn(|_req: http::Request<Body>| async {
        Ok::<_, std::io::Error>(http::Response::new(Body::empty()))
    }));
    let trace = ClientTrace::new().on_retry(|_: RetryInfo| {});
    let ctx = RetryContext::new().with_client_trace(trace);
    let mut req = http::Request::new(Body::empty());
    req.extensions_mut().insert(ctx);
    svc.call(req).await.expect("service call failed");

    let _: Result<(), ConfigError> = config.validate();
    let _ = RetryTransport::builder();
}
