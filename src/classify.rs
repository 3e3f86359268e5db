//! Request and response classification per HTTP semantics (RFC 9110).

use crate::body::Body;
use crate::header::{has_header, IDEMPOTENCY_KEY, RETRY_AFTER, X_IDEMPOTENCY_KEY};
use http::{HeaderMap, Method, StatusCode};

/// Whether a request may be sent more than once without changing its effect.
///
/// GET, HEAD, PUT, DELETE, OPTIONS and TRACE are idempotent by definition
/// (<https://datatracker.ietf.org/doc/html/rfc9110#section-9.2.2>). Any other method counts as
/// idempotent when the request carries a non-empty `Idempotency-Key` or `X-Idempotency-Key`.
pub fn is_request_idempotent(method: &Method, headers: &HeaderMap) -> bool {
    match *method {
        Method::GET
        | Method::HEAD
        | Method::PUT
        | Method::DELETE
        | Method::OPTIONS
        | Method::TRACE => true,
        _ => {
            has_header(headers, IDEMPOTENCY_KEY) || has_header(headers, X_IDEMPOTENCY_KEY)
        }
    }
}

/// Whether a request body can be sent again: absent, empty, buffered or rewindable by accessor.
pub fn is_request_rewindable(body: &Body) -> bool {
    body.is_empty() || body.is_rewindable()
}

/// Whether a response status warrants a retry.
///
/// 408, 425, 429, 500, 502, 503 and 504 always do; 413 only when the server sent `Retry-After`.
pub fn is_response_retryable(status: StatusCode, headers: &HeaderMap) -> bool {
    match status.as_u16() {
        // 408 Request Timeout, 425 Too Early, 429 Too Many Requests
        408 | 425 | 429 => true,
        // 413 Content Too Large
        413 => has_header(headers, RETRY_AFTER),
        500 | 502 | 503 | 504 => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use http::HeaderValue;
    use std::io;

    fn with_header(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    fn streamed() -> Body {
        Body::from_stream(stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"x"))]))
    }

    #[test]
    fn idempotent_methods() {
        let none = HeaderMap::new();
        for method in
            [Method::GET, Method::HEAD, Method::PUT, Method::DELETE, Method::OPTIONS, Method::TRACE]
        {
            assert!(is_request_idempotent(&method, &none), "{method} should be idempotent");
        }
        for method in [Method::POST, Method::PATCH, Method::CONNECT] {
            assert!(!is_request_idempotent(&method, &none), "{method} should not be idempotent");
        }
    }

    #[test]
    fn idempotency_key_makes_post_idempotent() {
        assert!(is_request_idempotent(&Method::POST, &with_header("idempotency-key", "k1")));
        assert!(is_request_idempotent(&Method::PATCH, &with_header("x-idempotency-key", "k1")));
        assert!(!is_request_idempotent(&Method::POST, &with_header("idempotency-key", "")));
    }

    #[test]
    fn rewindability() {
        assert!(is_request_rewindable(&Body::empty()));
        assert!(is_request_rewindable(&Body::from("payload")));
        assert!(!is_request_rewindable(&streamed()));
        assert!(is_request_rewindable(&streamed().with_rewind(|| Ok::<_, io::Error>(streamed()))));
    }

    #[test]
    fn retryable_statuses() {
        let none = HeaderMap::new();
        for code in [408, 425, 429, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(is_response_retryable(status, &none), "{code} should be retryable");
        }
        for code in [200, 204, 301, 400, 401, 404, 409, 413, 501, 505] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(!is_response_retryable(status, &none), "{code} should not be retryable");
        }
    }

    #[test]
    fn non_ascii_header_values_still_count() {
        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY, HeaderValue::from_bytes("clé-1".as_bytes()).unwrap());
        assert!(is_request_idempotent(&Method::POST, &headers));

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_bytes(&[0xE9]).unwrap());
        assert!(is_response_retryable(StatusCode::PAYLOAD_TOO_LARGE, &headers));
    }

    #[test]
    fn payload_too_large_needs_retry_after() {
        let status = StatusCode::PAYLOAD_TOO_LARGE;
        assert!(!is_response_retryable(status, &HeaderMap::new()));
        assert!(is_response_retryable(status, &with_header("retry-after", "1")));
    }
}
