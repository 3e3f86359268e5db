//! Header names and parsers used by the retry transport.
//!
//! Lookups go through [`http::HeaderMap`], which is case-insensitive, so the constants below are
//! spelled in their canonical form for readability only.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use http::HeaderMap;
use std::time::{Duration, SystemTime};

/// <https://datatracker.ietf.org/doc/html/rfc9110#section-10.2.3>
pub const RETRY_AFTER: &str = "Retry-After";
/// <https://datatracker.ietf.org/doc/html/rfc9110#section-6.6.1>
pub const DATE: &str = "Date";
/// <https://datatracker.ietf.org/doc/draft-ietf-httpapi-idempotency-key-header/>
pub const IDEMPOTENCY_KEY: &str = "Idempotency-Key";
/// Legacy spelling of [`IDEMPOTENCY_KEY`], still honored.
pub const X_IDEMPOTENCY_KEY: &str = "X-Idempotency-Key";

// IMF-fixdate, obsolete RFC 850, ANSI C asctime().
const HTTP_DATE_FORMATS: [&str; 3] =
    ["%a, %d %b %Y %H:%M:%S GMT", "%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Errors returned by [`parse_header_date`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateHeaderError {
    #[error("no date header")]
    Missing,
    #[error("invalid date header value: {0:?}")]
    Invalid(String),
}

/// First value of `name` as a string, if present, valid UTF-8/ASCII and non-empty.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty())
}

/// Whether `name` is present with a non-empty first value. Opaque (non-ASCII) bytes count.
pub fn has_header(headers: &HeaderMap, name: &str) -> bool {
    headers.get(name).is_some_and(|v| !v.as_bytes().is_empty())
}

/// All values of `name`, with comma-separated lists split and trimmed.
///
/// Repeated headers are concatenated in order. Values that are not valid visible ASCII are
/// skipped.
pub fn header_values(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|field| field.trim().to_owned())
        .collect()
}

/// Parse an HTTP date in any of the three formats HTTP/1.1 recipients must accept.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    HTTP_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse the `Date` header.
pub fn parse_header_date(headers: &HeaderMap) -> Result<DateTime<Utc>, DateHeaderError> {
    let value = header_str(headers, DATE).ok_or(DateHeaderError::Missing)?;
    parse_http_date(value).ok_or_else(|| DateHeaderError::Invalid(value.to_owned()))
}

/// Wait requested by a `Retry-After` header, relative to `now`.
///
/// Accepts either a number of seconds or an HTTP date. Negative delays and dates in the past
/// yield `Duration::ZERO`. Returns `None` when the header is absent or unparseable.
pub fn retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let value = header_str(headers, RETRY_AFTER)?.trim();

    if let Ok(secs) = value.parse::<i64>() {
        return Some(Duration::from_secs(secs.max(0) as u64));
    }

    let date = SystemTime::from(parse_http_date(value)?);
    Some(date.duration_since(now).unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(*v));
        }
        map
    }

    fn epoch_plus(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    // Sun, 06 Nov 1994 08:49:37 GMT
    const RFC_EXAMPLE_SECS: u64 = 784_111_777;

    #[test]
    fn parses_all_http_date_formats() {
        let expected = Utc.timestamp_opt(RFC_EXAMPLE_SECS as i64, 0).unwrap();
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(expected));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_http_date("yesterday"), None);
        assert_eq!(parse_http_date(""), None);
        assert_eq!(parse_http_date("2024-01-01T00:00:00Z"), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let map = headers(&[("idempotency-key", "abc")]);
        assert_eq!(header_str(&map, IDEMPOTENCY_KEY), Some("abc"));
        assert_eq!(header_str(&map, "IDEMPOTENCY-KEY"), Some("abc"));
        assert_eq!(header_str(&map, X_IDEMPOTENCY_KEY), None);
    }

    #[test]
    fn header_str_treats_empty_as_absent() {
        let map = headers(&[("idempotency-key", "")]);
        assert_eq!(header_str(&map, IDEMPOTENCY_KEY), None);
    }

    #[test]
    fn has_header_accepts_opaque_bytes() {
        let mut map = HeaderMap::new();
        map.insert(IDEMPOTENCY_KEY, HeaderValue::from_bytes("clé-1".as_bytes()).unwrap());
        assert!(header_str(&map, IDEMPOTENCY_KEY).is_none());
        assert!(has_header(&map, IDEMPOTENCY_KEY));
        assert!(!has_header(&headers(&[("idempotency-key", "")]), IDEMPOTENCY_KEY));
        assert!(!has_header(&map, X_IDEMPOTENCY_KEY));
    }

    #[test]
    fn header_values_split_and_concatenate() {
        let map = headers(&[
            ("cache-control", "key1=val1"),
            ("cache-control", "key2"),
            ("cache-control", "key3=val3, key4,key5=val5"),
        ]);
        assert_eq!(
            header_values(&map, "Cache-Control"),
            vec!["key1=val1", "key2", "key3=val3", "key4", "key5=val5"]
        );
        assert!(header_values(&map, "Vary").is_empty());
    }

    #[test]
    fn parse_header_date_reports_missing_and_invalid() {
        assert_eq!(parse_header_date(&HeaderMap::new()), Err(DateHeaderError::Missing));
        assert_eq!(
            parse_header_date(&headers(&[("date", "not a date")])),
            Err(DateHeaderError::Invalid("not a date".into()))
        );
        let ok = parse_header_date(&headers(&[("date", "Sun, 06 Nov 1994 08:49:37 GMT")]));
        assert_eq!(ok.unwrap().timestamp(), RFC_EXAMPLE_SECS as i64);
    }

    #[test]
    fn retry_after_seconds() {
        let map = headers(&[("retry-after", "120")]);
        assert_eq!(retry_after(&map, epoch_plus(0)), Some(Duration::from_secs(120)));
    }

    #[test]
    fn retry_after_negative_seconds_clamp_to_zero() {
        let map = headers(&[("retry-after", "-5")]);
        assert_eq!(retry_after(&map, epoch_plus(0)), Some(Duration::ZERO));
    }

    #[test]
    fn retry_after_future_date_is_time_remaining() {
        let map = headers(&[("retry-after", "Sun, 06 Nov 1994 08:49:37 GMT")]);
        let now = epoch_plus(RFC_EXAMPLE_SECS - 30);
        assert_eq!(retry_after(&map, now), Some(Duration::from_secs(30)));
    }

    #[test]
    fn retry_after_past_date_clamps_to_zero() {
        let map = headers(&[("retry-after", "Sun, 06 Nov 1994 08:49:37 GMT")]);
        let now = epoch_plus(RFC_EXAMPLE_SECS + 3600);
        assert_eq!(retry_after(&map, now), Some(Duration::ZERO));
    }

    #[test]
    fn retry_after_absent_or_invalid_is_none() {
        assert_eq!(retry_after(&HeaderMap::new(), epoch_plus(0)), None);
        let map = headers(&[("retry-after", "soon")]);
        assert_eq!(retry_after(&map, epoch_plus(0)), None);
    }
}
