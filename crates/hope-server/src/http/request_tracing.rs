// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::HeaderMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTrace {
    pub request_id: String,
    pub correlation_id: Option<String>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

#[must_use]
pub(crate) fn extract_request_trace(headers: &HeaderMap, seed: &AtomicU64) -> RequestTrace {
    let request_id = header(headers, "x-request-id").unwrap_or_else(|| {
        let id = seed.fetch_add(1, Ordering::Relaxed);
        format!("req-{id:016x}")
    });
    RequestTrace {
        request_id,
        correlation_id: header(headers, "x-correlation-id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn propagates_incoming_ids() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-abc"));
        headers.insert("x-correlation-id", HeaderValue::from_static("corr-1"));
        let trace = extract_request_trace(&headers, &AtomicU64::new(1));
        assert_eq!(trace.request_id, "req-abc");
        assert_eq!(trace.correlation_id.as_deref(), Some("corr-1"));
    }

    #[test]
    fn generates_sequential_ids_when_absent() {
        let seed = AtomicU64::new(10);
        let headers = HeaderMap::new();
        assert_eq!(
            extract_request_trace(&headers, &seed).request_id,
            "req-000000000000000a"
        );
        assert_eq!(
            extract_request_trace(&headers, &seed).request_id,
            "req-000000000000000b"
        );
    }
}
