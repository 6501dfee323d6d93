//! HTTP response building module
//!
//! Builders for the responses the gateway sends, decoupled from handler logic.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG,
    LAST_MODIFIED, LOCATION,
};
use hyper::{Method, Response, StatusCode};
use serde::Serialize;

use super::cache::{self, Validators};
use super::range::ByteRange;

pub type HttpResponse = Response<Full<Bytes>>;

const JSON: &str = "application/json; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

/// Build a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            log_build_error("JSON body", &e);
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header(CONTENT_TYPE, JSON)
                .body(Full::new(Bytes::from_static(br#"{"error":"Something broke!"}"#)))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())));
        }
    };

    let len = json.len();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON)
        .header(CONTENT_LENGTH, len)
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// `{ "error": message }`
pub fn json_error(status: StatusCode, message: &str) -> HttpResponse {
    json_response(status, &serde_json::json!({ "error": message }))
}

fn text_response(status: StatusCode, text: String) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT)
        .header(CONTENT_LENGTH, text.len())
        .body(Full::new(Bytes::from(text)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response, `Cannot GET /path`
pub fn build_404_response(method: &Method, path: &str) -> HttpResponse {
    text_response(StatusCode::NOT_FOUND, format!("Cannot {method} {path}"))
}

/// Request not handled within `performance.request_timeout`
pub fn build_408_response() -> HttpResponse {
    text_response(StatusCode::REQUEST_TIMEOUT, "408 Request Timeout".into())
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> HttpResponse {
    text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large".into())
}

/// Redirect a directory request to its slash-terminated form
pub fn build_301_response(location: &str) -> HttpResponse {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_TYPE, TEXT)
        .body(Full::new(Bytes::from(format!("Redirecting to {location}"))))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(validators: &Validators) -> HttpResponse {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, &validators.etag)
        .header(LAST_MODIFIED, &validators.last_modified)
        .header(CACHE_CONTROL, cache::CACHE_CONTROL)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(size: u64) -> HttpResponse {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_TYPE, TEXT)
        .header(CONTENT_RANGE, format!("bytes */{size}"))
        .body(Full::new(Bytes::from_static(b"Range Not Satisfiable")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a 200 (or 206 when `range` is set) static file response
///
/// `data` is the full file; for HEAD the body is dropped but the headers
/// describe what GET would return.
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    validators: &Validators,
    range: Option<ByteRange>,
    is_head: bool,
) -> HttpResponse {
    let total = data.len() as u64;
    let mut builder = Response::builder()
        .header(CONTENT_TYPE, content_type)
        .header(ACCEPT_RANGES, "bytes")
        .header(ETAG, &validators.etag)
        .header(LAST_MODIFIED, &validators.last_modified)
        .header(CACHE_CONTROL, cache::CACHE_CONTROL);

    let (status, body) = match range {
        Some(r) => {
            builder = builder.header(CONTENT_RANGE, r.content_range(total));
            let (start, end) = (to_index(r.start), to_index(r.end));
            (StatusCode::PARTIAL_CONTENT, data.slice(start..=end))
        }
        None => (StatusCode::OK, data),
    };

    let content_length = body.len();
    let body = if is_head { Bytes::new() } else { body };

    builder
        .status(status)
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

fn to_index(pos: u64) -> usize {
    usize::try_from(pos).unwrap_or(usize::MAX)
}

fn log_build_error(what: &str, error: &dyn std::fmt::Display) {
    crate::logger::log_error(&format!("Failed to build {what} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::{Duration, UNIX_EPOCH};

    async fn body_of(resp: HttpResponse) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    fn validators() -> Validators {
        Validators::new(10, UNIX_EPOCH + Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_json_error_shape() {
        let resp = json_error(StatusCode::BAD_REQUEST, "No file uploaded");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()[CONTENT_TYPE], JSON);
        assert_eq!(&body_of(resp).await[..], br#"{"error":"No file uploaded"}"#);
    }

    #[tokio::test]
    async fn test_404_names_method_and_path() {
        let resp = build_404_response(&Method::POST, "/nope");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(&body_of(resp).await[..], b"Cannot POST /nope");
    }

    #[tokio::test]
    async fn test_full_file_response() {
        let resp = build_file_response(
            Bytes::from_static(b"0123456789"),
            "application/octet-stream",
            &validators(),
            None,
            false,
        );
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "10");
        assert_eq!(resp.headers()[ETAG], validators().etag.as_str());
        assert_eq!(&body_of(resp).await[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_partial_file_response() {
        let resp = build_file_response(
            Bytes::from_static(b"0123456789"),
            "text/plain",
            &validators(),
            Some(ByteRange { start: 2, end: 4 }),
            false,
        );
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 2-4/10");
        assert_eq!(resp.headers()[CONTENT_LENGTH], "3");
        assert_eq!(&body_of(resp).await[..], b"234");
    }

    #[tokio::test]
    async fn test_head_keeps_length_drops_body() {
        let resp = build_file_response(
            Bytes::from_static(b"0123456789"),
            "text/plain",
            &validators(),
            None,
            true,
        );
        assert_eq!(resp.headers()[CONTENT_LENGTH], "10");
        assert!(body_of(resp).await.is_empty());
    }
}
