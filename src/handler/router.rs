//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body size check, route matching,
//! dispatch, and the single error boundary that turns handler failures and
//! panics into JSON error responses.

use futures_util::FutureExt;
use hyper::body::{Body, Bytes};
use hyper::header::{
    HeaderMap, HeaderName, CONTENT_LENGTH, IF_MODIFIED_SINCE, IF_NONE_MATCH, RANGE, REFERER,
    USER_AGENT,
};
use hyper::{Method, Request, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use super::error::{panic_message, AppError, BoxError};
use super::{settings, static_files, upload};
use crate::config::AppState;
use crate::http::{self, HttpResponse};
use crate::logger::{self, AccessLogEntry};

pub const UPLOAD_MODEL_PATH: &str = "/upload-model";
pub const SAVE_SETTINGS_PATH: &str = "/save-settings";

/// Request fields the static responder needs
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub range: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn from_parts(method: &'a Method, path: &'a str, headers: &'a HeaderMap) -> Self {
        let header = move |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            method,
            path,
            is_head: *method == Method::HEAD,
            if_none_match: header(IF_NONE_MATCH),
            if_modified_since: header(IF_MODIFIED_SINCE),
            range: header(RANGE),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// Never fails: every error is already a response by the time it leaves.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: Option<SocketAddr>,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let access = state
        .access_log_enabled()
        .then(|| access_entry(&req, peer_addr));

    let outcome = AssertUnwindSafe(dispatch(req, &state)).catch_unwind().await;
    let response = match outcome {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => err.into_response(),
        Err(payload) => AppError::Panic(panic_message(payload.as_ref())).into_response(),
    };

    if let Some(mut entry) = access {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch<B>(req: Request<B>, state: &AppState) -> Result<HttpResponse, AppError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    if let Some(resp) = check_body_size(req.headers(), state.config.http.max_body_size) {
        return Ok(resp);
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match &method {
        &Method::POST if route_matches(&path, UPLOAD_MODEL_PATH) => {
            upload::handle_upload(req, state).await
        }
        &Method::POST if route_matches(&path, SAVE_SETTINGS_PATH) => {
            settings::handle_save_settings(req, state).await
        }
        &Method::GET | &Method::HEAD => {
            let (parts, _body) = req.into_parts();
            let ctx = RequestContext::from_parts(&method, &path, &parts.headers);
            Ok(static_files::serve(&ctx, &state.config.static_mounts).await)
        }
        _ => Ok(http::build_404_response(&method, &path)),
    }
}

/// Route paths match case-insensitively and tolerate one trailing slash
fn route_matches(path: &str, route: &str) -> bool {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.eq_ignore_ascii_case(route)
}

/// Reject with 413 when `Content-Length` exceeds the configured cap
fn check_body_size(headers: &HeaderMap, max_body_size: Option<u64>) -> Option<HttpResponse> {
    let max = max_body_size?;
    let size = headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()?;
    if size > max {
        logger::log_warning(&format!(
            "Request body too large: {size} bytes (max: {max})"
        ));
        return Some(http::build_413_response());
    }
    None
}

fn access_entry<B>(req: &Request<B>, peer_addr: Option<SocketAddr>) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let mut entry = AccessLogEntry::new(
        peer_addr.map_or_else(|| "-".to_string(), |a| a.ip().to_string()),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
