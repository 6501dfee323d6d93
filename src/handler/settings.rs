//! Settings save handler
//!
//! `POST /save-settings` stores the JSON body as the new settings document.

use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_TYPE};
use hyper::{Request, StatusCode};
use serde_json::Value;

use super::error::{AppError, BoxError};
use crate::config::AppState;
use crate::http::{json_response, HttpResponse};

/// Top-level JSON that is neither an object nor an array
#[derive(Debug, thiserror::Error)]
#[error("settings body must be a JSON object or array")]
pub struct NotAnObjectOrArray;

pub async fn handle_save_settings<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<HttpResponse, AppError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let settings = read_json_body(req, state.config.http.json_limit).await?;

    state
        .store
        .put_settings(&settings)
        .await
        .map_err(AppError::SaveSettings)?;

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "success": true }),
    ))
}

/// Parse the body the way a JSON body parser in front of the handler would
///
/// - content type other than `application/json`: the body is not read and
///   `{}` is used
/// - zero-length body: `{}`
/// - over `limit` bytes, malformed, whitespace only, or a bare scalar:
///   unhandled error
pub async fn read_json_body<B>(req: Request<B>, limit: u64) -> Result<Value, AppError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    if !is_json_request(req.headers()) {
        return Ok(empty_object());
    }

    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let bytes = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(AppError::Unhandled)?
        .to_bytes();

    parse_strict(&bytes)
}

fn parse_strict(bytes: &[u8]) -> Result<Value, AppError> {
    if bytes.is_empty() {
        return Ok(empty_object());
    }
    let value: Value = serde_json::from_slice(bytes).map_err(AppError::unhandled)?;
    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err(AppError::unhandled(NotAnObjectOrArray))
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// `application/json`, parameters ignored; `+json` suffix types are not parsed
fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}
