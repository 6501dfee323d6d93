//! Model upload handler
//!
//! `POST /upload-model` with a `multipart/form-data` body carrying the file
//! in the `model` field. The file is streamed into the store as it arrives.

use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_TYPE};
use hyper::{Request, StatusCode};
use serde::Serialize;

use super::error::{AppError, BoxError};
use crate::config::AppState;
use crate::http::{json_response, HttpResponse};
use crate::logger;
use crate::storage::ModelUpload;

/// Multipart field that carries the model file
pub const MODEL_FIELD: &str = "model";

#[derive(Debug, Serialize)]
struct UploadResponse {
    path: String,
}

/// A file part under a field other than `model`, or a second `model` part
#[derive(Debug, thiserror::Error)]
#[error("Unexpected field {0:?}")]
pub struct UnexpectedField(pub String);

/// A model part that has been fully received but not yet committed
struct ReceivedModel {
    file_name: String,
    size: u64,
    upload: Box<dyn ModelUpload>,
}

/// Receive the `model` file and hand it to the store
pub async fn handle_upload<B>(req: Request<B>, state: &AppState) -> Result<HttpResponse, AppError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let Some(received) = receive_model(req, state).await? else {
        return Err(AppError::NoFileUploaded);
    };

    let stored = received
        .upload
        .commit()
        .await
        .map_err(AppError::from_upload)?;

    logger::log_info(&format!(
        "Stored model '{}' ({} bytes) at {}",
        received.file_name,
        received.size,
        stored.disk_path.display()
    ));

    Ok(json_response(
        StatusCode::OK,
        &UploadResponse {
            path: stored.public_path,
        },
    ))
}

/// Boundary of a multipart request
///
/// `Ok(None)` when the request is not multipart at all. A multipart media
/// type without a usable boundary is a parser failure.
fn multipart_boundary(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let is_multipart = essence
        .get(..10)
        .is_some_and(|head| head.eq_ignore_ascii_case("multipart/"));
    if !is_multipart {
        return Ok(None);
    }
    multer::parse_boundary(content_type)
        .map(Some)
        .map_err(AppError::unhandled)
}

/// Stream the single `model` file part into the store
///
/// Non-multipart requests and parts without a file name yield `Ok(None)`.
/// Text fields are read and ignored. On any error the partially received
/// upload is dropped, which discards it.
async fn receive_model<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<Option<ReceivedModel>, AppError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let Some(boundary) = multipart_boundary(req.headers())? else {
        return Ok(None);
    };

    let stream = req.into_body().into_data_stream();
    let mut multipart = match state.config.http.max_body_size {
        Some(limit) => multer::Multipart::with_constraints(
            stream,
            boundary,
            multer::Constraints::new().size_limit(multer::SizeLimit::new().whole_stream(limit)),
        ),
        None => multer::Multipart::new(stream, boundary),
    };

    let mut received: Option<ReceivedModel> = None;
    while let Some(mut field) = multipart.next_field().await.map_err(AppError::unhandled)? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(ToString::to_string);

        let Some(file_name) = file_name else {
            while field.chunk().await.map_err(AppError::unhandled)?.is_some() {}
            continue;
        };

        if field_name != MODEL_FIELD || received.is_some() {
            return Err(AppError::unhandled(UnexpectedField(field_name)));
        }

        let mut upload = state
            .store
            .begin_model(&file_name)
            .await
            .map_err(AppError::from_upload)?;
        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(AppError::unhandled)? {
            upload
                .write_chunk(&chunk)
                .await
                .map_err(AppError::from_upload)?;
            size += chunk.len() as u64;
        }

        received = Some(ReceivedModel {
            file_name,
            size,
            upload,
        });
    }

    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type.parse().unwrap());
        headers
    }

    #[test]
    fn test_boundary_of_multipart_request() {
        let boundary = multipart_boundary(&headers("multipart/form-data; boundary=abc123")).unwrap();
        assert_eq!(boundary.as_deref(), Some("abc123"));

        let boundary = multipart_boundary(&headers("Multipart/Form-Data; boundary=\"q\"")).unwrap();
        assert_eq!(boundary.as_deref(), Some("q"));
    }

    #[test]
    fn test_non_multipart_has_no_boundary() {
        assert!(multipart_boundary(&HeaderMap::new()).unwrap().is_none());
        assert!(multipart_boundary(&headers("application/json")).unwrap().is_none());
        assert!(multipart_boundary(&headers("text/plain; boundary=abc")).unwrap().is_none());
    }

    #[test]
    fn test_multipart_without_boundary_is_unhandled() {
        let err = multipart_boundary(&headers("multipart/form-data")).unwrap_err();
        assert!(matches!(err, AppError::Unhandled(_)));
    }
}
