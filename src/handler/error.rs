//! Handler error type
//!
//! Every handler failure is an [`AppError`]; the router turns it into the
//! fixed JSON body for its class at a single point.

use hyper::StatusCode;

use crate::http::{json_error, HttpResponse};
use crate::logger;
use crate::storage::StoreError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const NO_FILE_UPLOADED: &str = "No file uploaded";
pub const INVALID_FILE_NAME: &str = "Invalid file name";
pub const FAILED_TO_UPLOAD: &str = "Failed to upload file";
pub const FAILED_TO_SAVE_SETTINGS: &str = "Failed to save settings";
pub const SOMETHING_BROKE: &str = "Something broke!";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No `model` file part in the upload
    #[error("no file uploaded")]
    NoFileUploaded,

    /// Client file name refused by the store
    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("failed to store uploaded model")]
    Upload(#[source] StoreError),

    #[error("failed to save settings")]
    SaveSettings(#[source] StoreError),

    /// Anything a handler did not classify (body parsing, multipart framing...)
    #[error("unhandled error")]
    Unhandled(#[source] BoxError),

    #[error("handler panicked: {0}")]
    Panic(String),
}

impl AppError {
    pub fn unhandled(err: impl Into<BoxError>) -> Self {
        Self::Unhandled(err.into())
    }

    /// Map a store failure during upload
    pub fn from_upload(err: StoreError) -> Self {
        match err {
            StoreError::InvalidName(name) => Self::InvalidFileName(name),
            other => Self::Upload(other),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NoFileUploaded | Self::InvalidFileName(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed message sent to the client; the cause is never exposed
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::NoFileUploaded => NO_FILE_UPLOADED,
            Self::InvalidFileName(_) => INVALID_FILE_NAME,
            Self::Upload(_) => FAILED_TO_UPLOAD,
            Self::SaveSettings(_) => FAILED_TO_SAVE_SETTINGS,
            Self::Unhandled(_) | Self::Panic(_) => SOMETHING_BROKE,
        }
    }

    /// Log server-side with as much detail as is available
    pub fn log(&self) {
        match self {
            Self::NoFileUploaded => logger::log_warning("Upload rejected: no file uploaded"),
            Self::InvalidFileName(name) => {
                logger::log_warning(&format!("Upload rejected: invalid file name {name:?}"));
            }
            Self::Upload(_) => logger::log_error_chain("Upload error", self),
            Self::SaveSettings(_) => logger::log_error_chain("Error saving settings", self),
            Self::Unhandled(_) | Self::Panic(_) => logger::log_error_chain("Unhandled error", self),
        }
    }

    pub fn into_response(self) -> HttpResponse {
        self.log();
        json_error(self.status(), self.public_message())
    }
}

/// Render a panic payload for the log
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
