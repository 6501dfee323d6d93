//! Request handler module
//!
//! Routing plus the three surfaces: static files, model upload and settings
//! persistence.

pub mod error;
pub mod router;
pub mod settings;
pub mod static_files;
pub mod upload;

// Re-export main entry point
pub use error::AppError;
pub use router::handle_request;
