//! Static file server with model upload and settings endpoints.
//!
//! - `GET /...` serves files from the configured static mounts
//! - `POST /upload-model` stores the multipart `model` file under its own name
//! - `POST /save-settings` replaces the settings document with the JSON body

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
