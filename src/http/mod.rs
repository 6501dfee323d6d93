//! HTTP protocol layer module
//!
//! Protocol-level helpers shared by the handlers: content types, cache
//! validators, range parsing, path decoding and response builders.

pub mod cache;
pub mod mime;
pub mod path;
pub mod range;
pub mod response;

// Re-export commonly used items
pub use range::parse_range_header;
pub use response::{
    build_301_response, build_304_response, build_404_response, build_408_response,
    build_413_response, build_416_response, build_file_response, json_error, json_response,
    HttpResponse,
};
