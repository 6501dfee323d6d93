//! Static file serving module
//!
//! Resolves request paths against the configured mounts and builds file
//! responses with validators and byte-range support.

use hyper::body::Bytes;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::StaticMount;
use crate::handler::router::RequestContext;
use crate::http::cache::Validators;
use crate::http::range::RangeParseResult;
use crate::http::{self, mime, HttpResponse};
use crate::logger;

/// Served for directory requests
pub const INDEX_FILE: &str = "index.html";

/// Outcome of looking a path up under one mount
#[derive(Debug)]
pub enum Lookup {
    File(PathBuf, Metadata),
    /// Directory requested without trailing slash
    Redirect,
    NotFound,
}

/// Serve a GET/HEAD request from the first mount that has the file
pub async fn serve(ctx: &RequestContext<'_>, mounts: &[StaticMount]) -> HttpResponse {
    let Some(decoded) = http::path::decode_path(ctx.path) else {
        return http::build_404_response(ctx.method, ctx.path);
    };

    for mount in mounts {
        let Some(relative) = mount.strip(&decoded) else {
            continue;
        };
        match lookup(Path::new(&mount.dir), relative).await {
            Lookup::File(path, meta) => return serve_file(ctx, &path, &meta).await,
            Lookup::Redirect => return http::build_301_response(&format!("{}/", ctx.path)),
            Lookup::NotFound => {}
        }
    }

    http::build_404_response(ctx.method, ctx.path)
}

/// Resolve `relative` (a `/`-separated path) inside `root`
///
/// Dotfile segments are never served and the resolved file must stay inside
/// `root` after following symlinks.
pub async fn lookup(root: &Path, relative: &str) -> Lookup {
    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| s.starts_with('.') || s.contains('\\')) {
        return Lookup::NotFound;
    }

    let mut path = root.to_path_buf();
    path.extend(&segments);

    let Ok(meta) = fs::metadata(&path).await else {
        return Lookup::NotFound;
    };

    let (path, meta) = if meta.is_dir() {
        if !relative.ends_with('/') && !segments.is_empty() {
            return Lookup::Redirect;
        }
        let index = path.join(INDEX_FILE);
        match fs::metadata(&index).await {
            Ok(m) if m.is_file() => (index, m),
            _ => return Lookup::NotFound,
        }
    } else {
        (path, meta)
    };

    if !is_within(root, &path).await {
        logger::log_warning(&format!(
            "Path escape blocked: {relative} -> {}",
            path.display()
        ));
        return Lookup::NotFound;
    }

    Lookup::File(path, meta)
}

async fn is_within(root: &Path, path: &Path) -> bool {
    let (Ok(root), Ok(path)) = (fs::canonicalize(root).await, fs::canonicalize(path).await) else {
        return false;
    };
    path.starts_with(root)
}

async fn serve_file(ctx: &RequestContext<'_>, path: &Path, meta: &Metadata) -> HttpResponse {
    let validators = match meta.modified() {
        Ok(modified) => Validators::new(meta.len(), modified),
        Err(_) => Validators::new(meta.len(), std::time::UNIX_EPOCH),
    };

    if validators.is_fresh(ctx.if_none_match, ctx.if_modified_since) {
        return http::build_304_response(&validators);
    }

    let data = match fs::read(path).await {
        Ok(d) => Bytes::from(d),
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return http::build_404_response(ctx.method, ctx.path);
        }
    };

    let range = match http::parse_range_header(ctx.range, data.len() as u64) {
        RangeParseResult::Valid(r) => Some(r),
        RangeParseResult::NotSatisfiable => return http::build_416_response(data.len() as u64),
        RangeParseResult::None => None,
    };

    let content_type = mime::get_content_type(path.extension().and_then(|e| e.to_str()));
    http::build_file_response(data, content_type, &validators, range, ctx.is_head)
}
