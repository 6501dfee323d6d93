//! HTTP cache validators
//!
//! Weak `ETag` and `Last-Modified` derived from file metadata, and the
//! conditional-request checks that turn them into 304 responses.

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// `Cache-Control` sent with every static file
pub const CACHE_CONTROL: &str = "public, max-age=0";

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Validators for one version of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    pub etag: String,
    pub last_modified: String,
    modified: DateTime<Utc>,
}

impl Validators {
    /// Build validators from size and modification time
    ///
    /// The `ETag` is weak: `W/"<size hex>-<mtime millis hex>"`.
    pub fn new(size: u64, modified: SystemTime) -> Self {
        let millis = modified
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let modified = DateTime::<Utc>::from(modified);
        Self {
            etag: format!("W/\"{size:x}-{millis:x}\""),
            last_modified: modified.format(HTTP_DATE_FORMAT).to_string(),
            modified,
        }
    }

    /// Whether a conditional GET can be answered with 304
    ///
    /// `If-None-Match` takes precedence; `If-Modified-Since` is only
    /// consulted when it is absent.
    pub fn is_fresh(&self, if_none_match: Option<&str>, if_modified_since: Option<&str>) -> bool {
        if let Some(tags) = if_none_match {
            return check_etag_match(tags, &self.etag);
        }
        if_modified_since
            .and_then(parse_http_date)
            .is_some_and(|since| self.modified.timestamp() <= since.timestamp())
    }
}

/// Weak comparison of `If-None-Match` against an `ETag`
///
/// Supports a list of tags and the `*` wildcard.
pub fn check_etag_match(if_none_match: &str, etag: &str) -> bool {
    let ours = strip_weak(etag);
    if_none_match
        .split(',')
        .map(str::trim)
        .any(|tag| tag == "*" || strip_weak(tag) == ours)
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_etag_shape() {
        let v = Validators::new(255, UNIX_EPOCH + Duration::from_millis(4096));
        assert_eq!(v.etag, "W/\"ff-1000\"");
    }

    #[test]
    fn test_etag_changes_with_size_and_time() {
        let a = Validators::new(10, at(1000));
        assert_eq!(a, Validators::new(10, at(1000)));
        assert_ne!(a.etag, Validators::new(11, at(1000)).etag);
        assert_ne!(a.etag, Validators::new(10, at(1001)).etag);
    }

    #[test]
    fn test_last_modified_format() {
        let v = Validators::new(1, at(784_111_777));
        assert_eq!(v.last_modified, "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "W/\"a-1\"";
        assert!(check_etag_match("W/\"a-1\"", etag));
        assert!(check_etag_match("\"a-1\"", etag));
        assert!(check_etag_match("\"x\", W/\"a-1\"", etag));
        assert!(check_etag_match("*", etag));
        assert!(!check_etag_match("W/\"b-1\"", etag));
    }

    #[test]
    fn test_if_modified_since() {
        let v = Validators::new(1, at(784_111_777));
        assert!(v.is_fresh(None, Some("Sun, 06 Nov 1994 08:49:37 GMT")));
        assert!(v.is_fresh(None, Some("Mon, 07 Nov 1994 08:49:37 GMT")));
        assert!(!v.is_fresh(None, Some("Sat, 05 Nov 1994 08:49:37 GMT")));
        assert!(!v.is_fresh(None, Some("garbage")));
        assert!(!v.is_fresh(None, None));
    }

    #[test]
    fn test_if_none_match_wins() {
        let v = Validators::new(1, at(784_111_777));
        // Tag mismatch beats a matching date
        assert!(!v.is_fresh(
            Some("\"other\""),
            Some("Mon, 07 Nov 1994 08:49:37 GMT")
        ));
    }
}
