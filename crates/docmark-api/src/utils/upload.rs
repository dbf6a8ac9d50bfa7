//! Common helpers for handlers that accept a file

use axum::http::{header, HeaderMap};
use docmark_core::AppError;

const MAX_FILENAME_LENGTH: usize = 255;
const FALLBACK_FILENAME: &str = "file";

/// Reduce a client-supplied file name to a single safe key segment.
/// Directory components are dropped; names that still try to traverse are rejected.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    if filename_only == "." || filename_only == ".." {
        return Err(AppError::MalformedRequest(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(|c| c == '.' || c == '_').is_empty() {
        return Ok(FALLBACK_FILENAME.to_string());
    }

    Ok(sanitized)
}

/// File name from the last path segment of a URL, if any.
pub fn filename_from_url(url: &reqwest::Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(String::from)
}

pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_rejects_path_traversal() {
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename(".").is_err());
        assert!(sanitize_filename("../..").is_err());
    }

    #[test]
    fn sanitize_filename_keeps_inner_double_dots() {
        assert_eq!(
            sanitize_filename("report..final.pdf").unwrap(),
            "report..final.pdf"
        );
    }

    #[test]
    fn sanitize_filename_drops_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\report.pdf").unwrap(), "report.pdf");
    }

    #[test]
    fn sanitize_filename_accepts_valid_names() {
        assert_eq!(sanitize_filename("contract.pdf").unwrap(), "contract.pdf");
        assert_eq!(sanitize_filename("my-file_1.jpg").unwrap(), "my-file_1.jpg");
        assert_eq!(sanitize_filename("Q3 report.pdf").unwrap(), "Q3_report.pdf");
    }

    #[test]
    fn sanitize_filename_falls_back_when_nothing_is_left() {
        assert_eq!(sanitize_filename("").unwrap(), "file");
        assert_eq!(sanitize_filename("   ").unwrap(), "file");
        assert_eq!(sanitize_filename("???").unwrap(), "file");
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        let url = reqwest::Url::parse("https://blob.example.com/a/b/scan.pdf?x=1").unwrap();
        assert_eq!(filename_from_url(&url).as_deref(), Some("scan.pdf"));
        let url = reqwest::Url::parse("https://blob.example.com/").unwrap();
        assert_eq!(filename_from_url(&url), None);
    }
}
