//! `multipart/form-data` decoding
//!
//! Works on raw bytes end to end; only part headers are interpreted as text,
//! so binary payloads pass through untouched.

use docmark_core::models::{UploadedAsset, MIME_OCTET_STREAM};
use docmark_core::AppError;
use std::collections::BTreeMap;

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, thiserror::Error)]
pub enum MultipartError {
    #[error("Content-Type has no multipart boundary")]
    MissingBoundary,

    #[error("Malformed multipart body: {0}")]
    Malformed(String),

    #[error("Multipart part has no Content-Disposition name")]
    MissingName,

    #[error("No file part in request")]
    MissingFile,
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::MalformedRequest(err.to_string())
    }
}

/// Extract the `boundary` parameter from a `Content-Type` header value.
/// Quoted and bare values are both accepted.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    let mut params = split_params(content_type).into_iter();
    let essence = params.next().unwrap_or_default();
    if !essence.trim().to_ascii_lowercase().starts_with("multipart/") {
        return Err(MultipartError::MissingBoundary);
    }

    params
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("boundary")
                .then(|| unquote(value.trim()))
        })
        .find(|b| !b.is_empty())
        .ok_or(MultipartError::MissingBoundary)
}

/// One part of a multipart body. `data` borrows from the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part<'a> {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: &'a [u8],
}

impl Part<'_> {
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.data).into_owned()
    }
}

/// Pull-based reader yielding one [`Part`] at a time.
pub struct MultipartReader<'a> {
    body: &'a [u8],
    delimiter: Vec<u8>,
    /// Offset of the next delimiter, `None` once the stream is closed
    cursor: Option<usize>,
}

impl<'a> MultipartReader<'a> {
    /// Position the reader on the first delimiter, skipping any preamble.
    pub fn new(body: &'a [u8], boundary: &str) -> Result<Self, MultipartError> {
        if boundary.is_empty() {
            return Err(MultipartError::MissingBoundary);
        }
        let delimiter = [b"--".as_slice(), boundary.as_bytes()].concat();

        let first = if body.starts_with(&delimiter) {
            Some(0)
        } else {
            find_line_delimiter(body, &delimiter, 0).map(|(_, start)| start)
        };

        match first {
            Some(pos) => Ok(MultipartReader {
                body,
                delimiter,
                cursor: Some(pos),
            }),
            None => Err(MultipartError::Malformed(
                "opening boundary not found".to_string(),
            )),
        }
    }

    /// Next part, or `None` after the closing delimiter.
    pub fn next_part(&mut self) -> Result<Option<Part<'a>>, MultipartError> {
        let Some(pos) = self.cursor else {
            return Ok(None);
        };

        let after = pos + self.delimiter.len();
        let rest = &self.body[after..];
        if rest.starts_with(b"--") {
            self.cursor = None;
            return Ok(None);
        }

        // Skip transport padding up to the end of the delimiter line
        let line_end = find(self.body, b"\n", after).ok_or_else(|| {
            MultipartError::Malformed("boundary line is not terminated".to_string())
        })?;
        let headers_start = line_end + 1;

        // The blank line ending the headers must come before the next delimiter
        let part_end = find_line_delimiter(self.body, &self.delimiter, headers_start)
            .map(|(_, start)| start)
            .unwrap_or(self.body.len());
        let (headers_end, body_start) = find_header_end(&self.body[..part_end], headers_start)
            .ok_or_else(|| {
                MultipartError::Malformed("part headers are not terminated".to_string())
            })?;
        let headers = String::from_utf8_lossy(&self.body[headers_start..headers_end]);
        let (name, file_name, content_type) = parse_part_headers(&headers)?;

        let (data_end, next_delimiter) = if self.body[body_start..].starts_with(&self.delimiter) {
            (body_start, body_start)
        } else {
            find_line_delimiter(self.body, &self.delimiter, body_start).ok_or_else(|| {
                MultipartError::Malformed(format!("part '{}' has no closing boundary", name))
            })?
        };

        self.cursor = Some(next_delimiter);

        Ok(Some(Part {
            name,
            file_name,
            content_type,
            data: &self.body[body_start..data_end],
        }))
    }
}

/// Fields and file payload of a decoded form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedForm {
    pub fields: BTreeMap<String, String>,
    pub file: Option<Vec<u8>>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl DecodedForm {
    /// Fold one part into the form; later parts replace earlier ones.
    fn apply(mut self, part: Part<'_>) -> Self {
        match part.file_name {
            // Browsers send an empty, unnamed file part when nothing was chosen
            Some(ref file_name) if file_name.is_empty() && part.data.is_empty() => {}
            Some(file_name) => {
                self.file = Some(part.data.to_vec());
                self.file_name = Some(file_name);
                self.mime_type = Some(
                    part.content_type
                        .unwrap_or_else(|| MIME_OCTET_STREAM.to_string()),
                );
            }
            None => {
                self.fields
                    .insert(part.name, String::from_utf8_lossy(part.data).into_owned());
            }
        }
        self
    }

    /// Turn the form into an asset, requiring a file part.
    pub fn into_asset(self) -> Result<UploadedAsset, MultipartError> {
        let bytes = self.file.ok_or(MultipartError::MissingFile)?;
        Ok(UploadedAsset {
            bytes,
            mime_type: self
                .mime_type
                .unwrap_or_else(|| MIME_OCTET_STREAM.to_string()),
            file_name: self.file_name.unwrap_or_default(),
            fields: self.fields,
        })
    }
}

/// Decode a whole body into fields and (at most) one file.
pub fn decode_form(body: &[u8], boundary: &str) -> Result<DecodedForm, MultipartError> {
    let mut reader = MultipartReader::new(body, boundary)?;
    let mut parts = Vec::new();
    while let Some(part) = reader.next_part()? {
        parts.push(part);
    }
    Ok(parts.into_iter().fold(DecodedForm::default(), DecodedForm::apply))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Find a delimiter that starts a line at or after `from`. Returns
/// `(end_of_preceding_data, start_of_delimiter)`.
fn find_line_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut search = from;
    while let Some(idx) = find(body, delimiter, search) {
        if idx >= 2 && &body[idx - 2..idx] == CRLF {
            return Some((idx - 2, idx));
        }
        if idx >= 1 && body[idx - 1] == b'\n' {
            return Some((idx - 1, idx));
        }
        search = idx + 1;
    }
    None
}

/// Locate the blank line closing a header block. Returns
/// `(end_of_headers, start_of_body)`.
fn find_header_end(body: &[u8], from: usize) -> Option<(usize, usize)> {
    // A part with no headers at all starts with the blank line
    if body[from..].starts_with(CRLF) {
        return Some((from, from + 2));
    }
    let crlf = find(body, b"\r\n\r\n", from).map(|i| (i, i + 4));
    let lf = find(body, b"\n\n", from).map(|i| (i, i + 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

type PartHeaders = (String, Option<String>, Option<String>);

fn parse_part_headers(headers: &str) -> Result<PartHeaders, MultipartError> {
    let mut name = None;
    let mut file_name = None;
    let mut content_type = None;

    for line in headers.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for param in split_params(value).into_iter().skip(1) {
                let Some((k, v)) = param.split_once('=') else {
                    continue;
                };
                match k.trim().to_ascii_lowercase().as_str() {
                    "name" => name = Some(unquote(v.trim())),
                    "filename" => file_name = Some(unquote(v.trim())),
                    _ => {}
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            let value = value.trim();
            if !value.is_empty() {
                content_type = Some(value.to_string());
            }
        }
    }

    let name = name.filter(|n| !n.is_empty()).ok_or(MultipartError::MissingName)?;
    Ok((name, file_name, content_type))
}

/// Split a header value on `;`, ignoring separators inside quotes.
fn split_params(value: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in value.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ';' if !in_quotes => params.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    params.push(current);
    params.into_iter().map(|p| p.trim().to_string()).collect()
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----docmarkBoundary7MA4YWxk";

    fn field(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
        .into_bytes()
    }

    fn file(name: &str, file_name: &str, content_type: Option<&str>, data: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
        )
        .into_bytes();
        if let Some(ct) = content_type {
            out.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn close() -> Vec<u8> {
        format!("--{BOUNDARY}--\r\n").into_bytes()
    }

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=abc123").unwrap(),
            "abc123"
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; charset=utf-8; BOUNDARY=\"a;b c\"")
                .unwrap(),
            "a;b c"
        );
        assert!(matches!(
            boundary_from_content_type("multipart/form-data"),
            Err(MultipartError::MissingBoundary)
        ));
        assert!(matches!(
            boundary_from_content_type("application/json; boundary=x"),
            Err(MultipartError::MissingBoundary)
        ));
    }

    #[test]
    fn test_decode_fields_and_binary_file() {
        let payload: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x00, 0xff, b'\r', b'\n', 0xfe];
        let body = [
            b"preamble to ignore\r\n".to_vec(),
            field("clientName", "Acme"),
            field("docTitle", "Brochure"),
            file("file", "logo.png", Some("image/png"), &payload),
            close(),
        ]
        .concat();

        let form = decode_form(&body, BOUNDARY).unwrap();
        assert_eq!(form.fields.get("clientName").map(String::as_str), Some("Acme"));
        assert_eq!(form.fields.get("docTitle").map(String::as_str), Some("Brochure"));
        assert_eq!(form.file.as_deref(), Some(payload.as_slice()));
        assert_eq!(form.file_name.as_deref(), Some("logo.png"));
        assert_eq!(form.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_payload_containing_boundary_text_mid_line() {
        let payload = format!("data --{BOUNDARY} still data").into_bytes();
        let body = [file("file", "a.bin", None, &payload), close()].concat();

        let form = decode_form(&body, BOUNDARY).unwrap();
        assert_eq!(form.file.as_deref(), Some(payload.as_slice()));
    }

    #[test]
    fn test_file_content_type_defaults_to_octet_stream() {
        let body = [file("file", "a.bin", None, b"xyz"), close()].concat();
        let asset = decode_form(&body, BOUNDARY).unwrap().into_asset().unwrap();
        assert_eq!(asset.mime_type, "application/octet-stream");
        assert_eq!(asset.file_name, "a.bin");
        assert_eq!(asset.bytes, b"xyz");
    }

    #[test]
    fn test_last_write_wins_for_fields_and_files() {
        let body = [
            field("docTitle", "first"),
            file("file", "one.pdf", Some("application/pdf"), b"1"),
            field("docTitle", "second"),
            file("file", "two.png", Some("image/png"), b"2"),
            close(),
        ]
        .concat();

        let form = decode_form(&body, BOUNDARY).unwrap();
        assert_eq!(form.fields.get("docTitle").map(String::as_str), Some("second"));
        assert_eq!(form.file_name.as_deref(), Some("two.png"));
        assert_eq!(form.file.as_deref(), Some(b"2".as_slice()));
    }

    #[test]
    fn test_empty_field_value() {
        let body = [field("description", ""), close()].concat();
        let form = decode_form(&body, BOUNDARY).unwrap();
        assert_eq!(form.fields.get("description").map(String::as_str), Some(""));
    }

    #[test]
    fn test_part_without_name_is_malformed() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Type: text/plain\r\n\r\nvalue\r\n--{BOUNDARY}--\r\n"
        );
        assert!(matches!(
            decode_form(body.as_bytes(), BOUNDARY),
            Err(MultipartError::MissingName)
        ));
    }

    #[test]
    fn test_headers_cut_off_by_next_part_are_malformed() {
        // The first part never ends its headers; the second part's blank
        // line must not be borrowed for it.
        let body = [
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"clientName\"\r\n")
                .into_bytes(),
            field("docTitle", "Title"),
            close(),
        ]
        .concat();
        assert!(matches!(
            decode_form(&body, BOUNDARY),
            Err(MultipartError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_opening_boundary_is_malformed() {
        assert!(matches!(
            decode_form(b"no multipart here", BOUNDARY),
            Err(MultipartError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_body_is_malformed() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue without end"
        );
        assert!(matches!(
            decode_form(body.as_bytes(), BOUNDARY),
            Err(MultipartError::Malformed(_))
        ));
    }

    #[test]
    fn test_form_without_file_cannot_become_asset() {
        let body = [field("clientName", "Acme"), close()].concat();
        let form = decode_form(&body, BOUNDARY).unwrap();
        assert!(matches!(form.into_asset(), Err(MultipartError::MissingFile)));
    }

    #[test]
    fn test_reader_yields_parts_in_order() {
        let body = [field("a", "1"), field("b", "2"), close()].concat();
        let mut reader = MultipartReader::new(&body, BOUNDARY).unwrap();

        let first = reader.next_part().unwrap().unwrap();
        assert_eq!(first.name, "a");
        assert_eq!(first.text(), "1");
        assert!(!first.is_file());

        let second = reader.next_part().unwrap().unwrap();
        assert_eq!(second.name, "b");

        assert!(reader.next_part().unwrap().is_none());
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_lf_only_line_endings() {
        let body = format!(
            "--{BOUNDARY}\nContent-Disposition: form-data; name=\"a\"\n\nvalue\n--{BOUNDARY}--\n"
        );
        let form = decode_form(body.as_bytes(), BOUNDARY).unwrap();
        assert_eq!(form.fields.get("a").map(String::as_str), Some("value"));
    }
}
