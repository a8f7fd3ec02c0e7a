//! HTTP request parsing and representation.

use std::str::FromStr;

use crate::parser::error::Error;
use crate::parser::headers::HeaderMap;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request as read off the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub uri: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HeaderMap,
    /// Bytes following the header section
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a new HTTP request with an empty body.
    pub fn new(method: Method, uri: impl Into<String>, version: HttpVersion, headers: HeaderMap) -> Self {
        Self {
            method,
            uri: uri.into(),
            version,
            headers,
            body: Vec::new(),
        }
    }

    /// Attach a body to the request.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// The part of the URI before `?`.
    pub fn path(&self) -> &str {
        self.uri.split_once('?').map_or(self.uri.as_str(), |(path, _)| path)
    }

    /// The raw query string after `?`, if the URI has one.
    pub fn query(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, query)| query)
    }

    /// The declared body length, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .get("Content-Length")
            .and_then(|value| value.trim().parse().ok())
    }
}

/// Locate the end of the header section.
///
/// Returns the offset of the first body byte, accepting both `\r\n\r\n` and
/// bare `\n\n` terminators.
pub fn find_head_end(input: &[u8]) -> Option<usize> {
    let crlf = input.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4);
    let lf = input.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Parse an HTTP request from a byte slice.
///
/// Everything after the blank line ending the header section becomes the
/// body, verbatim. A request without a blank line is treated as having no
/// body.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    if input.is_empty() {
        return Err(Error::EmptyRequest);
    }

    let (head, body) = match find_head_end(input) {
        Some(end) => input.split_at(end),
        None => (input, &[][..]),
    };

    let head = std::str::from_utf8(head)
        .map_err(|_| Error::MalformedRequestLine("Invalid UTF-8".to_string()))?;

    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let uri = parts[1];
    if !uri.starts_with('/') {
        return Err(Error::InvalidPath(uri.to_string()));
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = HeaderMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeaderFormat(line.to_string()))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeaderFormat(line.to_string()));
        }

        headers.append(name, value.trim());
    }

    if version.requires_host() && !headers.contains("Host") {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    Ok(HttpRequest::new(method, uri, version, headers).with_body(body))
}
