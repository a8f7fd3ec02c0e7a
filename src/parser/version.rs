//! The protocol version from the request line.

use std::fmt;
use std::str::FromStr;

use crate::parser::error::Error;

/// HTTP/1.x only; the transport speaks nothing newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }

    /// HTTP/1.1 requests must carry a `Host` header.
    pub fn requires_host(&self) -> bool {
        *self == HttpVersion::Http11
    }
}

impl FromStr for HttpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [HttpVersion::Http10, HttpVersion::Http11]
            .into_iter()
            .find(|version| version.as_str() == s)
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
