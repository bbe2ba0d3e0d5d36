use serde::Serialize;

/// HTTP protocol version as a parsed `(major, minor)` pair. Only `(1, 0)`
/// and `(1, 1)` are ever produced by [`crate::MessageParser`]; kept as a
/// pair rather than a two-variant enum because the parser must be able to
/// echo back whichever minor version it actually read, for both requests
/// and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HttpVersion(pub u8, pub u8);

impl HttpVersion {
    /// `HTTP/1.0`
    pub const HTTP_1_0: HttpVersion = HttpVersion(1, 0);
    /// `HTTP/1.1`
    pub const HTTP_1_1: HttpVersion = HttpVersion(1, 1);
}

impl std::fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP/{}.{}", self.0, self.1)
    }
}

/// A single HTTP header field, in the order it was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Header field name, original casing preserved.
    pub name: String,
    /// Header field value, leading/trailing optional-whitespace trimmed.
    pub value: String,
}

/// A message collected by feeding a complete buffer through
/// [`crate::MessageParser`] in one call (see [`crate::parse_request`] /
/// [`crate::parse_response`]). Holds whichever of the request-line or
/// status-line fields apply, plus headers and any body bytes the wired
/// body processor produced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ParsedMessage {
    /// Request method, present for requests only.
    pub method: Option<String>,
    /// Request target, present for requests only.
    pub uri: Option<String>,
    /// Status code, present for responses only.
    pub status_code: Option<u16>,
    /// Reason phrase, present for responses only.
    pub reason: Option<String>,
    /// HTTP version read from the start line.
    pub version: Option<HttpVersion>,
    /// Header fields in the order they were parsed.
    pub headers: Vec<Header>,
    /// Body bytes collected from the wired body processor, if any.
    pub body: Vec<u8>,
}

impl ParsedMessage {
    /// Look up the first header value by name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Return all values for headers matching `name` (case-insensitive).
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    /// Parse the `Content-Length` header, if present and valid.
    pub fn content_length(&self) -> Option<u64> {
        self.header_value("content-length")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Return `true` if the `Transfer-Encoding` header contains `chunked`.
    pub fn is_chunked(&self) -> bool {
        self.header_value("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    }

    /// Return the body as a UTF-8 `&str` if it is valid UTF-8.
    pub fn body_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Return the body as a lossy UTF-8 string (always succeeds).
    pub fn body_as_lossy_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_display() {
        assert_eq!(HttpVersion::HTTP_1_1.to_string(), "HTTP/1.1");
        assert_eq!(HttpVersion(1, 0).to_string(), "HTTP/1.0");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let msg = ParsedMessage {
            headers: vec![Header {
                name: "Content-Length".into(),
                value: "5".into(),
            }],
            ..Default::default()
        };
        assert_eq!(msg.header_value("content-length"), Some("5"));
        assert_eq!(msg.content_length(), Some(5));
    }

    #[test]
    fn chunked_detection() {
        let msg = ParsedMessage {
            headers: vec![Header {
                name: "Transfer-Encoding".into(),
                value: "chunked".into(),
            }],
            ..Default::default()
        };
        assert!(msg.is_chunked());
    }
}
