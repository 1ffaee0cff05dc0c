//! Stub entries and the raw specifications they are built from.

use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

/// A wire-level HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    /// Build a response whose body is read from a stream.
    ///
    /// The stream is drained here so the response can be served repeatedly.
    pub fn from_reader(
        status_code: u16,
        headers: HashMap<String, String>,
        mut reader: impl Read,
    ) -> std::io::Result<Self> {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        Ok(Self {
            status_code,
            headers,
            body,
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A resolved, ready-to-serve stub.
#[derive(Debug, Clone)]
pub enum StubEntry {
    /// Output data, returned as-is.
    Data(Value),
    /// An error object, raised as-is.
    Error(Arc<dyn std::error::Error + Send + Sync>),
    /// A wire response, fed through response parsing.
    HttpResponse(HttpResponse),
}

impl StubEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            StubEntry::Data(_) => "data",
            StubEntry::Error(_) => "error",
            StubEntry::HttpResponse(_) => "http_response",
        }
    }
}

/// A stub as the caller registers it, before classification.
#[derive(Debug, Clone)]
pub enum StubSpec {
    /// A string names a service error code; a mapping is either partial
    /// output data or a literal `{status_code, headers, body}` response.
    /// Any other value passes through as data.
    Value(Value),
    /// Already-built output data, served without shaping.
    Data(Value),
    /// An error object to raise.
    Error(Arc<dyn std::error::Error + Send + Sync>),
    /// An already-built wire response.
    Response(HttpResponse),
}

impl StubSpec {
    pub fn error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StubSpec::Error(Arc::new(err))
    }
}

impl From<Value> for StubSpec {
    fn from(value: Value) -> Self {
        StubSpec::Value(value)
    }
}

impl From<&str> for StubSpec {
    fn from(code: &str) -> Self {
        StubSpec::Value(Value::String(code.to_string()))
    }
}

impl From<String> for StubSpec {
    fn from(code: String) -> Self {
        StubSpec::Value(Value::String(code))
    }
}

impl From<HttpResponse> for StubSpec {
    fn from(response: HttpResponse) -> Self {
        StubSpec::Response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_builder() {
        let resp = HttpResponse::new(201)
            .with_header("Content-Type", "application/json")
            .with_body("{}");
        assert_eq!(resp.status_code, 201);
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.body, b"{}");
        assert_eq!(resp.header("x-missing"), None);
    }

    #[test]
    fn test_response_from_reader() {
        let stream = std::io::Cursor::new(b"streamed".to_vec());
        let resp = HttpResponse::from_reader(200, HashMap::new(), stream).unwrap();
        assert_eq!(resp.body, b"streamed");
    }

    #[test]
    fn test_spec_conversions() {
        assert!(matches!(StubSpec::from("NotFound"), StubSpec::Value(Value::String(_))));
        assert!(matches!(StubSpec::from(json!({"a": 1})), StubSpec::Value(_)));
        assert!(matches!(
            StubSpec::from(HttpResponse::new(200)),
            StubSpec::Response(_)
        ));
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(matches!(StubSpec::error(err), StubSpec::Error(_)));
    }
}
