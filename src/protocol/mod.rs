//! Wire protocols.
//!
//! Each protocol family knows how to synthesize a service error or a data
//! response on the wire, and how to parse a wire response back into output
//! data or a service error.

mod json;
mod rest;
mod xml;
mod xml_doc;

pub use json::JsonProtocol;
pub use xml::XmlProtocol;

use crate::error::{Result, StubError};
use crate::model::{ScalarKind, ServiceModel};
use crate::stub::HttpResponse;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Request id carried by every synthesized response.
pub const STUB_REQUEST_ID: &str = "stubbed-request-id";

/// Message carried by every synthesized error.
pub const STUB_ERROR_MESSAGE: &str = "stubbed-response-error-message";

/// Known protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolFamily {
    Json,
    RestJson,
    RestXml,
    Query,
    Ec2,
}

impl ProtocolFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolFamily::Json => "json",
            ProtocolFamily::RestJson => "rest-json",
            ProtocolFamily::RestXml => "rest-xml",
            ProtocolFamily::Query => "query",
            ProtocolFamily::Ec2 => "ec2",
        }
    }

    /// The protocol implementation for this family.
    pub fn protocol(self) -> &'static dyn Protocol {
        static JSON: JsonProtocol = JsonProtocol::new(ProtocolFamily::Json);
        static REST_JSON: JsonProtocol = JsonProtocol::new(ProtocolFamily::RestJson);
        static REST_XML: XmlProtocol = XmlProtocol::new(ProtocolFamily::RestXml);
        static QUERY: XmlProtocol = XmlProtocol::new(ProtocolFamily::Query);
        static EC2: XmlProtocol = XmlProtocol::new(ProtocolFamily::Ec2);

        match self {
            ProtocolFamily::Json => &JSON,
            ProtocolFamily::RestJson => &REST_JSON,
            ProtocolFamily::RestXml => &REST_XML,
            ProtocolFamily::Query => &QUERY,
            ProtocolFamily::Ec2 => &EC2,
        }
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolFamily {
    type Err = StubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ProtocolFamily::Json),
            "rest-json" => Ok(ProtocolFamily::RestJson),
            "rest-xml" => Ok(ProtocolFamily::RestXml),
            "query" => Ok(ProtocolFamily::Query),
            "ec2" => Ok(ProtocolFamily::Ec2),
            other => Err(StubError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Resolve the protocol a service speaks.
pub fn protocol_for(model: &ServiceModel) -> Result<&'static dyn Protocol> {
    Ok(model.protocol()?.protocol())
}

/// Wire encoding rules of one protocol family.
pub trait Protocol: Send + Sync {
    fn family(&self) -> ProtocolFamily;

    /// A wire response carrying the service error `code`.
    fn stub_error(&self, model: &ServiceModel, operation: &str, code: &str) -> HttpResponse;

    /// A wire response carrying `data` as the output of `operation`.
    ///
    /// `data` must already conform to the output shape.
    fn stub_data(&self, model: &ServiceModel, operation: &str, data: &Value)
        -> Result<HttpResponse>;

    /// Parse a wire response into output data, or into
    /// [`StubError::Service`] when it carries an error.
    fn parse_response(
        &self,
        model: &ServiceModel,
        operation: &str,
        response: &HttpResponse,
    ) -> Result<Value>;
}

/// Fallback error code for error responses without a recognizable body.
pub(crate) fn status_error_code(status_code: u16) -> String {
    format!("Http{}Error", status_code)
}

/// Convert a timestamp value to epoch seconds.
pub(crate) fn timestamp_to_epoch(value: &Value) -> Result<Value> {
    match value {
        Value::String(s) => {
            let ts = DateTime::parse_from_rfc3339(s)
                .map_err(|e| StubError::Validation(vec![format!("invalid timestamp {}: {}", s, e)]))?;
            let millis = ts.timestamp_subsec_millis();
            if millis == 0 {
                Ok(Value::from(ts.timestamp()))
            } else {
                Ok(Value::from(ts.timestamp() as f64 + f64::from(millis) / 1000.0))
            }
        }
        other => Ok(other.clone()),
    }
}

/// Convert epoch seconds to an RFC 3339 timestamp string.
pub(crate) fn epoch_to_timestamp(epoch: f64) -> Value {
    let secs = epoch.floor() as i64;
    let nanos = ((epoch - epoch.floor()) * 1e9).round() as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos.min(999_999_999))
        .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
        .unwrap_or(Value::Null)
}

/// Render a scalar as text for headers and XML.
pub(crate) fn scalar_to_text(kind: ScalarKind, value: &Value) -> String {
    match (kind, value) {
        (ScalarKind::Blob, Value::String(s)) => {
            base64::engine::general_purpose::STANDARD.encode(s.as_bytes())
        }
        (ScalarKind::Timestamp, Value::Number(n)) => match epoch_to_timestamp(n.as_f64().unwrap_or(0.0)) {
            Value::String(s) => s,
            _ => n.to_string(),
        },
        (_, Value::String(s)) => s.clone(),
        (_, other) => other.to_string(),
    }
}

/// Parse a scalar from header or XML text.
pub(crate) fn scalar_from_text(
    family: ProtocolFamily,
    kind: ScalarKind,
    text: &str,
) -> Result<Value> {
    let invalid = |what: &str| StubError::parse(family.as_str(), format!("invalid {}: {:?}", what, text));
    match kind {
        ScalarKind::String => Ok(Value::String(text.to_string())),
        ScalarKind::Integer => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid("integer")),
        ScalarKind::Float => {
            let f = text.trim().parse::<f64>().map_err(|_| invalid("float"))?;
            Ok(serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        ScalarKind::Boolean => match text.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("boolean")),
        },
        ScalarKind::Timestamp => match text.trim().parse::<f64>() {
            Ok(epoch) => Ok(epoch_to_timestamp(epoch)),
            Err(_) => Ok(Value::String(text.trim().to_string())),
        },
        ScalarKind::Blob => decode_blob(family, text.trim()),
    }
}

pub(crate) fn decode_blob(family: ProtocolFamily, encoded: &str) -> Result<Value> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| StubError::parse(family.as_str(), format!("invalid base64: {}", e)))?;
    Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}
