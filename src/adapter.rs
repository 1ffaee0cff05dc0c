//! Classification of raw stub specifications into stub entries.
//!
//! Runs at registration time, so every queued entry is already resolved:
//!
//! 1. an error object is kept as an error entry;
//! 2. a string names a service error and becomes a wire error response;
//! 3. a mapping with exactly `status_code`, `headers` and `body` is a literal
//!    wire response;
//! 4. any other mapping is partial output data, validated and encoded as a
//!    wire response by the service's protocol;
//! 5. anything else passes through unchanged.

use crate::config::ResponseBody;
use crate::error::{Result, StubError};
use crate::model::ServiceModel;
use crate::protocol::protocol_for;
use crate::stub::{HttpResponse, StubEntry, StubSpec};
use crate::validator::Validator;
use serde_json::{Map, Value};
use std::collections::HashMap;

const HTTP_RESPONSE_KEYS: [&str; 3] = ["body", "headers", "status_code"];

/// Resolves stub specifications for one service.
pub struct StubAdapter<'a> {
    model: &'a ServiceModel,
}

impl<'a> StubAdapter<'a> {
    pub fn new(model: &'a ServiceModel) -> Self {
        Self { model }
    }

    /// Classify and translate one stub specification for `operation`.
    pub fn resolve(&self, operation: &str, spec: StubSpec) -> Result<StubEntry> {
        let op = self.model.operation(operation)?;

        match spec {
            StubSpec::Error(err) => Ok(StubEntry::Error(err)),
            StubSpec::Response(response) => Ok(StubEntry::HttpResponse(response)),
            StubSpec::Data(data) => Ok(StubEntry::Data(data)),
            StubSpec::Value(Value::String(code)) => {
                let protocol = protocol_for(self.model)?;
                Ok(StubEntry::HttpResponse(
                    protocol.stub_error(self.model, operation, &code),
                ))
            }
            StubSpec::Value(Value::Object(map)) if is_http_response_stub(&map) => {
                Ok(StubEntry::HttpResponse(http_response_from_map(map)?))
            }
            StubSpec::Value(data @ Value::Object(_)) => {
                let protocol = protocol_for(self.model)?;
                match &op.output {
                    Some(output) => {
                        Validator::new(self.model)
                            .without_required()
                            .validate(output, &data)?;
                    }
                    None if data.as_object().is_some_and(Map::is_empty) => {}
                    None => return Err(StubError::NoOutput(operation.to_string())),
                }
                Ok(StubEntry::HttpResponse(
                    protocol.stub_data(self.model, operation, &data)?,
                ))
            }
            StubSpec::Value(other) => Ok(StubEntry::Data(other)),
        }
    }

    /// Resolve a whole sequence; fails on the first bad specification.
    pub fn resolve_all(
        &self,
        operation: &str,
        specs: impl IntoIterator<Item = StubSpec>,
    ) -> Result<Vec<StubEntry>> {
        specs
            .into_iter()
            .map(|spec| self.resolve(operation, spec))
            .collect()
    }
}

/// Whether a mapping's keys are exactly `status_code`, `headers` and `body`.
pub fn is_http_response_stub(map: &Map<String, Value>) -> bool {
    map.len() == HTTP_RESPONSE_KEYS.len()
        && HTTP_RESPONSE_KEYS.iter().all(|key| map.contains_key(*key))
}

fn http_response_from_map(mut map: Map<String, Value>) -> Result<HttpResponse> {
    let invalid = |msg: String| StubError::Validation(vec![msg]);

    let status_code = map
        .get("status_code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .ok_or_else(|| invalid(format!("invalid status_code: {}", map["status_code"])))?;

    let headers = match map.remove("headers").unwrap_or(Value::Null) {
        Value::Null => HashMap::new(),
        Value::Object(headers) => headers
            .into_iter()
            .map(|(name, value)| match value {
                Value::String(s) => Ok((name, s)),
                other => Err(invalid(format!("header {} must be a string, got {}", name, other))),
            })
            .collect::<Result<_>>()?,
        other => return Err(invalid(format!("headers must be a mapping, got {}", other))),
    };

    let body = match map.remove("body").unwrap_or(Value::Null) {
        Value::Null => Vec::new(),
        Value::String(s) => s.into_bytes(),
        Value::Array(bytes) => bytes
            .iter()
            .map(|b| {
                b.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| invalid(format!("body byte out of range: {}", b)))
            })
            .collect::<Result<_>>()?,
        tagged @ Value::Object(_) => serde_json::from_value::<ResponseBody>(tagged)
            .map_err(|e| invalid(format!("invalid body: {}", e)))?
            .to_bytes()
            .map_err(|e| invalid(e.to_string()))?,
        other => return Err(invalid(format!("invalid body: {}", other))),
    };

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::storage_model;
    use serde_json::json;

    fn wire(entry: StubEntry) -> HttpResponse {
        match entry {
            StubEntry::HttpResponse(resp) => resp,
            other => panic!("Expected wire response, got {:?}", other),
        }
    }

    #[test]
    fn test_error_object_is_kept() {
        let model = storage_model();
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timeout");
        let entry = StubAdapter::new(&model)
            .resolve("HeadObject", StubSpec::error(err))
            .unwrap();
        match entry {
            StubEntry::Error(e) => assert_eq!(e.to_string(), "socket timeout"),
            other => panic!("Expected error entry, got {:?}", other),
        }
    }

    #[test]
    fn test_error_code_becomes_wire_error() {
        let model = storage_model();
        let resp = wire(
            StubAdapter::new(&model)
                .resolve("HeadObject", "NotFound".into())
                .unwrap(),
        );
        assert_eq!(resp.status_code, 400);
        assert!(String::from_utf8_lossy(&resp.body).contains("<Code>NotFound</Code>"));
    }

    #[test]
    fn test_literal_http_response() {
        let model = storage_model();
        let spec = json!({
            "status_code": 202,
            "headers": {"x-custom": "yes"},
            "body": "raw"
        });
        let resp = wire(StubAdapter::new(&model).resolve("HeadObject", spec.into()).unwrap());
        assert_eq!(resp.status_code, 202);
        assert_eq!(resp.header("X-Custom"), Some("yes"));
        assert_eq!(resp.body, b"raw");
    }

    #[test]
    fn test_literal_http_response_tagged_body() {
        let model = storage_model();
        let spec = json!({
            "status_code": 200,
            "headers": {},
            "body": {"type": "base64", "content": "aGVsbG8="}
        });
        let resp = wire(StubAdapter::new(&model).resolve("HeadObject", spec.into()).unwrap());
        assert_eq!(resp.body, b"hello");
    }

    #[test]
    fn test_near_http_mapping_is_data() {
        let model = storage_model();
        // Two of the three keys is not a literal response; it fails shape
        // validation as output data instead.
        let spec = json!({"status_code": 200, "body": "x"});
        let result = StubAdapter::new(&model).resolve("HeadObject", spec.into());
        assert!(matches!(result, Err(StubError::Validation(_))));
    }

    #[test]
    fn test_data_mapping_is_encoded() {
        let model = storage_model();
        let resp = wire(
            StubAdapter::new(&model)
                .resolve("HeadObject", json!({"content_length": 150}).into())
                .unwrap(),
        );
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.header("Content-Length"), Some("150"));
    }

    #[test]
    fn test_data_mapping_is_validated() {
        let model = storage_model();
        let result = StubAdapter::new(&model)
            .resolve("HeadObject", json!({"content_length": "lots"}).into());
        assert!(matches!(result, Err(StubError::Validation(_))));
    }

    #[test]
    fn test_data_for_no_output_operation() {
        let model = storage_model();
        let adapter = StubAdapter::new(&model);
        assert!(matches!(
            adapter.resolve("DeleteBucket", json!({"Bucket": "x"}).into()),
            Err(StubError::NoOutput(_))
        ));
        assert!(adapter.resolve("DeleteBucket", json!({}).into()).is_ok());
    }

    #[test]
    fn test_other_values_pass_through() {
        let model = storage_model();
        let adapter = StubAdapter::new(&model);
        assert!(matches!(
            adapter.resolve("HeadObject", json!(42).into()).unwrap(),
            StubEntry::Data(Value::Number(_))
        ));
        assert!(matches!(
            adapter
                .resolve("HeadObject", StubSpec::Data(json!({"anything": true})))
                .unwrap(),
            StubEntry::Data(_)
        ));
    }

    #[test]
    fn test_unsupported_protocol() {
        let mut model = storage_model();
        model.metadata.protocol = "smoke-signals".to_string();
        let adapter = StubAdapter::new(&model);
        assert!(matches!(
            adapter.resolve("HeadObject", "NotFound".into()),
            Err(StubError::UnsupportedProtocol(_))
        ));
        assert!(matches!(
            adapter.resolve("HeadObject", json!({}).into()),
            Err(StubError::UnsupportedProtocol(_))
        ));
    }

    #[test]
    fn test_unknown_operation() {
        let model = storage_model();
        assert!(matches!(
            StubAdapter::new(&model).resolve("Nope", "NotFound".into()),
            Err(StubError::UnknownOperation(_))
        ));
    }
}
