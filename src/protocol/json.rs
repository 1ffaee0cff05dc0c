//! JSON protocols (`json` and `rest-json`).

use super::rest::{apply_bindings, read_bindings};
use super::{
    decode_blob, epoch_to_timestamp, status_error_code, timestamp_to_epoch, Protocol,
    ProtocolFamily, STUB_ERROR_MESSAGE, STUB_REQUEST_ID,
};
use crate::error::{Result, StubError};
use crate::generator::empty_result;
use crate::model::{ScalarKind, ServiceModel, Shape};
use crate::stub::HttpResponse;
use base64::Engine;
use serde_json::{json, Map, Value};

/// `json` and `rest-json` protocols.
#[derive(Debug)]
pub struct JsonProtocol {
    family: ProtocolFamily,
}

impl JsonProtocol {
    pub(crate) const fn new(family: ProtocolFamily) -> Self {
        Self { family }
    }

    fn is_rest(&self) -> bool {
        self.family == ProtocolFamily::RestJson
    }

    fn content_type(&self, model: &ServiceModel) -> String {
        if self.is_rest() {
            "application/json".to_string()
        } else {
            format!(
                "application/x-amz-json-{}",
                model.metadata.json_version.as_deref().unwrap_or("1.0")
            )
        }
    }

    /// Encode a value for the wire.
    fn to_wire(&self, model: &ServiceModel, shape_name: &str, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match model.shape(shape_name)? {
            Shape::Structure { members, .. } => {
                let mut out = Map::new();
                if let Some(obj) = value.as_object() {
                    for (name, member) in members {
                        match obj.get(name) {
                            Some(v) if !v.is_null() => {
                                out.insert(
                                    member.wire_name(name).to_string(),
                                    self.to_wire(model, &member.shape, v)?,
                                );
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Value::Object(out))
            }
            Shape::List { member } => value
                .as_array()
                .into_iter()
                .flatten()
                .map(|item| self.to_wire(model, &member.shape, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Shape::Map { value: value_ref, .. } => {
                let mut out = Map::new();
                for (key, entry) in value.as_object().into_iter().flatten() {
                    out.insert(key.clone(), self.to_wire(model, &value_ref.shape, entry)?);
                }
                Ok(Value::Object(out))
            }
            scalar => match (scalar.scalar_kind(), value) {
                (Some(ScalarKind::Timestamp), v) => timestamp_to_epoch(v),
                (Some(ScalarKind::Blob), Value::String(s)) => Ok(Value::String(
                    base64::engine::general_purpose::STANDARD.encode(s.as_bytes()),
                )),
                (_, v) => Ok(v.clone()),
            },
        }
    }

    /// Decode a wire value.
    fn from_wire(&self, model: &ServiceModel, shape_name: &str, wire: &Value) -> Result<Value> {
        if wire.is_null() {
            return Ok(Value::Null);
        }
        match model.shape(shape_name)? {
            Shape::Structure { members, .. } => {
                let obj = wire.as_object().ok_or_else(|| {
                    StubError::parse(
                        self.family.as_str(),
                        format!("expected an object for {}, got {}", shape_name, wire),
                    )
                })?;
                let mut out = Map::new();
                for (name, member) in members {
                    if let Some(v) = obj.get(member.wire_name(name)) {
                        out.insert(name.clone(), self.from_wire(model, &member.shape, v)?);
                    }
                }
                Ok(Value::Object(out))
            }
            Shape::List { member } => wire
                .as_array()
                .into_iter()
                .flatten()
                .map(|item| self.from_wire(model, &member.shape, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Shape::Map { value: value_ref, .. } => {
                let mut out = Map::new();
                for (key, entry) in wire.as_object().into_iter().flatten() {
                    out.insert(key.clone(), self.from_wire(model, &value_ref.shape, entry)?);
                }
                Ok(Value::Object(out))
            }
            scalar => match (scalar.scalar_kind(), wire) {
                (Some(ScalarKind::Timestamp), Value::Number(n)) => {
                    Ok(epoch_to_timestamp(n.as_f64().unwrap_or(0.0)))
                }
                (Some(ScalarKind::Blob), Value::String(s)) => decode_blob(self.family, s),
                (_, v) => Ok(v.clone()),
            },
        }
    }

    fn parse_error(&self, response: &HttpResponse) -> StubError {
        let body: Value = serde_json::from_slice(&response.body).unwrap_or(Value::Null);

        let code = response
            .header("x-amzn-ErrorType")
            .map(|t| t.split(':').next().unwrap_or(t).to_string())
            .or_else(|| {
                body.get("__type")
                    .or_else(|| body.get("code"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .map(|code| code.rsplit('#').next().unwrap_or(&code).to_string())
            .unwrap_or_else(|| status_error_code(response.status_code));

        let message = body
            .get("message")
            .or_else(|| body.get("Message"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        StubError::Service {
            code,
            message,
            status_code: response.status_code,
        }
    }
}

impl Protocol for JsonProtocol {
    fn family(&self) -> ProtocolFamily {
        self.family
    }

    fn stub_error(&self, model: &ServiceModel, _operation: &str, code: &str) -> HttpResponse {
        let response = HttpResponse::new(400)
            .with_header("Content-Type", self.content_type(model))
            .with_header("x-amzn-RequestId", STUB_REQUEST_ID);

        if self.is_rest() {
            response
                .with_header("x-amzn-ErrorType", code)
                .with_body(json!({"code": code, "message": STUB_ERROR_MESSAGE}).to_string())
        } else {
            response.with_body(json!({"__type": code, "message": STUB_ERROR_MESSAGE}).to_string())
        }
    }

    fn stub_data(
        &self,
        model: &ServiceModel,
        operation: &str,
        data: &Value,
    ) -> Result<HttpResponse> {
        let mut response = HttpResponse::new(200)
            .with_header("Content-Type", self.content_type(model))
            .with_header("x-amzn-RequestId", STUB_REQUEST_ID);

        let body = match &model.operation(operation)?.output {
            None => empty_result(),
            Some(output) if self.is_rest() => {
                let body = apply_bindings(model, output, data, &mut response)?;
                self.to_wire(model, output, &body)?
            }
            Some(output) => self.to_wire(model, output, data)?,
        };

        Ok(response.with_body(body.to_string()))
    }

    fn parse_response(
        &self,
        model: &ServiceModel,
        operation: &str,
        response: &HttpResponse,
    ) -> Result<Value> {
        if response.status_code >= 300 {
            return Err(self.parse_error(response));
        }

        let Some(output) = &model.operation(operation)?.output else {
            return Ok(empty_result());
        };

        let wire: Value = if response.body.iter().all(u8::is_ascii_whitespace) {
            empty_result()
        } else {
            serde_json::from_slice(&response.body)
                .map_err(|e| StubError::parse(self.family.as_str(), e))?
        };

        let mut data = self.from_wire(model, output, &wire)?;
        if self.is_rest() {
            if let Value::Object(obj) = &mut data {
                read_bindings(self.family, model, output, response, obj)?;
            }
        }
        Ok(data)
    }
}
