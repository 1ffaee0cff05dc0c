//! XML protocols (`rest-xml`, `query` and `ec2`).

use super::rest::{apply_bindings, read_bindings};
use super::xml_doc::{parse_document, XmlElement, XmlWriter};
use super::{
    scalar_from_text, scalar_to_text, status_error_code, Protocol, ProtocolFamily,
    STUB_ERROR_MESSAGE, STUB_REQUEST_ID,
};
use crate::error::{Result, StubError};
use crate::generator::empty_result;
use crate::model::{ServiceModel, Shape};
use crate::stub::HttpResponse;
use serde_json::{Map, Value};

/// `rest-xml`, `query` and `ec2` protocols.
#[derive(Debug)]
pub struct XmlProtocol {
    family: ProtocolFamily,
}

impl XmlProtocol {
    pub(crate) const fn new(family: ProtocolFamily) -> Self {
        Self { family }
    }

    fn list_member_name(&self) -> &'static str {
        match self.family {
            ProtocolFamily::Ec2 => "item",
            _ => "member",
        }
    }

    fn write_members(
        &self,
        w: &mut XmlWriter,
        model: &ServiceModel,
        shape_name: &str,
        value: &Value,
    ) -> Result<()> {
        let (Shape::Structure { members, .. }, Some(obj)) =
            (model.shape(shape_name)?, value.as_object())
        else {
            return Ok(());
        };
        for (name, member) in members {
            match obj.get(name) {
                Some(v) if !v.is_null() => {
                    self.write_value(w, model, &member.shape, member.wire_name(name), v)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn write_value(
        &self,
        w: &mut XmlWriter,
        model: &ServiceModel,
        shape_name: &str,
        element: &str,
        value: &Value,
    ) -> Result<()> {
        match model.shape(shape_name)? {
            Shape::Structure { .. } => {
                w.open(element, None);
                self.write_members(w, model, shape_name, value)?;
                w.close(element);
            }
            Shape::List { member } => {
                w.open(element, None);
                let item_name = member.location_name.as_deref().unwrap_or(self.list_member_name());
                for item in value.as_array().into_iter().flatten() {
                    if !item.is_null() {
                        self.write_value(w, model, &member.shape, item_name, item)?;
                    }
                }
                w.close(element);
            }
            Shape::Map { value: value_ref, .. } => {
                w.open(element, None);
                for (key, entry) in value.as_object().into_iter().flatten() {
                    w.open("entry", None);
                    w.text_element("key", key);
                    if !entry.is_null() {
                        self.write_value(w, model, &value_ref.shape, "value", entry)?;
                    }
                    w.close("entry");
                }
                w.close(element);
            }
            scalar => {
                if let Some(kind) = scalar.scalar_kind() {
                    w.text_element(element, &scalar_to_text(kind, value));
                }
            }
        }
        Ok(())
    }

    fn read_members(
        &self,
        model: &ServiceModel,
        shape_name: &str,
        element: &XmlElement,
    ) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        if let Shape::Structure { members, .. } = model.shape(shape_name)? {
            for (name, member) in members {
                if let Some(child) = element.child(member.wire_name(name)) {
                    out.insert(name.clone(), self.read_value(model, &member.shape, child)?);
                }
            }
        }
        Ok(out)
    }

    fn read_value(
        &self,
        model: &ServiceModel,
        shape_name: &str,
        element: &XmlElement,
    ) -> Result<Value> {
        match model.shape(shape_name)? {
            Shape::Structure { .. } => {
                Ok(Value::Object(self.read_members(model, shape_name, element)?))
            }
            Shape::List { member } => element
                .children
                .iter()
                .map(|item| self.read_value(model, &member.shape, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Shape::Map { value: value_ref, .. } => {
                let mut out = Map::new();
                for entry in &element.children {
                    let Some(key) = entry.child("key") else {
                        continue;
                    };
                    let value = match entry.child("value") {
                        Some(v) => self.read_value(model, &value_ref.shape, v)?,
                        None => Value::Null,
                    };
                    out.insert(key.text.clone(), value);
                }
                Ok(Value::Object(out))
            }
            scalar => match scalar.scalar_kind() {
                Some(kind) => scalar_from_text(self.family, kind, &element.text),
                None => Ok(Value::Null),
            },
        }
    }

    fn parse_error(&self, response: &HttpResponse) -> StubError {
        let root = std::str::from_utf8(&response.body)
            .ok()
            .and_then(|doc| parse_document(doc).ok());
        let text_of = |name: &str| {
            root.as_ref()
                .and_then(|r| r.find(name))
                .map(|el| el.text.clone())
        };

        StubError::Service {
            code: text_of("Code").unwrap_or_else(|| status_error_code(response.status_code)),
            message: text_of("Message").unwrap_or_default(),
            status_code: response.status_code,
        }
    }
}

impl Protocol for XmlProtocol {
    fn family(&self) -> ProtocolFamily {
        self.family
    }

    fn stub_error(&self, _model: &ServiceModel, _operation: &str, code: &str) -> HttpResponse {
        let mut w = XmlWriter::new();
        match self.family {
            ProtocolFamily::Ec2 => {
                w.open("Response", None);
                w.open("Errors", None);
                w.open("Error", None);
                w.text_element("Code", code);
                w.text_element("Message", STUB_ERROR_MESSAGE);
                w.close("Error");
                w.close("Errors");
                w.text_element("RequestID", STUB_REQUEST_ID);
                w.close("Response");
            }
            ProtocolFamily::Query => {
                w.open("ErrorResponse", None);
                w.open("Error", None);
                w.text_element("Code", code);
                w.text_element("Message", STUB_ERROR_MESSAGE);
                w.close("Error");
                w.text_element("RequestId", STUB_REQUEST_ID);
                w.close("ErrorResponse");
            }
            _ => {
                w.open("Error", None);
                w.text_element("Code", code);
                w.text_element("Message", STUB_ERROR_MESSAGE);
                w.text_element("RequestId", STUB_REQUEST_ID);
                w.close("Error");
            }
        }

        HttpResponse::new(400)
            .with_header("Content-Type", "text/xml")
            .with_body(w.finish())
    }

    fn stub_data(
        &self,
        model: &ServiceModel,
        operation: &str,
        data: &Value,
    ) -> Result<HttpResponse> {
        let mut response = HttpResponse::new(200)
            .with_header("Content-Type", "text/xml")
            .with_header("x-amz-request-id", STUB_REQUEST_ID);
        let xmlns = model.metadata.xml_namespace.as_deref();
        let output = model.operation(operation)?.output.as_deref();
        let mut w = XmlWriter::new();

        match (self.family, output) {
            (ProtocolFamily::RestXml, None) => return Ok(response),
            (ProtocolFamily::RestXml, Some(output)) => {
                let body = apply_bindings(model, output, data, &mut response)?;
                w.open(output, xmlns);
                self.write_members(&mut w, model, output, &body)?;
                w.close(output);
            }
            (ProtocolFamily::Ec2, output) => {
                let root = format!("{}Response", operation);
                w.open(&root, xmlns);
                w.text_element("requestId", STUB_REQUEST_ID);
                if let Some(output) = output {
                    self.write_members(&mut w, model, output, data)?;
                }
                w.close(&root);
            }
            (_, output) => {
                let root = format!("{}Response", operation);
                let result = format!("{}Result", operation);
                w.open(&root, xmlns);
                if let Some(output) = output {
                    w.open(&result, None);
                    self.write_members(&mut w, model, output, data)?;
                    w.close(&result);
                }
                w.open("ResponseMetadata", None);
                w.text_element("RequestId", STUB_REQUEST_ID);
                w.close("ResponseMetadata");
                w.close(&root);
            }
        }

        Ok(response.with_body(w.finish()))
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

        let mut data = if response.body.iter().all(u8::is_ascii_whitespace) {
            Map::new()
        } else {
            let doc = std::str::from_utf8(&response.body)
                .map_err(|e| StubError::parse(self.family.as_str(), e))?;
            let root =
                parse_document(doc).map_err(|e| StubError::parse(self.family.as_str(), e))?;
            let container = match self.family {
                ProtocolFamily::Query => root
                    .child(&format!("{}Result", operation))
                    .unwrap_or(&root),
                _ => &root,
            };
            self.read_members(model, output, container)?
        };

        if self.family == ProtocolFamily::RestXml {
            read_bindings(self.family, model, output, response, &mut data)?;
        }
        Ok(Value::Object(data))
    }
}
