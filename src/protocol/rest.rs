//! Header and status-code bindings shared by the rest protocols.

use super::{scalar_from_text, scalar_to_text, ProtocolFamily};
use crate::error::{Result, StubError};
use crate::model::{Location, ServiceModel, Shape};
use crate::stub::HttpResponse;
use serde_json::{Map, Value};

/// Move header- and status-bound members of `data` onto `response`.
///
/// Returns the members that belong in the body.
pub(crate) fn apply_bindings(
    model: &ServiceModel,
    shape_name: &str,
    data: &Value,
    response: &mut HttpResponse,
) -> Result<Value> {
    let (Shape::Structure { members, .. }, Some(obj)) = (model.shape(shape_name)?, data.as_object())
    else {
        return Ok(data.clone());
    };

    let mut body = Map::new();
    for (name, value) in obj {
        let Some(member) = members.get(name) else {
            continue;
        };
        match member.location {
            Location::Body => {
                body.insert(name.clone(), value.clone());
            }
            _ if value.is_null() => {}
            Location::Header => {
                let kind = model.shape(&member.shape)?.scalar_kind().ok_or_else(|| {
                    StubError::Validation(vec![format!("header member {} must be a scalar", name)])
                })?;
                response
                    .headers
                    .insert(member.wire_name(name).to_string(), scalar_to_text(kind, value));
            }
            Location::StatusCode => {
                response.status_code = value
                    .as_u64()
                    .and_then(|code| u16::try_from(code).ok())
                    .ok_or_else(|| {
                        StubError::Validation(vec![format!("invalid status code for {}: {}", name, value)])
                    })?;
            }
        }
    }
    Ok(Value::Object(body))
}

/// Read header- and status-bound members from `response` into `out`.
pub(crate) fn read_bindings(
    family: ProtocolFamily,
    model: &ServiceModel,
    shape_name: &str,
    response: &HttpResponse,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let Shape::Structure { members, .. } = model.shape(shape_name)? else {
        return Ok(());
    };

    for (name, member) in members {
        match member.location {
            Location::Body => {}
            Location::Header => {
                if let Some(text) = response.header(member.wire_name(name)) {
                    if let Some(kind) = model.shape(&member.shape)?.scalar_kind() {
                        out.insert(name.clone(), scalar_from_text(family, kind, text)?);
                    }
                }
            }
            Location::StatusCode => {
                out.insert(name.clone(), Value::from(response.status_code));
            }
        }
    }
    Ok(())
}
