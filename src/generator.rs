//! Stub generation.
//!
//! Turns a partial value tree into a complete, shape-conformant value.
//! Members the caller supplied are kept, explicit `null` stays `null`, and
//! everything else receives a fixed placeholder for its type.

use crate::error::{Result, StubError};
use crate::model::{ScalarKind, ServiceModel, Shape};
use crate::validator::Validator;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Schema-driven stub generator.
pub struct StubGenerator<'a> {
    model: &'a ServiceModel,
}

/// The canonical result of an operation that returns no data.
pub fn empty_result() -> Value {
    Value::Object(Map::new())
}

impl<'a> StubGenerator<'a> {
    pub fn new(model: &'a ServiceModel) -> Self {
        Self { model }
    }

    /// Generate the output stub for `operation`.
    ///
    /// `data` is validated against the output shape first, with required
    /// members left unenforced. Paginator output tokens the caller did not
    /// supply are nulled so that paging over a stub terminates.
    pub fn stub_operation(&self, operation: &str, data: Option<&Value>) -> Result<Value> {
        let op = self.model.operation(operation)?;

        let Some(output) = &op.output else {
            return match data {
                None => Ok(empty_result()),
                Some(v) if is_empty(v) => Ok(empty_result()),
                Some(_) => Err(StubError::NoOutput(operation.to_string())),
            };
        };

        // The output root is never optional; null means no data.
        let empty = empty_result();
        let data = data.filter(|v| !v.is_null()).unwrap_or(&empty);
        Validator::new(self.model)
            .without_required()
            .validate(output, data)?;

        let mut stub = self.stub(output, data)?;

        if let Some(paginator) = &op.paginator {
            for token in &paginator.output_token {
                if lookup(data, token).is_none() {
                    clear(&mut stub, token);
                }
            }
        }

        debug!(operation = %operation, shape = %output, "Generated stub");
        Ok(stub)
    }

    /// Generate a stub for an arbitrary shape from an already-validated value.
    pub fn stub(&self, shape_name: &str, data: &Value) -> Result<Value> {
        let mut path = Vec::new();
        self.stub_value(shape_name, Some(data), &mut path)
    }

    /// `value` is `None` when the caller omitted this position entirely.
    /// `path` holds the structures currently being default-filled.
    fn stub_value(
        &self,
        shape_name: &str,
        value: Option<&Value>,
        path: &mut Vec<String>,
    ) -> Result<Value> {
        match self.model.shape(shape_name)? {
            Shape::Structure { members, required } => {
                let obj = match value {
                    None | Some(Value::Null) => return Ok(Value::Null),
                    Some(Value::Object(obj)) => obj,
                    Some(other) => {
                        return Err(StubError::Validation(vec![format!(
                            "expected {} to be a structure, got {}",
                            shape_name, other
                        )]))
                    }
                };

                let mut out = Map::new();
                for (name, member) in members {
                    let member_value = match obj.get(name) {
                        Some(Value::Null) => Value::Null,
                        Some(v) => self.stub_value(&member.shape, Some(v), path)?,
                        None => {
                            if required.contains(name)
                                && self.model.shape(&member.shape)?.is_structure()
                            {
                                self.fill_required(&member.shape, path)?
                            } else {
                                self.stub_value(&member.shape, None, path)?
                            }
                        }
                    };
                    out.insert(name.clone(), member_value);
                }
                Ok(Value::Object(out))
            }

            Shape::List { member } => {
                let items = value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
                items
                    .iter()
                    .map(|item| self.stub_value(&member.shape, Some(item), path))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }

            Shape::Map { value: value_ref, .. } => {
                let mut out = Map::new();
                if let Some(entries) = value.and_then(Value::as_object) {
                    for (key, entry) in entries {
                        out.insert(
                            key.clone(),
                            self.stub_value(&value_ref.shape, Some(entry), path)?,
                        );
                    }
                }
                Ok(Value::Object(out))
            }

            scalar => match value {
                Some(v) if !v.is_null() => Ok(v.clone()),
                _ => Ok(placeholder(shape_name, scalar.scalar_kind())),
            },
        }
    }

    /// Default-fill a required structure the caller omitted.
    fn fill_required(&self, shape_name: &str, path: &mut Vec<String>) -> Result<Value> {
        if path.iter().any(|s| s == shape_name) {
            return Ok(Value::Null);
        }
        path.push(shape_name.to_string());
        let filled = self.stub_value(shape_name, Some(&empty_result()), path);
        path.pop();
        filled
    }
}

fn placeholder(shape_name: &str, kind: Option<ScalarKind>) -> Value {
    match kind {
        Some(ScalarKind::String) => Value::String(shape_name.to_string()),
        Some(ScalarKind::Integer) => Value::from(0),
        Some(ScalarKind::Float) => Value::from(0.0),
        Some(ScalarKind::Boolean) => Value::Bool(false),
        Some(ScalarKind::Timestamp) => {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        Some(ScalarKind::Blob) | None => Value::Null,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

fn lookup<'v>(value: &'v Value, dotted: &str) -> Option<&'v Value> {
    dotted
        .split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn clear(value: &mut Value, dotted: &str) {
    let mut segments: Vec<&str> = dotted.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };
    let mut current = value;
    for segment in segments {
        match current.get_mut(segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(obj) = current.as_object_mut() {
        if obj.contains_key(last) {
            obj.insert(last.to_string(), Value::Null);
        }
    }
}
