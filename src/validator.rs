//! Structural validation of value trees against shapes.
//!
//! Explicit `null` is accepted anywhere. Required-member enforcement can be
//! switched off for stub data, where the generator fills the gaps itself.

use crate::error::{Result, StubError};
use crate::model::{ScalarKind, ServiceModel, Shape};
use serde_json::Value;

/// Validates a value tree against a named shape.
pub struct Validator<'a> {
    model: &'a ServiceModel,
    validate_required: bool,
}

impl<'a> Validator<'a> {
    /// Create a validator that enforces required members.
    pub fn new(model: &'a ServiceModel) -> Self {
        Self {
            model,
            validate_required: true,
        }
    }

    /// Stop rejecting structures that omit required members.
    pub fn without_required(mut self) -> Self {
        self.validate_required = false;
        self
    }

    /// Validate `value` against the shape named `shape_name`.
    ///
    /// All mismatches are collected into a single [`StubError::Validation`].
    pub fn validate(&self, shape_name: &str, value: &Value) -> Result<()> {
        let mut errors = Vec::new();
        self.check(shape_name, value, "params", &mut errors)?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StubError::Validation(errors))
        }
    }

    fn check(
        &self,
        shape_name: &str,
        value: &Value,
        context: &str,
        errors: &mut Vec<String>,
    ) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        match self.model.shape(shape_name)? {
            Shape::Structure { members, required } => {
                let Some(obj) = value.as_object() else {
                    errors.push(format!("expected {} to be a structure, got {}", context, value));
                    return Ok(());
                };
                if self.validate_required {
                    for name in required {
                        if !obj.contains_key(name) {
                            errors.push(format!("missing required parameter {}.{}", context, name));
                        }
                    }
                }
                for (name, member_value) in obj {
                    match members.get(name) {
                        Some(member) => self.check(
                            &member.shape,
                            member_value,
                            &format!("{}.{}", context, name),
                            errors,
                        )?,
                        None => errors.push(format!("unexpected value at {}.{}", context, name)),
                    }
                }
            }
            Shape::List { member } => {
                let Some(items) = value.as_array() else {
                    errors.push(format!("expected {} to be a list, got {}", context, value));
                    return Ok(());
                };
                for (i, item) in items.iter().enumerate() {
                    self.check(&member.shape, item, &format!("{}[{}]", context, i), errors)?;
                }
            }
            Shape::Map { value: value_ref, .. } => {
                let Some(entries) = value.as_object() else {
                    errors.push(format!("expected {} to be a map, got {}", context, value));
                    return Ok(());
                };
                for (key, entry) in entries {
                    self.check(
                        &value_ref.shape,
                        entry,
                        &format!("{}[{:?}]", context, key),
                        errors,
                    )?;
                }
            }
            scalar => {
                if let Some(kind) = scalar.scalar_kind() {
                    if !scalar_matches(kind, value) {
                        errors.push(format!(
                            "expected {} to be {}, got {}",
                            context,
                            kind_label(kind),
                            value
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn scalar_matches(kind: ScalarKind, value: &Value) -> bool {
    match kind {
        ScalarKind::String | ScalarKind::Blob => value.is_string(),
        ScalarKind::Integer => value.is_i64() || value.is_u64(),
        ScalarKind::Float => value.is_number(),
        ScalarKind::Boolean => value.is_boolean(),
        ScalarKind::Timestamp => match value {
            Value::String(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            Value::Number(_) => true,
            _ => false,
        },
    }
}

fn kind_label(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String => "a string",
        ScalarKind::Integer => "an integer",
        ScalarKind::Float => "a float",
        ScalarKind::Boolean => "true or false",
        ScalarKind::Timestamp => "a timestamp",
        ScalarKind::Blob => "a string of bytes",
    }
}
