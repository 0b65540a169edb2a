//! Predicate and patch evaluation.
//!
//! A predicate is a mapping from field name to either a literal or an
//! operator-object; a document matches iff every field passes its check.
//! Rather than inspecting value types at runtime, the engine parses incoming
//! JSON into tagged variants ([`Filter`], [`Op`]) once and evaluates them by
//! exhaustive matching.
//!
//! Patches reuse the same parser surface but admit the write-time directives
//! `$append` and `$remove`, which are rejected inside find predicates.

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::Result;
use crate::constants::ID_FIELD;
use crate::document::Document;

pub mod errors;
pub use errors::QueryError;

/// JSON kind name for diagnostics.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The per-field check of a predicate.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Exact equality against the document field; no coercion.
    Literal(Value),
    /// One or more operators, all of which must pass.
    Ops(Vec<Op>),
    /// A predicate value kind the engine does not support (e.g. an array
    /// literal). Never matches, but is not an error.
    Unsupported,
}

/// A single predicate operator with its typed operand.
#[derive(Debug, Clone)]
pub enum Op {
    /// Field ≥ operand; both must be numeric.
    Ge(Value),
    /// Field ≤ operand; both must be numeric.
    Le(Value),
    /// Substring check on a string field, membership check on an array field.
    Includes(Value),
    /// Compiled pattern tested against a string field.
    Regex(Regex),
}

impl Op {
    fn matches(&self, field: &str, value: &Value) -> Result<bool> {
        match self {
            Op::Ge(operand) => match (value.as_f64(), operand.as_f64()) {
                (Some(lhs), Some(rhs)) => Ok(lhs >= rhs),
                _ => Err(QueryError::TypeMismatch {
                    operator: "$ge",
                    field: field.to_string(),
                    expected: "number",
                }
                .into()),
            },
            Op::Le(operand) => match (value.as_f64(), operand.as_f64()) {
                (Some(lhs), Some(rhs)) => Ok(lhs <= rhs),
                _ => Err(QueryError::TypeMismatch {
                    operator: "$le",
                    field: field.to_string(),
                    expected: "number",
                }
                .into()),
            },
            Op::Includes(operand) => match value {
                Value::String(s) => match operand.as_str() {
                    Some(needle) => Ok(s.contains(needle)),
                    None => Err(QueryError::TypeMismatch {
                        operator: "$includes",
                        field: field.to_string(),
                        expected: "string operand for a string field",
                    }
                    .into()),
                },
                Value::Array(items) => Ok(items.contains(operand)),
                _ => Err(QueryError::TypeMismatch {
                    operator: "$includes",
                    field: field.to_string(),
                    expected: "string or array field",
                }
                .into()),
            },
            Op::Regex(pattern) => match value.as_str() {
                Some(s) => Ok(pattern.is_match(s)),
                None => Err(QueryError::TypeMismatch {
                    operator: "$regex",
                    field: field.to_string(),
                    expected: "string field",
                }
                .into()),
            },
        }
    }
}

impl Filter {
    fn parse(field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Object(ops) => {
                let mut parsed = Vec::with_capacity(ops.len());
                for (key, operand) in ops {
                    match key.as_str() {
                        "$ge" => parsed.push(Op::Ge(operand.clone())),
                        "$le" => parsed.push(Op::Le(operand.clone())),
                        "$includes" => parsed.push(Op::Includes(operand.clone())),
                        "$regex" => {
                            let source = operand.as_str().ok_or_else(|| QueryError::BadOperand {
                                operator: "$regex",
                                field: field.to_string(),
                                reason: format!("pattern must be a string, found {}", kind_of(operand)),
                            })?;
                            let pattern =
                                Regex::new(source).map_err(|e| QueryError::BadOperand {
                                    operator: "$regex",
                                    field: field.to_string(),
                                    reason: e.to_string(),
                                })?;
                            parsed.push(Op::Regex(pattern));
                        }
                        "$append" => {
                            return Err(QueryError::DirectiveInPredicate {
                                operator: "$append",
                                field: field.to_string(),
                            }
                            .into());
                        }
                        "$remove" => {
                            return Err(QueryError::DirectiveInPredicate {
                                operator: "$remove",
                                field: field.to_string(),
                            }
                            .into());
                        }
                        other => {
                            return Err(QueryError::UnknownOperator {
                                operator: other.to_string(),
                                field: field.to_string(),
                            }
                            .into());
                        }
                    }
                }
                Ok(Filter::Ops(parsed))
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Ok(Filter::Literal(value.clone()))
            }
            Value::Array(_) => Ok(Filter::Unsupported),
        }
    }
}

/// A parsed find predicate: logical AND across per-field filters.
#[derive(Debug, Clone)]
pub struct Query {
    fields: Vec<(String, Filter)>,
}

impl Query {
    /// Parse a predicate from its JSON form.
    ///
    /// The predicate must be an object. Operator-objects may combine several
    /// operators on one field; unknown operator keys are rejected with
    /// [`QueryError::UnknownOperator`], and the write-time directives
    /// `$append`/`$remove` with [`QueryError::DirectiveInPredicate`].
    pub fn parse(predicate: &Value) -> Result<Self> {
        let Value::Object(map) = predicate else {
            return Err(QueryError::NotAnObject {
                context: "predicate",
                found: kind_of(predicate),
            }
            .into());
        };
        let mut fields = Vec::with_capacity(map.len());
        for (field, value) in map {
            fields.push((field.clone(), Filter::parse(field, value)?));
        }
        Ok(Self { fields })
    }

    /// Evaluate the predicate against one document.
    ///
    /// Literal filters compare with exact equality. Operator filters require
    /// the field to exist in the document; a missing field fails the
    /// predicate immediately. Evaluation errors (type mismatches) propagate
    /// and abort the calling scan.
    pub fn matches(&self, doc: &Document) -> Result<bool> {
        for (field, filter) in &self.fields {
            match filter {
                Filter::Literal(expected) => {
                    if doc.get(field) != Some(expected) {
                        return Ok(false);
                    }
                }
                Filter::Ops(ops) => {
                    let Some(value) = doc.get(field) else {
                        return Ok(false);
                    };
                    for op in ops {
                        if !op.matches(field, value)? {
                            return Ok(false);
                        }
                    }
                }
                Filter::Unsupported => return Ok(false),
            }
        }
        Ok(true)
    }
}

/// A write-time merge directive inside a patch field.
#[derive(Debug, Clone)]
pub enum Directive {
    /// Concatenate the operand onto an array field (creating it if absent).
    Append(Value),
    /// Delete the field (`null`/`true` operand) or remove matching elements
    /// from an array field.
    Remove(Value),
}

/// The per-field action of a patch.
#[derive(Debug, Clone)]
enum PatchField {
    /// Replace the field with the given value.
    Set(Value),
    /// Apply merge directives in order.
    Directives(Vec<Directive>),
}

/// A parsed update patch: a shallow merge with optional merge directives.
#[derive(Debug, Clone)]
pub struct Patch {
    fields: Vec<(String, PatchField)>,
}

impl Patch {
    /// Parse a patch from its JSON form.
    ///
    /// A field whose value is an object containing `$`-prefixed keys is a
    /// directive object; only `$append` and `$remove` are valid there, and
    /// mixing directives with plain keys is rejected. Any other value —
    /// including plain nested objects — replaces the field wholesale.
    pub fn parse(patch: &Value) -> Result<Self> {
        let Value::Object(map) = patch else {
            return Err(QueryError::NotAnObject {
                context: "patch",
                found: kind_of(patch),
            }
            .into());
        };
        let mut fields = Vec::with_capacity(map.len());
        for (field, value) in map {
            let parsed = match value {
                Value::Object(inner) if inner.keys().any(|k| k.starts_with('$')) => {
                    let mut directives = Vec::with_capacity(inner.len());
                    for (key, operand) in inner {
                        match key.as_str() {
                            "$append" => directives.push(Directive::Append(operand.clone())),
                            "$remove" => directives.push(Directive::Remove(operand.clone())),
                            other => {
                                return Err(QueryError::UnknownOperator {
                                    operator: other.to_string(),
                                    field: field.clone(),
                                }
                                .into());
                            }
                        }
                    }
                    PatchField::Directives(directives)
                }
                other => PatchField::Set(other.clone()),
            };
            fields.push((field.clone(), parsed));
        }
        Ok(Self { fields })
    }

    /// Shallow-merge this patch into a document.
    ///
    /// The `_id` field is authoritative and never modified by a patch.
    pub fn apply(&self, doc: &mut Document) -> Result<()> {
        for (field, action) in &self.fields {
            if field == ID_FIELD {
                warn!(field = ID_FIELD, "ignoring patch on the primary key");
                continue;
            }
            match action {
                PatchField::Set(value) => {
                    doc.fields_mut().insert(field.clone(), value.clone());
                }
                PatchField::Directives(directives) => {
                    for directive in directives {
                        apply_directive(doc, field, directive)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn apply_directive(doc: &mut Document, field: &str, directive: &Directive) -> Result<()> {
    match directive {
        Directive::Append(operand) => match doc.fields_mut().get_mut(field) {
            Some(Value::Array(items)) => {
                match operand {
                    Value::Array(more) => items.extend(more.iter().cloned()),
                    single => items.push(single.clone()),
                }
                Ok(())
            }
            Some(_) => Err(QueryError::TypeMismatch {
                operator: "$append",
                field: field.to_string(),
                expected: "array field",
            }
            .into()),
            None => {
                let items = match operand {
                    Value::Array(more) => more.clone(),
                    single => vec![single.clone()],
                };
                doc.fields_mut().insert(field.to_string(), Value::Array(items));
                Ok(())
            }
        },
        Directive::Remove(operand) => match operand {
            Value::Null | Value::Bool(true) => {
                doc.fields_mut().remove(field);
                Ok(())
            }
            element => match doc.fields_mut().get_mut(field) {
                Some(Value::Array(items)) => {
                    items.retain(|item| item != element);
                    Ok(())
                }
                Some(_) => Err(QueryError::TypeMismatch {
                    operator: "$remove",
                    field: field.to_string(),
                    expected: "array field",
                }
                .into()),
                // Removing from an absent field is a no-op
                None => Ok(()),
            },
        },
    }
}
