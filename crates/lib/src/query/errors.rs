//! Error types for predicate parsing and evaluation.

use thiserror::Error;

/// Errors raised by the query engine.
///
/// Misses are not errors: a predicate that matches nothing yields the
/// not-found sentinel (`None` / empty vec) from the calling operation. These
/// variants cover genuine misuse: operators applied to incompatible types,
/// operator keys the engine does not know, and write-time directives
/// appearing where only filters are allowed.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QueryError {
    /// An operator was applied to a field or operand of the wrong type.
    #[error("Type mismatch for {operator} on field '{field}': expected {expected}")]
    TypeMismatch {
        /// The operator that failed
        operator: &'static str,
        /// The document field it was applied to
        field: String,
        /// The type the operator requires
        expected: &'static str,
    },

    /// A predicate referenced an operator key the engine does not support.
    #[error("Unknown operator '{operator}' on field '{field}'")]
    UnknownOperator {
        /// The unrecognized operator key
        operator: String,
        /// The field whose filter used it
        field: String,
    },

    /// A write-time directive (`$append` / `$remove`) was used in a find predicate.
    #[error("Directive '{operator}' on field '{field}' is only valid in a patch")]
    DirectiveInPredicate {
        /// The offending directive key
        operator: &'static str,
        /// The field whose filter used it
        field: String,
    },

    /// An operator's operand could not be used (e.g. an invalid pattern).
    #[error("Bad operand for {operator} on field '{field}': {reason}")]
    BadOperand {
        /// The operator whose operand was rejected
        operator: &'static str,
        /// The field whose filter used it
        field: String,
        /// Why the operand was rejected
        reason: String,
    },

    /// A predicate or patch was not a field mapping.
    #[error("Expected an object for a {context}, found {found}")]
    NotAnObject {
        /// "predicate" or "patch"
        context: &'static str,
        /// JSON kind of the rejected value
        found: &'static str,
    },
}

impl QueryError {
    /// Check if this error indicates a field/operand type violation.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, QueryError::TypeMismatch { .. })
    }

    /// Check if this error indicates an unsupported operator key.
    pub fn is_unknown_operator(&self) -> bool {
        matches!(self, QueryError::UnknownOperator { .. })
    }

    /// Check if this error indicates a directive outside a patch.
    pub fn is_misplaced_directive(&self) -> bool {
        matches!(self, QueryError::DirectiveInPredicate { .. })
    }

    /// Get the field name this error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            QueryError::TypeMismatch { field, .. }
            | QueryError::UnknownOperator { field, .. }
            | QueryError::DirectiveInPredicate { field, .. }
            | QueryError::BadOperand { field, .. } => Some(field),
            QueryError::NotAnObject { .. } => None,
        }
    }
}

impl From<QueryError> for crate::Error {
    fn from(err: QueryError) -> Self {
        crate::Error::Query(err)
    }
}
