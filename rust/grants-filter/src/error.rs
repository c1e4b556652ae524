use thiserror::Error;

use crate::Operator;

/// Errors produced while editing filter rows or assembling a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// No filterable fields were supplied, so a row has nothing to point at.
    #[error("No filterable fields are available")]
    NoFields,

    /// The referenced field is not part of the builder's field metadata.
    #[error("Unknown filter field '{field}'")]
    UnknownField {
        /// The field name that was not found.
        field: String,
    },

    /// The row index is out of bounds.
    #[error("No filter row at index {index}")]
    UnknownRow {
        /// The index that was requested.
        index: usize,
    },

    /// The operator is not in the field's operator set.
    #[error("Operator {operator} is not allowed for field '{field}'")]
    OperatorNotAllowed {
        /// The field being filtered.
        field: String,
        /// The rejected operator.
        operator: Operator,
    },

    /// A value was set on a row that has no field selected yet.
    #[error("Filter row {index} has no field selected")]
    MissingField {
        /// The row index.
        index: usize,
    },

    /// An access restriction denied every record, so no query may be issued.
    #[error("Access restriction denies all records for '{field}'")]
    AccessDenied {
        /// The restricted field.
        field: String,
    },
}
