use serde::{Deserialize, Serialize};

use crate::FieldType;

/// How the record store should coerce a criterion's value before comparing.
///
/// Coercion is the record store's job; this type only names the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// A UUID. Scope value identifiers default to this.
    #[default]
    Uuid,
    /// Plain text.
    String,
    /// Decimal number.
    Number,
    /// Boolean.
    Boolean,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// UTC instant.
    Instant,
    /// Date-time with offset.
    OffsetDateTime,
    /// Named enum constant.
    Enum,
}

impl From<FieldType> for DataType {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => DataType::String,
            FieldType::Number => DataType::Number,
            FieldType::Date => DataType::Date,
            FieldType::Datetime => DataType::Instant,
            FieldType::Boolean => DataType::Boolean,
            FieldType::Enum => DataType::Enum,
        }
    }
}
