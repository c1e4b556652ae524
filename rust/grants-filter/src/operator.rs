use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A comparison understood by the record store's filter endpoint.
///
/// Operators serialize in `SCREAMING_SNAKE_CASE` (`STARTS_WITH`, `IN`, ...),
/// which is the wire form the record store expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Case-insensitive substring match.
    Like,
    /// Exact equality.
    Equal,
    /// Inequality.
    NotEqual,
    /// Case-insensitive prefix match.
    StartsWith,
    /// Case-insensitive suffix match.
    EndsWith,
    /// Membership in a set of discrete values.
    In,
    /// Non-membership in a set of discrete values.
    NotIn,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Inclusive range; needs both `value` and `value2`.
    Between,
    /// Earlier than a date or instant.
    Before,
    /// Later than a date or instant.
    After,
    /// The field has no value.
    IsNull,
    /// The field has a value.
    IsNotNull,
}

impl Operator {
    /// The wire name of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Like => "LIKE",
            Operator::Equal => "EQUAL",
            Operator::NotEqual => "NOT_EQUAL",
            Operator::StartsWith => "STARTS_WITH",
            Operator::EndsWith => "ENDS_WITH",
            Operator::In => "IN",
            Operator::NotIn => "NOT_IN",
            Operator::Gt => "GT",
            Operator::Gte => "GTE",
            Operator::Lt => "LT",
            Operator::Lte => "LTE",
            Operator::Between => "BETWEEN",
            Operator::Before => "BEFORE",
            Operator::After => "AFTER",
            Operator::IsNull => "IS_NULL",
            Operator::IsNotNull => "IS_NOT_NULL",
        }
    }

    /// True for operators that compare against a second bound (`value2`).
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Between)
    }

    /// True for operators whose `value` is a set of discrete values.
    pub fn is_set(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// True for operators that take no operand at all.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shape of a filterable field, which decides its default operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text.
    #[default]
    String,
    /// Integer or decimal.
    Number,
    /// Calendar date.
    Date,
    /// Date with time of day.
    #[serde(alias = "dateTime")]
    Datetime,
    /// True / false.
    Boolean,
    /// One of a fixed list of values.
    Enum,
}

const STRING_OPERATORS: &[Operator] = &[
    Operator::Like,
    Operator::Equal,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::In,
];

const NUMBER_OPERATORS: &[Operator] = &[
    Operator::Equal,
    Operator::Gt,
    Operator::Gte,
    Operator::Lt,
    Operator::Lte,
    Operator::Between,
    Operator::In,
];

const TEMPORAL_OPERATORS: &[Operator] = &[
    Operator::Equal,
    Operator::Before,
    Operator::After,
    Operator::Between,
];

const BOOLEAN_OPERATORS: &[Operator] = &[Operator::Equal];

const ENUM_OPERATORS: &[Operator] = &[Operator::Equal, Operator::In];

impl FieldType {
    /// Operators offered for this type when field metadata does not
    /// override them.
    pub fn default_operators(&self) -> &'static [Operator] {
        match self {
            FieldType::String => STRING_OPERATORS,
            FieldType::Number => NUMBER_OPERATORS,
            FieldType::Date | FieldType::Datetime => TEMPORAL_OPERATORS,
            FieldType::Boolean => BOOLEAN_OPERATORS,
            FieldType::Enum => ENUM_OPERATORS,
        }
    }
}
