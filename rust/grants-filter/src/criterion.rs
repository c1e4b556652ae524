use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DataType, Operator};

/// One clause of a filter request: `field <operator> value [value2]`.
///
/// `value` and `value2` are opaque JSON and are sent exactly as given.
/// `value2` is only meaningful for range operators and is omitted from the
/// wire form when absent, as is `dataType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriterion {
    /// The field (column or dotted path) being filtered.
    pub field: String,
    /// The comparison to apply.
    pub operator: Operator,
    /// The operand. A JSON array for set operators.
    #[serde(default)]
    pub value: Value,
    /// The upper bound for range operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
    /// Coercion hint for the record store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
}

impl FilterCriterion {
    /// Create a criterion with a single operand.
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            value2: None,
            data_type: None,
        }
    }

    /// Create an inclusive `BETWEEN` criterion.
    pub fn between(field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            value2: Some(high.into()),
            ..Self::new(field, Operator::Between, low)
        }
    }

    /// Create an `IN` criterion over the given values, preserving their order.
    pub fn any_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(field, Operator::In, Value::Array(values))
    }

    /// Attach a coercion hint.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// The body of a `POST {resource}/filter` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRequest {
    /// Clauses, combined conjunctively by the record store.
    pub criteria: Vec<FilterCriterion>,
}

impl FilterRequest {
    /// A request with no criteria.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is nothing to filter on.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl From<Vec<FilterCriterion>> for FilterRequest {
    fn from(criteria: Vec<FilterCriterion>) -> Self {
        Self { criteria }
    }
}

impl FromIterator<FilterCriterion> for FilterRequest {
    fn from_iter<T: IntoIterator<Item = FilterCriterion>>(iter: T) -> Self {
        Self {
            criteria: iter.into_iter().collect(),
        }
    }
}
