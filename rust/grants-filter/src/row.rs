use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DataType, FilterCriterion, FilterRequest, Operator};

/// One user-edited line of a filter bar.
///
/// Rows may be half filled while the user is editing; [`FilterRequest::from_rows`]
/// skips any row without a field or an operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRow {
    /// The selected field, if any.
    #[serde(default, alias = "key", skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The selected operator, if any.
    #[serde(default, alias = "op", skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// The operand as entered.
    #[serde(default)]
    pub value: Value,
    /// The second operand for range operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
}

impl FilterRow {
    /// A row with a field and an operator but no operand yet.
    pub fn new(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: Some(field.into()),
            operator: Some(operator),
            value: Value::Null,
            value2: None,
        }
    }

    /// Set the operand.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the second operand.
    pub fn with_value2(mut self, value2: impl Into<Value>) -> Self {
        self.value2 = Some(value2.into());
        self
    }

    /// True when the row names both a field and an operator.
    pub fn is_selectable(&self) -> bool {
        self.field.as_deref().is_some_and(|field| !field.is_empty()) && self.operator.is_some()
    }

    /// True when the operands required by the operator are present.
    ///
    /// `BETWEEN` needs both bounds, set operators need at least one value,
    /// null checks need nothing.
    pub fn has_operands(&self) -> bool {
        let Some(operator) = self.operator else {
            return false;
        };
        if operator.is_unary() {
            return true;
        }
        if operator.is_range() {
            return is_present(&self.value) && self.value2.as_ref().is_some_and(is_present);
        }
        if operator.is_set() {
            return match &self.value {
                Value::Array(values) => !values.is_empty(),
                other => is_present(other),
            };
        }
        is_present(&self.value)
    }

    /// Convert into a criterion, if the row is selectable.
    pub fn to_criterion(&self, data_type: Option<DataType>) -> Option<FilterCriterion> {
        if !self.is_selectable() {
            return None;
        }
        let (Some(field), Some(operator)) = (&self.field, self.operator) else {
            return None;
        };
        Some(FilterCriterion {
            field: field.clone(),
            operator,
            value: self.value.clone(),
            value2: self.value2.clone(),
            data_type,
        })
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}

/// Split a delimited list of values (`"a, b,,c"`) into trimmed, non-empty
/// entries, keeping their order.
pub fn parse_delimited(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

impl FilterRequest {
    /// Normalize rows into a request, dropping any row without a field or an
    /// operator. Operands are passed through untouched.
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a FilterRow>,
    {
        rows.into_iter()
            .filter_map(|row| row.to_criterion(None))
            .collect()
    }
}
