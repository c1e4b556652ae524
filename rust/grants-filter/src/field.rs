use serde::{Deserialize, Serialize};

use crate::{DataType, FieldType, Operator};

/// Metadata describing one filterable field of a resource.
///
/// Resource metadata endpoints are not consistent about the name of the
/// identifying key, so `name` also accepts `field`, `accessorKey` and `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    /// The field key sent in criteria.
    #[serde(alias = "field", alias = "accessorKey", alias = "key")]
    pub name: String,
    /// Human readable label; falls back to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The field's shape.
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    /// Coercion hint forwarded with every criterion on this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// Overrides the type's default operator set when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<Operator>>,
    /// Allowed values for enum fields.
    #[serde(default, alias = "values", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl FieldMeta {
    /// Describe a field with the default operators for its type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: None,
            field_type,
            data_type: None,
            operators: None,
            enum_values: Vec::new(),
        }
    }

    /// Set a display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Replace the default operator set.
    pub fn with_operators(mut self, operators: impl Into<Vec<Operator>>) -> Self {
        self.operators = Some(operators.into());
        self
    }

    /// Forward a coercion hint with criteria on this field.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Restrict an enum field to a list of values.
    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// The label to display.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// The operators this field accepts.
    pub fn operators(&self) -> &[Operator] {
        match &self.operators {
            Some(operators) => operators,
            None => self.field_type.default_operators(),
        }
    }

    /// True if `operator` may be used on this field.
    pub fn allows(&self, operator: Operator) -> bool {
        self.operators().contains(&operator)
    }

    /// The operator a freshly selected field starts with.
    ///
    /// `EQUAL` when allowed, otherwise the first operator of the set.
    pub fn initial_operator(&self) -> Option<Operator> {
        if self.allows(Operator::Equal) {
            Some(Operator::Equal)
        } else {
            self.operators().first().copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_uses_type_defaults_without_an_override() {
        let field = FieldMeta::new("createdAt", FieldType::Date);
        assert!(field.allows(Operator::Before));
        assert!(!field.allows(Operator::Like));
        assert_eq!(field.label(), "createdAt");
    }

    #[test]
    fn it_prefers_the_metadata_override() {
        let field = FieldMeta::new("status", FieldType::String)
            .with_operators([Operator::In, Operator::NotIn]);
        assert!(field.allows(Operator::NotIn));
        assert!(!field.allows(Operator::Like));
        assert_eq!(field.initial_operator(), Some(Operator::In));
    }

    #[test]
    fn it_reads_loosely_shaped_metadata() {
        let field: FieldMeta = serde_json::from_value(json!({
            "accessorKey": "country",
            "header": "Country",
            "type": "enum",
            "values": ["LB", "SY"]
        }))
        .unwrap();

        assert_eq!(field.name, "country");
        assert_eq!(field.field_type, FieldType::Enum);
        assert_eq!(field.enum_values, vec!["LB", "SY"]);
        assert_eq!(field.operators(), &[Operator::Equal, Operator::In]);
    }

    #[test]
    fn it_defaults_missing_types_to_string() {
        let field: FieldMeta = serde_json::from_value(json!({ "name": "title" })).unwrap();
        assert_eq!(field.field_type, FieldType::String);
    }
}
