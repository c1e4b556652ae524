use serde_json::Value;

use crate::{FieldMeta, FilterError, FilterRequest, FilterRow, Operator, parse_delimited};

/// The editable list of filter rows behind a filter bar.
///
/// Rows are kept in the order the user created them. Setters validate against
/// the field metadata, so a row can only ever carry an operator its field
/// allows. [`FilterCriteriaBuilder::build`] turns the current rows into a
/// [`FilterRequest`]; it never adds access restrictions, which are merged by
/// the caller through [`crate::CriteriaSet`].
#[derive(Debug, Clone, Default)]
pub struct FilterCriteriaBuilder {
    fields: Vec<FieldMeta>,
    rows: Vec<FilterRow>,
}

impl FilterCriteriaBuilder {
    /// Create an empty builder over the given fields.
    pub fn new(fields: Vec<FieldMeta>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
        }
    }

    /// Replace the rows wholesale, e.g. when restoring saved filters.
    pub fn with_rows(mut self, rows: Vec<FilterRow>) -> Self {
        self.rows = rows;
        self
    }

    /// The filterable fields.
    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The current rows.
    pub fn rows(&self) -> &[FilterRow] {
        &self.rows
    }

    /// Append a row pointing at the first field, returning its index.
    pub fn add_row(&mut self) -> Result<usize, FilterError> {
        let field = self.fields.first().ok_or(FilterError::NoFields)?;
        self.rows.push(FilterRow {
            field: Some(field.name.clone()),
            operator: field.initial_operator(),
            value: Value::String(String::new()),
            value2: None,
        });
        Ok(self.rows.len() - 1)
    }

    /// Remove a row, returning it.
    pub fn remove_row(&mut self, index: usize) -> Result<FilterRow, FilterError> {
        if index >= self.rows.len() {
            return Err(FilterError::UnknownRow { index });
        }
        Ok(self.rows.remove(index))
    }

    /// Point a row at a different field.
    ///
    /// The operator resets to the field's initial operator and both operands
    /// are cleared, since they were entered for the previous field.
    pub fn set_field(&mut self, index: usize, name: &str) -> Result<(), FilterError> {
        let operator = self
            .field(name)
            .ok_or_else(|| FilterError::UnknownField {
                field: name.to_owned(),
            })?
            .initial_operator();
        let row = self.row_mut(index)?;
        row.field = Some(name.to_owned());
        row.operator = operator;
        row.value = Value::String(String::new());
        row.value2 = None;
        Ok(())
    }

    /// Change a row's operator. Rejected when the row's field does not allow it.
    pub fn set_operator(&mut self, index: usize, operator: Operator) -> Result<(), FilterError> {
        let field = self.field_of(index)?;
        if !field.allows(operator) {
            return Err(FilterError::OperatorNotAllowed {
                field: field.name.clone(),
                operator,
            });
        }
        self.row_mut(index)?.operator = Some(operator);
        Ok(())
    }

    /// Set a row's operand.
    pub fn set_value(&mut self, index: usize, value: impl Into<Value>) -> Result<(), FilterError> {
        self.field_of(index)?;
        self.row_mut(index)?.value = value.into();
        Ok(())
    }

    /// Set a row's second operand (upper bound of a range).
    pub fn set_value2(&mut self, index: usize, value2: impl Into<Value>) -> Result<(), FilterError> {
        self.field_of(index)?;
        self.row_mut(index)?.value2 = Some(value2.into());
        Ok(())
    }

    /// Set a row's operand to a list parsed from delimited text (`"a, b, c"`).
    pub fn set_values_delimited(&mut self, index: usize, input: &str) -> Result<(), FilterError> {
        self.set_values(index, parse_delimited(input))
    }

    /// Set a row's operand to a list of discrete values, e.g. a multi-select.
    pub fn set_values<I, V>(&mut self, index: usize, values: I) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.set_value(index, Value::Array(values))
    }

    /// Drop every row.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Indices of rows that are selectable but still miss a required operand.
    pub fn incomplete_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_selectable() && !row.has_operands())
            .map(|(index, _)| index)
            .collect()
    }

    /// Normalize the current rows into a request.
    ///
    /// Rows without a field or operator are dropped, operands pass through
    /// unmodified and a field's `data_type` hint is attached when its metadata
    /// declares one.
    pub fn build(&self) -> FilterRequest {
        self.rows
            .iter()
            .filter_map(|row| {
                let data_type = row
                    .field
                    .as_deref()
                    .and_then(|name| self.field(name))
                    .and_then(|field| field.data_type);
                row.to_criterion(data_type)
            })
            .collect()
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut FilterRow, FilterError> {
        self.rows
            .get_mut(index)
            .ok_or(FilterError::UnknownRow { index })
    }

    fn field_of(&self, index: usize) -> Result<&FieldMeta, FilterError> {
        let row = self
            .rows
            .get(index)
            .ok_or(FilterError::UnknownRow { index })?;
        let name = row
            .field
            .as_deref()
            .ok_or(FilterError::MissingField { index })?;
        self.field(name).ok_or_else(|| FilterError::UnknownField {
            field: name.to_owned(),
        })
    }
}
