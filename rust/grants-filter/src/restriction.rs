use serde_json::Value;

use crate::{DataType, FilterCriterion};

/// The access restriction a caller's grants impose on a query.
///
/// "There is nothing to restrict" and "the caller may see nothing" stay
/// distinct until the point where a query is issued.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeRestriction {
    /// No restriction applies; every record the other criteria match is visible.
    Unrestricted,
    /// Only records matching this criterion are visible.
    Restricted(FilterCriterion),
    /// No record is visible for this field. Queries must not be issued.
    Denied {
        /// The field the restriction was computed for.
        field: String,
    },
}

impl ScopeRestriction {
    /// Build a restriction from allowed scope values.
    ///
    /// An empty set of values yields [`ScopeRestriction::Unrestricted`]; callers
    /// with a deny-by-default posture must check for emptiness first, or use
    /// [`ScopeRestriction::from_values_or_deny`]. Otherwise the result is
    /// `{field, IN, [values...], dataType}` with the values' order preserved.
    pub fn from_values<I, V>(values: I, field: impl Into<String>, data_type: DataType) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return ScopeRestriction::Unrestricted;
        }
        ScopeRestriction::Restricted(FilterCriterion::any_of(field, values).with_data_type(data_type))
    }

    /// Like [`ScopeRestriction::from_values`], but an empty set of values
    /// denies everything instead of lifting the restriction.
    pub fn from_values_or_deny<I, V>(values: I, field: impl Into<String>, data_type: DataType) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let field = field.into();
        match Self::from_values(values, field.clone(), data_type) {
            ScopeRestriction::Unrestricted => ScopeRestriction::Denied { field },
            restriction => restriction,
        }
    }

    /// The criterion to merge, if any.
    pub fn criterion(&self) -> Option<&FilterCriterion> {
        match self {
            ScopeRestriction::Restricted(criterion) => Some(criterion),
            _ => None,
        }
    }

    /// True for [`ScopeRestriction::Denied`].
    pub fn is_denied(&self) -> bool {
        matches!(self, ScopeRestriction::Denied { .. })
    }
}
