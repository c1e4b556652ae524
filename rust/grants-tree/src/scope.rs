use grants_filter::{DataType, ScopeRestriction};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::{Action, GrantTree, Resolution, Scope};

/// Table name reported for scopes that do not name their dimension.
pub const UNKNOWN_TABLE: &str = "Unknown";

/// What to do when a section grants no scope values at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyScopes {
    /// Apply no restriction.
    #[default]
    Unrestricted,
    /// Show nothing; the query must not be issued.
    Deny,
}

/// Scope rollup for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionScopeSummary {
    /// Allowed scope values, deduplicated in first-seen order.
    pub scope_value_ids: Vec<String>,
    /// Some action of the section resolves to access.
    pub has_access: bool,
    /// Some action of the section is granted unconditionally.
    pub is_global_access: bool,
}

/// Turns scope grants into row-level restrictions.
#[derive(Debug, Clone, Copy)]
pub struct ScopeExtractor<'a> {
    tree: &'a GrantTree,
}

impl<'a> ScopeExtractor<'a> {
    /// Extract from the given tree.
    pub fn new(tree: &'a GrantTree) -> Self {
        Self { tree }
    }

    /// Allowed scope values across the tree, or within one section.
    ///
    /// Only actions without an action-level effect contribute; scopes under an
    /// explicit `DENY` or `NONE` action grant nothing, and an `ALLOW` action
    /// is not restricted by its scopes.
    pub fn extract_scoped_values(&self, section_id: Option<&str>) -> IndexSet<String> {
        self.allowed_scopes(section_id)
            .map(|scope| scope.scope_value_id.clone())
            .collect()
    }

    /// Like [`ScopeExtractor::extract_scoped_values`], limited to scopes of
    /// one table.
    pub fn extract_scoped_values_in_table(
        &self,
        section_id: Option<&str>,
        table_name: &str,
    ) -> IndexSet<String> {
        self.allowed_scopes(section_id)
            .filter(|scope| scope.table_name.as_deref() == Some(table_name))
            .map(|scope| scope.scope_value_id.clone())
            .collect()
    }

    /// Allowed scope values of a section, grouped by table.
    pub fn scopes_by_table(&self, section_id: &str) -> IndexMap<String, IndexSet<String>> {
        let mut tables: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for scope in self.allowed_scopes(Some(section_id)) {
            let table = scope.table_name.as_deref().unwrap_or(UNKNOWN_TABLE);
            tables
                .entry(table.to_owned())
                .or_default()
                .insert(scope.scope_value_id.clone());
        }
        tables
    }

    /// True if any action of the section carries any scope, whatever its
    /// effect.
    pub fn has_scopes_defined(&self, section_id: &str) -> bool {
        self.section_actions(Some(section_id))
            .any(|action| !action.scopes.is_empty())
    }

    /// An `IN` restriction over the given values, or
    /// [`ScopeRestriction::Unrestricted`] if there are none.
    pub fn build_scope_criterion<I, V>(
        values: I,
        field: impl Into<String>,
        data_type: DataType,
    ) -> ScopeRestriction
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        ScopeRestriction::from_values(values, field, data_type)
    }

    /// The restriction a section's grants impose on `field`.
    ///
    /// A section with any unconditionally granted action is unrestricted.
    /// Otherwise its allowed scope values restrict the field; when there are
    /// none, `empty` decides.
    pub fn restriction_for(
        &self,
        section_id: &str,
        field: impl Into<String>,
        data_type: DataType,
        empty: EmptyScopes,
    ) -> ScopeRestriction {
        let global = self
            .section_actions(Some(section_id))
            .any(|action| Resolution::of(action).is_unconditional());
        if global {
            return ScopeRestriction::Unrestricted;
        }

        let values = self.extract_scoped_values(Some(section_id));
        match empty {
            EmptyScopes::Unrestricted => ScopeRestriction::from_values(values, field, data_type),
            EmptyScopes::Deny => ScopeRestriction::from_values_or_deny(values, field, data_type),
        }
    }

    /// Scope rollup for a section.
    pub fn section_scope_summary(&self, section_id: &str) -> SectionScopeSummary {
        let mut has_access = false;
        let mut is_global_access = false;
        for action in self.section_actions(Some(section_id)) {
            let resolution = Resolution::of(action);
            has_access |= resolution.has_access();
            is_global_access |= resolution.is_unconditional();
        }

        SectionScopeSummary {
            scope_value_ids: self
                .extract_scoped_values(Some(section_id))
                .into_iter()
                .collect(),
            has_access,
            is_global_access,
        }
    }

    fn section_actions<'s>(
        &'s self,
        section_id: Option<&'s str>,
    ) -> impl Iterator<Item = &'a Action> + 's {
        self.tree
            .systems
            .iter()
            .flat_map(|system| system.sections.iter())
            .filter(move |section| {
                section_id.is_none_or(|section_id| section.system_section_id == section_id)
            })
            .flat_map(|section| section.actions.iter())
    }

    fn allowed_scopes<'s>(
        &'s self,
        section_id: Option<&'s str>,
    ) -> impl Iterator<Item = &'a Scope> + 's {
        self.section_actions(section_id)
            .flat_map(|action| match Resolution::of(action) {
                Resolution::Scoped { allowed, .. } => allowed,
                _ => vec![],
            })
    }
}
