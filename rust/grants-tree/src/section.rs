use indexmap::IndexMap;
use serde::Serialize;

use crate::resolver::can_perform;
use crate::{Action, GrantResolver, Resolution, Section};

/// The record operations most sections expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrudOperation {
    /// Add a record.
    Create,
    /// Browse or read records.
    List,
    /// Change a record.
    Update,
    /// Remove a record.
    Delete,
}

impl CrudOperation {
    /// Every operation, in display order.
    pub const ALL: [CrudOperation; 4] = [
        CrudOperation::Create,
        CrudOperation::List,
        CrudOperation::Update,
        CrudOperation::Delete,
    ];

    /// Action codes that stand for this operation, compared without regard to
    /// case.
    pub fn codes(&self) -> &'static [&'static str] {
        match self {
            CrudOperation::Create => &["create", "cre", "add", "new"],
            CrudOperation::List => &["list", "view", "read", "get"],
            CrudOperation::Update => &["update", "up", "edit", "modify"],
            CrudOperation::Delete => &["delete", "del", "remove"],
        }
    }

    /// The operation an action code stands for, if any.
    pub fn of(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|operation| {
            operation
                .codes()
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(code))
        })
    }
}

/// What the caller may do in one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPermissions {
    /// Some allowed action is a create.
    pub can_create: bool,
    /// Some allowed action is a list or read.
    pub can_list: bool,
    /// Some allowed action is an update.
    pub can_update: bool,
    /// Some allowed action is a delete.
    pub can_delete: bool,
    /// The actions that resolve to access, in tree order.
    pub actions: Vec<Action>,
    /// Number of actions in the section, allowed or not.
    pub total_actions: usize,
}

impl SectionPermissions {
    fn of(section: &Section) -> Self {
        let mut permissions = Self {
            total_actions: section.actions.len(),
            ..Self::default()
        };

        for action in section
            .actions
            .iter()
            .filter(|action| Resolution::of(action).has_access())
        {
            match CrudOperation::of(&action.code) {
                Some(CrudOperation::Create) => permissions.can_create = true,
                Some(CrudOperation::List) => permissions.can_list = true,
                Some(CrudOperation::Update) => permissions.can_update = true,
                Some(CrudOperation::Delete) => permissions.can_delete = true,
                None => {}
            }
            permissions.actions.push(action.clone());
        }

        permissions
    }

    /// Whether `operation` is allowed in the section.
    pub fn allows(&self, operation: CrudOperation) -> bool {
        match operation {
            CrudOperation::Create => self.can_create,
            CrudOperation::List => self.can_list,
            CrudOperation::Update => self.can_update,
            CrudOperation::Delete => self.can_delete,
        }
    }
}

/// One entry of [`GrantResolver::accessible_sections`], e.g. for a navigation
/// menu.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    /// The owning system's id.
    pub system_id: String,
    /// The owning system's display name.
    pub system_name: String,
    /// The section's id.
    pub section_id: String,
    /// The section's display name.
    pub section_name: String,
    /// What may be done in the section.
    pub permissions: SectionPermissions,
}

impl GrantResolver {
    /// True if at least one action of the section resolves to access.
    pub fn has_section_access(&self, section_id: &str) -> bool {
        self.tree()
            .section(section_id)
            .is_some_and(|(_, section)| section_has_access(section))
    }

    /// Create, list, update and delete rollup for a section. An unknown
    /// section allows nothing.
    pub fn section_permissions(&self, section_id: &str) -> SectionPermissions {
        self.tree()
            .section(section_id)
            .map(|(_, section)| SectionPermissions::of(section))
            .unwrap_or_default()
    }

    /// Every section with at least one allowed action, in tree order.
    pub fn accessible_sections(&self) -> Vec<SectionSummary> {
        self.tree()
            .systems
            .iter()
            .flat_map(|system| {
                system
                    .sections
                    .iter()
                    .filter(|section| section_has_access(section))
                    .map(move |section| SectionSummary {
                        system_id: system.system_id.clone(),
                        system_name: system.name.clone(),
                        section_id: section.system_section_id.clone(),
                        section_name: section.name.clone(),
                        permissions: SectionPermissions::of(section),
                    })
            })
            .collect()
    }

    /// Like [`GrantResolver::can_perform_action`], with the code lookup
    /// confined to one section.
    pub fn can_perform_action_in_section(
        &self,
        section_id: &str,
        code: &str,
        scope_value_id: Option<&str>,
    ) -> bool {
        self.tree()
            .section(section_id)
            .and_then(|(_, section)| section.actions.iter().find(|action| action.code == code))
            .is_some_and(|action| can_perform(action, scope_value_id))
    }

    /// True if every code can be performed somewhere. Vacuously true for no
    /// codes.
    pub fn has_all_actions<I, C>(&self, codes: I) -> bool
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        codes
            .into_iter()
            .all(|code| self.can_perform_action(code.as_ref(), None))
    }

    /// True if at least one code can be performed somewhere.
    pub fn has_any_action<I, C>(&self, codes: I) -> bool
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        codes
            .into_iter()
            .any(|code| self.can_perform_action(code.as_ref(), None))
    }

    /// [`GrantResolver::can_perform_action`] for each code, keyed in the order
    /// given.
    pub fn check_actions<I, C>(&self, codes: I) -> IndexMap<String, bool>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        codes
            .into_iter()
            .map(|code| {
                let code = code.as_ref();
                (code.to_owned(), self.can_perform_action(code, None))
            })
            .collect()
    }
}

fn section_has_access(section: &Section) -> bool {
    section
        .actions
        .iter()
        .any(|action| Resolution::of(action).has_access())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    fn fixture() -> TestResult<GrantResolver> {
        let tree = serde_json::from_value(json!({ "systems": [
            { "systemId": "S1", "name": "Administration", "sections": [
                { "systemSectionId": "users", "name": "User Management", "actions": [
                    { "systemSectionActionId": "A1", "code": "CRE", "effect": "ALLOW" },
                    { "systemSectionActionId": "A2", "code": "List",
                      "scopes": [{ "scopeValueId": "b1", "effect": "ALLOW" }] },
                    { "systemSectionActionId": "A3", "code": "Up", "effect": "NONE" },
                    { "systemSectionActionId": "A4", "code": "Del", "effect": "DENY",
                      "scopes": [{ "scopeValueId": "b1", "effect": "ALLOW" }] },
                    { "systemSectionActionId": "A5", "code": "export", "effect": "ALLOW" }
                ]},
                { "systemSectionId": "audit", "name": "Audit Log", "actions": [
                    { "systemSectionActionId": "A6", "code": "List", "effect": "NONE" }
                ]}
            ]},
            { "systemId": "S2", "name": "Catalog", "sections": [
                { "systemSectionId": "codes", "name": "Code Table", "actions": [
                    { "systemSectionActionId": "B1", "code": "List",
                      "scopes": [{ "scopeValueId": "b2", "effect": "DENY" }] },
                    { "systemSectionActionId": "B2", "code": "edit", "effect": "ALLOW" }
                ]}
            ]}
        ]}))?;
        Ok(GrantResolver::new(Arc::new(tree)))
    }

    #[test]
    fn it_maps_code_aliases_to_operations() {
        assert_eq!(CrudOperation::of("CRE"), Some(CrudOperation::Create));
        assert_eq!(CrudOperation::of("view"), Some(CrudOperation::List));
        assert_eq!(CrudOperation::of("Modify"), Some(CrudOperation::Update));
        assert_eq!(CrudOperation::of("remove"), Some(CrudOperation::Delete));
        assert_eq!(CrudOperation::of("export"), None);
        assert_eq!(CrudOperation::of("creat"), None);
    }

    #[test]
    fn it_requires_one_allowed_action_for_section_access() -> TestResult {
        let resolver = fixture()?;

        assert!(resolver.has_section_access("users"));
        assert!(resolver.has_section_access("codes"));
        assert!(!resolver.has_section_access("audit"));
        assert!(!resolver.has_section_access("missing"));
        Ok(())
    }

    #[test]
    fn it_rolls_up_section_permissions() -> TestResult {
        let permissions = fixture()?.section_permissions("users");

        assert!(permissions.can_create);
        assert!(permissions.can_list);
        assert!(!permissions.can_update);
        assert!(!permissions.can_delete);
        assert!(permissions.allows(CrudOperation::List));
        assert_eq!(permissions.total_actions, 5);

        let codes: Vec<&str> = permissions
            .actions
            .iter()
            .map(|action| action.code.as_str())
            .collect();
        assert_eq!(codes, vec!["CRE", "List", "export"]);
        Ok(())
    }

    #[test]
    fn it_allows_nothing_in_unknown_sections() -> TestResult {
        assert_eq!(
            fixture()?.section_permissions("missing"),
            SectionPermissions::default()
        );
        Ok(())
    }

    #[test]
    fn it_lists_accessible_sections_in_tree_order() -> TestResult {
        let sections = fixture()?.accessible_sections();

        let ids: Vec<(&str, &str)> = sections
            .iter()
            .map(|summary| (summary.system_name.as_str(), summary.section_id.as_str()))
            .collect();
        assert_eq!(ids, vec![("Administration", "users"), ("Catalog", "codes")]);

        let catalog = &sections[1].permissions;
        assert!(catalog.can_update);
        assert!(!catalog.can_list);

        let json = serde_json::to_value(&sections[0])?;
        assert_eq!(json["sectionName"], "User Management");
        assert_eq!(json["permissions"]["canCreate"], true);
        Ok(())
    }

    #[test]
    fn it_confines_code_lookups_to_a_section() -> TestResult {
        let resolver = fixture()?;

        assert!(resolver.can_perform_action("List", None));
        assert!(!resolver.can_perform_action_in_section("codes", "List", None));
        assert!(resolver.can_perform_action_in_section("users", "List", Some("b1")));
        assert!(!resolver.can_perform_action_in_section("users", "List", Some("b2")));
        assert!(!resolver.can_perform_action_in_section("users", "Del", Some("b1")));
        assert!(!resolver.can_perform_action_in_section("missing", "CRE", None));
        Ok(())
    }

    #[test]
    fn it_checks_several_codes_at_once() -> TestResult {
        let resolver = fixture()?;

        assert!(resolver.has_all_actions(["CRE", "export"]));
        assert!(!resolver.has_all_actions(["CRE", "Del"]));
        assert!(resolver.has_all_actions(Vec::<String>::new()));

        assert!(resolver.has_any_action(["Up", "edit"]));
        assert!(!resolver.has_any_action(["Up", "Del"]));
        assert!(!resolver.has_any_action(Vec::<String>::new()));

        let checked = resolver.check_actions(["Del", "CRE"]);
        assert_eq!(
            checked.into_iter().collect::<Vec<_>>(),
            vec![("Del".to_string(), false), ("CRE".to_string(), true)]
        );
        Ok(())
    }
}
