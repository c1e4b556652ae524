use serde::{Deserialize, Deserializer, Serialize};

use crate::Effect;

/// The full set of grants for one caller.
///
/// A tree is immutable once fetched. Consumers share it behind an `Arc` and
/// replace it wholesale when a newer one arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrantTree {
    /// Systems, in the order the grant service returned them.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub systems: Vec<System>,
}

/// A protected system (an application area such as "Appointments").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    /// Stable identifier.
    pub system_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Sections of the system the caller has entries for.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sections: Vec<Section>,
}

/// A section of a system (a page or resource family).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// The join key for sections. Older payloads call it `sectionId`; both
    /// names deserialize into this field.
    #[serde(alias = "sectionId")]
    pub system_section_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Actions of this section.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actions: Vec<Action>,
}

/// An operation within a section, e.g. `create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Stable identifier.
    pub system_section_action_id: String,
    /// Short code callers check against, e.g. `CREATE_USER`.
    #[serde(default)]
    pub code: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Action-level effect. Unset means "decided by scopes".
    #[serde(default)]
    pub effect: Option<Effect>,
    /// Scope-level grants. May repeat a scope value.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scopes: Vec<Scope>,
}

/// A restriction value within an action, e.g. one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Opaque identifier of the restricted value. Empty identifiers never
    /// grant anything.
    #[serde(default)]
    pub scope_value_id: String,
    /// Scope-level effect.
    #[serde(default)]
    pub effect: Option<Effect>,
    /// The restrictable dimension this value belongs to (e.g.
    /// "Organization Branch").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
}

impl Scope {
    /// True if this scope carries an explicit `ALLOW` and a usable id.
    pub fn is_allowed(&self) -> bool {
        self.effect == Some(Effect::Allow) && !self.scope_value_id.is_empty()
    }

    /// True if this scope carries an explicit `DENY`.
    pub fn is_denied(&self) -> bool {
        self.effect == Some(Effect::Deny)
    }
}

/// Where an action sits in the tree.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    /// The owning system.
    pub system: &'a System,
    /// The owning section.
    pub section: &'a Section,
    /// The action itself.
    pub action: &'a Action,
}

impl GrantTree {
    /// A tree with no grants. Every check against it is denied.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Find a system by id.
    pub fn system(&self, system_id: &str) -> Option<&System> {
        self.systems
            .iter()
            .find(|system| system.system_id == system_id)
    }

    /// Every action in tree order, with its system and section.
    pub fn actions(&self) -> impl Iterator<Item = Located<'_>> {
        self.systems.iter().flat_map(|system| {
            system.sections.iter().flat_map(move |section| {
                section.actions.iter().map(move |action| Located {
                    system,
                    section,
                    action,
                })
            })
        })
    }

    /// Every section with the given id, across all systems.
    pub fn sections_with_id<'a>(
        &'a self,
        section_id: &'a str,
    ) -> impl Iterator<Item = &'a Section> + 'a {
        self.systems
            .iter()
            .flat_map(|system| system.sections.iter())
            .filter(move |section| section.system_section_id == section_id)
    }

    /// The section with the given id, together with its system.
    pub fn section(&self, section_id: &str) -> Option<(&System, &Section)> {
        self.systems.iter().find_map(|system| {
            system
                .section(section_id)
                .map(|section| (system, section))
        })
    }

    /// The first action with the given id.
    pub fn action_by_id(&self, action_id: &str) -> Option<Located<'_>> {
        self.actions()
            .find(|located| located.action.system_section_action_id == action_id)
    }

    /// The first action with the given code.
    pub fn action_by_code(&self, code: &str) -> Option<Located<'_>> {
        self.actions().find(|located| located.action.code == code)
    }
}

impl System {
    /// Find a section by its join key.
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.system_section_id == section_id)
    }

    /// Number of actions across all sections.
    pub fn action_count(&self) -> usize {
        self.sections.iter().map(|section| section.actions.len()).sum()
    }
}

impl Section {
    /// Find an action by id.
    pub fn action(&self, action_id: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|action| action.system_section_action_id == action_id)
    }
}

impl Action {
    /// The first scope entry for a scope value.
    pub fn scope(&self, scope_value_id: &str) -> Option<&Scope> {
        self.scopes
            .iter()
            .find(|scope| scope.scope_value_id == scope_value_id)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_accepts_the_legacy_section_key() {
        let section: Section = serde_json::from_value(json!({
            "sectionId": "sec-1",
            "name": "Holidays",
            "actions": null
        }))
        .unwrap();

        assert_eq!(section.system_section_id, "sec-1");
        assert!(section.actions.is_empty());
    }

    #[test]
    fn it_serializes_with_the_canonical_section_key() {
        let section = Section {
            system_section_id: "sec-1".into(),
            name: "Holidays".into(),
            actions: vec![],
        };
        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(json["systemSectionId"], "sec-1");
        assert!(json.get("sectionId").is_none());
    }

    #[test]
    fn it_tolerates_missing_collections_and_effects() {
        let tree: GrantTree = serde_json::from_value(json!({
            "systems": [{
                "systemId": "S1",
                "sections": [{
                    "systemSectionId": "sec-1",
                    "actions": [{ "systemSectionActionId": "A1", "code": "read" }]
                }]
            }]
        }))
        .unwrap();

        let located = tree.action_by_code("read").unwrap();
        assert_eq!(located.system.system_id, "S1");
        assert_eq!(located.action.effect, None);
        assert!(located.action.scopes.is_empty());
    }

    #[test]
    fn it_treats_an_empty_body_as_an_empty_tree() {
        let tree: GrantTree = serde_json::from_value(json!({})).unwrap();
        assert_eq!(tree, GrantTree::empty());
        let tree: GrantTree = serde_json::from_value(json!({ "systems": null })).unwrap();
        assert!(tree.systems.is_empty());
    }

    #[test]
    fn it_walks_actions_in_tree_order() {
        let tree: GrantTree = serde_json::from_value(json!({
            "systems": [
                { "systemId": "S1", "sections": [
                    { "systemSectionId": "a", "actions": [
                        { "systemSectionActionId": "1" },
                        { "systemSectionActionId": "2" }
                    ]}
                ]},
                { "systemId": "S2", "sections": [
                    { "systemSectionId": "b", "actions": [{ "systemSectionActionId": "3" }] }
                ]}
            ]
        }))
        .unwrap();

        let ids: Vec<&str> = tree
            .actions()
            .map(|located| located.action.system_section_action_id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(tree.system("S1").unwrap().action_count(), 2);
    }
}
