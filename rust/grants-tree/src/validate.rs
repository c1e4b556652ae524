use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::GrantTree;

/// Reasons a grant tree is refused at ingestion.
///
/// Lookups by id assume identifiers are present and unique across the whole
/// tree; a tree that breaks this is rejected instead of being resolved with
/// "first match wins".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A system has an empty `systemId`.
    #[error("system at index {index} has an empty id")]
    EmptySystemId {
        /// Position of the system in the tree.
        index: usize,
    },

    /// A section has an empty `systemSectionId`.
    #[error("section at index {index} of system '{system_id}' has an empty id")]
    EmptySectionId {
        /// The owning system.
        system_id: String,
        /// Position of the section in its system.
        index: usize,
    },

    /// An action has an empty `systemSectionActionId`.
    #[error("action at index {index} of section '{section_id}' has an empty id")]
    EmptyActionId {
        /// The owning section.
        section_id: String,
        /// Position of the action in its section.
        index: usize,
    },

    /// Two systems share an id.
    #[error("system '{system_id}' appears more than once")]
    DuplicateSystem {
        /// The repeated id.
        system_id: String,
    },

    /// Two sections share an id.
    #[error("section '{section_id}' appears more than once")]
    DuplicateSection {
        /// The repeated id.
        section_id: String,
    },

    /// Two actions share an id.
    #[error("action '{action_id}' appears more than once")]
    DuplicateAction {
        /// The repeated id.
        action_id: String,
    },
}

impl GrantTree {
    /// Check the structural invariants lookups rely on.
    ///
    /// System, section and action ids must be non-empty and unique across the
    /// tree. Action codes may legitimately repeat across systems (every system
    /// has a `create`), so repeats are only logged; use
    /// [`crate::GrantResolver::can_perform_action_in`] to disambiguate them.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut systems = HashSet::new();
        let mut sections = HashSet::new();
        let mut actions = HashSet::new();
        let mut codes: HashMap<&str, &str> = HashMap::new();

        for (index, system) in self.systems.iter().enumerate() {
            if system.system_id.is_empty() {
                return Err(TreeError::EmptySystemId { index });
            }
            if !systems.insert(system.system_id.as_str()) {
                return Err(TreeError::DuplicateSystem {
                    system_id: system.system_id.clone(),
                });
            }

            for (index, section) in system.sections.iter().enumerate() {
                if section.system_section_id.is_empty() {
                    return Err(TreeError::EmptySectionId {
                        system_id: system.system_id.clone(),
                        index,
                    });
                }
                if !sections.insert(section.system_section_id.as_str()) {
                    return Err(TreeError::DuplicateSection {
                        section_id: section.system_section_id.clone(),
                    });
                }

                for (index, action) in section.actions.iter().enumerate() {
                    if action.system_section_action_id.is_empty() {
                        return Err(TreeError::EmptyActionId {
                            section_id: section.system_section_id.clone(),
                            index,
                        });
                    }
                    if !actions.insert(action.system_section_action_id.as_str()) {
                        return Err(TreeError::DuplicateAction {
                            action_id: action.system_section_action_id.clone(),
                        });
                    }
                    if action.code.is_empty() {
                        continue;
                    }
                    if let Some(first) = codes.insert(&action.code, &system.system_id) {
                        tracing::warn!(
                            code = %action.code,
                            first_system = %first,
                            system = %system.system_id,
                            "action code appears in more than one place; unscoped code lookups use the first"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> GrantTree {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn it_accepts_a_well_formed_tree() {
        let tree = tree(json!({ "systems": [
            { "systemId": "S1", "sections": [
                { "systemSectionId": "a", "actions": [
                    { "systemSectionActionId": "1", "code": "create" }
                ]}
            ]},
            { "systemId": "S2", "sections": [
                { "systemSectionId": "b", "actions": [
                    { "systemSectionActionId": "2", "code": "create" }
                ]}
            ]}
        ]}));

        assert_eq!(tree.validate(), Ok(()));
    }

    #[test]
    fn it_rejects_duplicate_action_ids_across_systems() {
        let tree = tree(json!({ "systems": [
            { "systemId": "S1", "sections": [
                { "systemSectionId": "a", "actions": [{ "systemSectionActionId": "1" }] }
            ]},
            { "systemId": "S2", "sections": [
                { "systemSectionId": "b", "actions": [{ "systemSectionActionId": "1" }] }
            ]}
        ]}));

        assert_eq!(
            tree.validate(),
            Err(TreeError::DuplicateAction {
                action_id: "1".into()
            })
        );
    }

    #[test]
    fn it_rejects_duplicate_sections_and_systems() {
        let sections = tree(json!({ "systems": [
            { "systemId": "S1", "sections": [{ "systemSectionId": "a" }, { "sectionId": "a" }] }
        ]}));
        assert!(matches!(
            sections.validate(),
            Err(TreeError::DuplicateSection { .. })
        ));

        let systems = tree(json!({ "systems": [{ "systemId": "S1" }, { "systemId": "S1" }] }));
        assert!(matches!(
            systems.validate(),
            Err(TreeError::DuplicateSystem { .. })
        ));
    }

    #[test]
    fn it_rejects_empty_identifiers() {
        let tree = tree(json!({ "systems": [
            { "systemId": "S1", "sections": [
                { "systemSectionId": "a", "actions": [{ "systemSectionActionId": "" }] }
            ]}
        ]}));

        assert_eq!(
            tree.validate(),
            Err(TreeError::EmptyActionId {
                section_id: "a".into(),
                index: 0
            })
        );
    }
}
