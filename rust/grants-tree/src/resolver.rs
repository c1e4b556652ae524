use std::sync::Arc;

use serde::Serialize;

use crate::{Action, Effect, GrantTree, Located, Resolution, Scope, ScopeExtractor};

/// Answers access questions against one snapshot of a [`GrantTree`].
///
/// A resolver never mutates its tree. When a newer tree is fetched, build a new
/// resolver; existing ones keep answering from the snapshot they were given.
#[derive(Debug, Clone)]
pub struct GrantResolver {
    tree: Arc<GrantTree>,
}

/// Result of [`GrantResolver::has_action_access`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionAccess {
    /// Whether the action may be performed at all.
    pub has_access: bool,
    /// The effective outcome.
    pub effect: Effect,
    /// Every scope of the action. Empty unless access is decided by scopes.
    pub scopes: Vec<Scope>,
    /// Scopes with an explicit `ALLOW`.
    pub allowed_scopes: Vec<Scope>,
    /// Scopes with an explicit `DENY`.
    pub denied_scopes: Vec<Scope>,
}

impl ActionAccess {
    fn none() -> Self {
        Self {
            has_access: false,
            effect: Effect::None,
            scopes: vec![],
            allowed_scopes: vec![],
            denied_scopes: vec![],
        }
    }
}

/// Result of [`GrantResolver::has_scope_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeAccess {
    /// Whether the action may be performed on the scope value.
    pub has_access: bool,
    /// The effect that decided it.
    pub effect: Effect,
}

/// Per-system rollup returned by [`GrantResolver::accessible_systems`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSummary {
    /// The system's id.
    pub system_id: String,
    /// The system's display name.
    pub system_name: String,
    /// Number of sections in the system.
    pub total_sections: usize,
    /// Number of actions across all sections.
    pub total_actions: usize,
    /// Number of actions that resolve to access.
    pub allowed_actions: usize,
    /// Every action is allowed.
    pub has_full_access: bool,
    /// Some, but not all, actions are allowed.
    pub has_partial_access: bool,
    /// No action is allowed.
    pub has_no_access: bool,
}

/// How an action resolved, flattened for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionKind {
    /// See [`Resolution::Unconditional`].
    Unconditional,
    /// See [`Resolution::Denied`].
    Denied,
    /// See [`Resolution::Scoped`].
    Scoped,
}

impl From<&Resolution<'_>> for ResolutionKind {
    fn from(resolution: &Resolution<'_>) -> Self {
        match resolution {
            Resolution::Unconditional => ResolutionKind::Unconditional,
            Resolution::Denied(_) => ResolutionKind::Denied,
            Resolution::Scoped { .. } => ResolutionKind::Scoped,
        }
    }
}

/// Everything known about one action, for display and debugging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ActionDetail {
    pub system_id: String,
    pub system_name: String,
    pub section_id: String,
    pub section_name: String,
    pub action_id: String,
    pub action_name: String,
    pub action_code: String,
    /// The action-level effect as stored, `None` when unset.
    pub effect: Option<Effect>,
    pub scopes: Vec<Scope>,
    pub has_scopes: bool,
    pub allowed_scopes: Vec<Scope>,
    pub denied_scopes: Vec<Scope>,
    /// How the action resolved.
    pub resolution: ResolutionKind,
    /// Whether the action may be performed somewhere.
    pub has_access: bool,
}

impl GrantResolver {
    /// Resolve against the given tree.
    pub fn new(tree: Arc<GrantTree>) -> Self {
        Self { tree }
    }

    /// A resolver that denies everything. Use it when no tree could be
    /// obtained.
    pub fn deny_all() -> Self {
        Self::new(Arc::new(GrantTree::empty()))
    }

    /// The tree this resolver answers from.
    pub fn tree(&self) -> &Arc<GrantTree> {
        &self.tree
    }

    /// Scope extraction over the same tree.
    pub fn scopes(&self) -> ScopeExtractor<'_> {
        ScopeExtractor::new(&self.tree)
    }

    /// True if the tree has an entry for the system, whatever it grants.
    ///
    /// Use [`GrantResolver::has_usable_system_access`] to ask whether anything
    /// in the system can actually be done.
    pub fn has_system_access(&self, system_id: &str) -> bool {
        self.tree.system(system_id).is_some()
    }

    /// True if at least one action of the system resolves to access.
    pub fn has_usable_system_access(&self, system_id: &str) -> bool {
        self.tree.system(system_id).is_some_and(|system| {
            system
                .sections
                .iter()
                .flat_map(|section| section.actions.iter())
                .any(|action| Resolution::of(action).has_access())
        })
    }

    /// Whether an action, located by its full path, may be performed.
    pub fn has_action_access(
        &self,
        system_id: &str,
        section_id: &str,
        action_id: &str,
    ) -> ActionAccess {
        let Some(action) = self
            .tree
            .system(system_id)
            .and_then(|system| system.section(section_id))
            .and_then(|section| section.action(action_id))
        else {
            return ActionAccess::none();
        };

        match Resolution::of(action) {
            Resolution::Unconditional => ActionAccess {
                has_access: true,
                effect: Effect::Allow,
                ..ActionAccess::none()
            },
            Resolution::Denied(effect) => ActionAccess {
                effect,
                ..ActionAccess::none()
            },
            resolution @ Resolution::Scoped { .. } => {
                let (allowed_scopes, denied_scopes) = partition(&resolution);
                ActionAccess {
                    has_access: resolution.has_access(),
                    effect: resolution.effect(),
                    scopes: action.scopes.clone(),
                    allowed_scopes,
                    denied_scopes,
                }
            }
        }
    }

    /// Whether an action may be performed on one scope value.
    pub fn has_scope_access(&self, action_id: &str, scope_value_id: &str) -> ScopeAccess {
        let Some(Located { action, .. }) = self.tree.action_by_id(action_id) else {
            return ScopeAccess {
                has_access: false,
                effect: Effect::None,
            };
        };

        match Resolution::of(action) {
            Resolution::Unconditional => ScopeAccess {
                has_access: true,
                effect: Effect::Allow,
            },
            Resolution::Denied(effect) => ScopeAccess {
                has_access: false,
                effect,
            },
            Resolution::Scoped { .. } => {
                let effect = action
                    .scope(scope_value_id)
                    .and_then(|scope| scope.effect)
                    .unwrap_or(Effect::None);
                ScopeAccess {
                    has_access: effect == Effect::Allow && !scope_value_id.is_empty(),
                    effect,
                }
            }
        }
    }

    /// Whether the first action with `code` may be performed, optionally on
    /// one scope value.
    ///
    /// Codes are not unique across systems; when they recur, prefer
    /// [`GrantResolver::can_perform_action_in`].
    pub fn can_perform_action(&self, code: &str, scope_value_id: Option<&str>) -> bool {
        self.tree
            .action_by_code(code)
            .is_some_and(|located| can_perform(located.action, scope_value_id))
    }

    /// Like [`GrantResolver::can_perform_action`], with the code lookup
    /// confined to one system.
    pub fn can_perform_action_in(
        &self,
        system_id: &str,
        code: &str,
        scope_value_id: Option<&str>,
    ) -> bool {
        self.tree
            .system(system_id)
            .and_then(|system| {
                system
                    .sections
                    .iter()
                    .flat_map(|section| section.actions.iter())
                    .find(|action| action.code == code)
            })
            .is_some_and(|action| can_perform(action, scope_value_id))
    }

    /// One summary per system that has at least one allowed action.
    pub fn accessible_systems(&self) -> Vec<SystemSummary> {
        self.tree
            .systems
            .iter()
            .filter_map(|system| {
                let total_actions = system.action_count();
                let allowed_actions = system
                    .sections
                    .iter()
                    .flat_map(|section| section.actions.iter())
                    .filter(|action| Resolution::of(action).has_access())
                    .count();

                if allowed_actions == 0 {
                    return None;
                }

                Some(SystemSummary {
                    system_id: system.system_id.clone(),
                    system_name: system.name.clone(),
                    total_sections: system.sections.len(),
                    total_actions,
                    allowed_actions,
                    has_full_access: allowed_actions == total_actions,
                    has_partial_access: allowed_actions < total_actions,
                    has_no_access: false,
                })
            })
            .collect()
    }

    /// Full context for the first action with the given id.
    pub fn action_details(&self, action_id: &str) -> Option<ActionDetail> {
        let Located {
            system,
            section,
            action,
        } = self.tree.action_by_id(action_id)?;
        let resolution = Resolution::of(action);
        let (allowed_scopes, denied_scopes) = partition(&resolution);

        Some(ActionDetail {
            system_id: system.system_id.clone(),
            system_name: system.name.clone(),
            section_id: section.system_section_id.clone(),
            section_name: section.name.clone(),
            action_id: action.system_section_action_id.clone(),
            action_name: action.name.clone(),
            action_code: action.code.clone(),
            effect: action.effect,
            scopes: action.scopes.clone(),
            has_scopes: !action.scopes.is_empty(),
            allowed_scopes,
            denied_scopes,
            resolution: ResolutionKind::from(&resolution),
            has_access: resolution.has_access(),
        })
    }
}

pub(crate) fn can_perform(action: &Action, scope_value_id: Option<&str>) -> bool {
    let resolution = Resolution::of(action);
    match scope_value_id {
        Some(scope_value_id) => resolution.allows_scope(scope_value_id),
        None => resolution.has_access(),
    }
}

fn partition(resolution: &Resolution<'_>) -> (Vec<Scope>, Vec<Scope>) {
    match resolution {
        Resolution::Scoped { allowed, denied } => (
            allowed.iter().map(|scope| (*scope).clone()).collect(),
            denied.iter().map(|scope| (*scope).clone()).collect(),
        ),
        _ => (vec![], vec![]),
    }
}
