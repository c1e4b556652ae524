use crate::{Action, Effect, Scope};

/// What an action grants, after applying the precedence rules.
///
/// This is the only place effect precedence is decided; every check in this
/// crate is phrased in terms of it.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// Action-level `ALLOW`: granted everywhere, scopes are irrelevant.
    Unconditional,
    /// Action-level `DENY` or `NONE`: refused, scopes are never consulted.
    Denied(Effect),
    /// No action-level effect: granted wherever an `ALLOW` scope says so.
    Scoped {
        /// Scopes with an explicit `ALLOW`.
        allowed: Vec<&'a Scope>,
        /// Scopes with an explicit `DENY`.
        denied: Vec<&'a Scope>,
    },
}

impl<'a> Resolution<'a> {
    /// Resolve an action.
    pub fn of(action: &'a Action) -> Self {
        match action.effect {
            Some(Effect::Allow) => Resolution::Unconditional,
            Some(effect) => Resolution::Denied(effect),
            None => Resolution::Scoped {
                allowed: action.scopes.iter().filter(|scope| scope.is_allowed()).collect(),
                denied: action.scopes.iter().filter(|scope| scope.is_denied()).collect(),
            },
        }
    }

    /// True if the action can be performed somewhere.
    pub fn has_access(&self) -> bool {
        match self {
            Resolution::Unconditional => true,
            Resolution::Denied(_) => false,
            Resolution::Scoped { allowed, .. } => !allowed.is_empty(),
        }
    }

    /// True for [`Resolution::Unconditional`].
    pub fn is_unconditional(&self) -> bool {
        matches!(self, Resolution::Unconditional)
    }

    /// The effective outcome: `ALLOW` when access exists, otherwise the
    /// explicit action effect, or `NONE` for scoped actions with no allowed
    /// scope.
    pub fn effect(&self) -> Effect {
        match self {
            Resolution::Denied(effect) => *effect,
            resolution if resolution.has_access() => Effect::Allow,
            _ => Effect::None,
        }
    }

    /// True if the action may be performed on one specific scope value.
    pub fn allows_scope(&self, scope_value_id: &str) -> bool {
        match self {
            Resolution::Unconditional => true,
            Resolution::Denied(_) => false,
            Resolution::Scoped { allowed, .. } => allowed
                .iter()
                .any(|scope| scope.scope_value_id == scope_value_id),
        }
    }
}
