use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The outcome attached to an action or a scope.
///
/// Grants model "unset" as `Option<Effect>::None`, which is different from an
/// explicit [`Effect::None`]: an unset action defers to its scopes, an explicit
/// `NONE` action does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    /// Access is granted.
    Allow,
    /// Access is explicitly refused.
    Deny,
    /// Access is explicitly not granted.
    None,
}

impl Effect {
    /// True for [`Effect::Allow`].
    pub fn is_allow(&self) -> bool {
        matches!(self, Effect::Allow)
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Effect::Allow => "ALLOW",
            Effect::Deny => "DENY",
            Effect::None => "NONE",
        })
    }
}
