#![warn(missing_docs)]

//! Grant trees and the rules for reading them.
//!
//! A caller's grants arrive as a tree:
//!
//! ```text
//! GrantTree
//!   └── System ("Appointments")
//!         └── Section ("Schedule Management", systemSectionId)
//!               └── Action ("create", systemSectionActionId, effect?)
//!                     └── Scope (scopeValueId, effect?, tableName)
//! ```
//!
//! Both actions and scopes carry an optional [`Effect`]. Every question asked
//! of the tree goes through one evaluator, [`Resolution::of`], which applies a
//! single precedence order:
//!
//! 1. an action-level `ALLOW` grants access unconditionally, whatever its
//!    scopes say;
//! 2. an action-level `DENY` or `NONE` refuses access, whatever its scopes say;
//! 3. an action without an effect grants access through its `ALLOW` scopes,
//!    if it has any.
//!
//! [`GrantResolver`] answers point queries (systems, sections, actions,
//! scopes) and [`ScopeExtractor`] turns scope grants into row-level query
//! restrictions.
//! Every entry point is fail-closed: anything that cannot be found is denied.
//!
//! ```rust
//! use std::sync::Arc;
//! use grants_tree::{GrantResolver, GrantTree};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tree: GrantTree = serde_json::from_str(r#"{
//!   "systems": [{
//!     "systemId": "S1", "name": "Appointments",
//!     "sections": [{
//!       "systemSectionId": "sec-1", "name": "Schedules",
//!       "actions": [{
//!         "systemSectionActionId": "A1", "code": "create", "name": "Create",
//!         "scopes": [{ "scopeValueId": "branch-9", "effect": "ALLOW" }]
//!       }]
//!     }]
//!   }]
//! }"#)?;
//! tree.validate()?;
//!
//! let resolver = GrantResolver::new(Arc::new(tree));
//! assert!(resolver.can_perform_action("create", None));
//! assert!(resolver.can_perform_action("create", Some("branch-9")));
//! assert!(!resolver.can_perform_action("create", Some("branch-1")));
//! # Ok(())
//! # }
//! ```

mod effect;
pub use effect::*;

mod tree;
pub use tree::*;

mod validate;
pub use validate::*;

mod resolution;
pub use resolution::*;

mod resolver;
pub use resolver::*;

mod section;
pub use section::*;

mod scope;
pub use scope::*;
