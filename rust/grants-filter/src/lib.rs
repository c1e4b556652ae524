#![warn(missing_docs)]

//! Backend-agnostic filter criteria for paginated record queries.
//!
//! A record store answers `POST {resource}/filter` with a page of rows that
//! satisfy a list of [`FilterCriterion`] clauses. This crate provides the
//! pieces that produce that list:
//!
//! - [`Operator`], [`FieldType`] and [`DataType`] describe what a clause can
//!   say about a field, and [`FieldMeta`] describes one filterable field.
//! - [`FilterCriteriaBuilder`] is the row editor behind a filter bar. It keeps
//!   an ordered list of [`FilterRow`]s and turns them into a [`FilterRequest`].
//! - [`ScopeRestriction`] is the access-restriction clause derived from a
//!   caller's grants. It is an explicit tagged value so "no restriction" and
//!   "deny everything" can never be confused.
//! - [`CriteriaSet`] merges fixed, restriction and user criteria in the order
//!   the record store expects.
//!
//! ```rust
//! use grants_filter::{
//!     CriteriaSet, DataType, FieldMeta, FieldType, FilterCriteriaBuilder, Operator,
//!     ScopeRestriction,
//! };
//! use serde_json::json;
//!
//! # fn main() -> Result<(), grants_filter::FilterError> {
//! let mut builder = FilterCriteriaBuilder::new(vec![
//!     FieldMeta::new("name", FieldType::String),
//!     FieldMeta::new("age", FieldType::Number),
//! ]);
//!
//! let row = builder.add_row()?;
//! builder.set_field(row, "age")?;
//! builder.set_operator(row, Operator::Between)?;
//! builder.set_value(row, json!(18))?;
//! builder.set_value2(row, json!(65))?;
//!
//! let restriction =
//!     ScopeRestriction::from_values(["branch-9"], "organizationBranchId", DataType::Uuid);
//!
//! let request = CriteriaSet::new()
//!     .restrict(restriction)
//!     .user(builder.build())
//!     .into_request()?;
//!
//! assert_eq!(request.criteria.len(), 2);
//! assert_eq!(request.criteria[0].operator, Operator::In);
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::*;

mod operator;
pub use operator::*;

mod data_type;
pub use data_type::*;

mod criterion;
pub use criterion::*;

mod field;
pub use field::*;

mod row;
pub use row::*;

mod builder;
pub use builder::*;

mod restriction;
pub use restriction::*;

mod compose;
pub use compose::*;
