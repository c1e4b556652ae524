use crate::{FilterCriterion, FilterError, FilterRequest, ScopeRestriction};

/// Merges the three sources of criteria for one query.
///
/// The record store evaluates criteria in order, so the merged request always
/// lists fixed criteria first, then access restrictions, then the user's own
/// filters, regardless of the order in which they were added here.
#[derive(Debug, Clone, Default)]
pub struct CriteriaSet {
    fixed: Vec<FilterCriterion>,
    restrictions: Vec<ScopeRestriction>,
    user: Vec<FilterCriterion>,
}

impl CriteriaSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mandatory criterion (e.g. a parent id the page is scoped to).
    pub fn fixed(mut self, criterion: FilterCriterion) -> Self {
        self.fixed.push(criterion);
        self
    }

    /// Add an access restriction.
    pub fn restrict(mut self, restriction: ScopeRestriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Add the user's filters.
    pub fn user(mut self, request: FilterRequest) -> Self {
        self.user.extend(request.criteria);
        self
    }

    /// Produce the merged request.
    ///
    /// Fails with [`FilterError::AccessDenied`] if any restriction denies all
    /// records; an unrestricted restriction contributes nothing.
    pub fn into_request(self) -> Result<FilterRequest, FilterError> {
        let mut criteria = self.fixed;
        for restriction in self.restrictions {
            match restriction {
                ScopeRestriction::Unrestricted => {}
                ScopeRestriction::Restricted(criterion) => criteria.push(criterion),
                ScopeRestriction::Denied { field } => {
                    tracing::debug!(%field, "access restriction denies all records");
                    return Err(FilterError::AccessDenied { field });
                }
            }
        }
        criteria.extend(self.user);
        Ok(FilterRequest { criteria })
    }
}
