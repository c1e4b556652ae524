use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use grants_filter::FilterRequest;
use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        })
    }
}

/// Sort order of a query, sent as `sort=field,DIR`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    /// The field to sort on
    pub field: String,
    /// The direction
    pub direction: SortDirection,
}

impl Sort {
    /// Sort ascending on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Sort descending on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl Display for Sort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.field, self.direction)
    }
}

/// Parameters of one paginated query
///
/// Every field takes part in the cache key, so two requests are served from
/// the same cached page only if they are equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    /// Resource path the record store serves, e.g. `/api/users`
    pub resource: String,
    /// Zero-based page index
    pub page: u32,
    /// Records per page
    pub page_size: u32,
    /// Sort order
    pub sort: Option<Sort>,
    /// Criteria, sent as the request body
    pub filters: FilterRequest,
    /// Additional query parameters; empty values are not sent
    pub extra_params: BTreeMap<String, String>,
    /// Any change forces a fresh fetch
    pub cache_bust: Option<u64>,
}

impl QueryRequest {
    /// The first page of `resource`, ten records per page, unfiltered
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            page: 0,
            page_size: 10,
            sort: None,
            filters: FilterRequest::empty(),
            extra_params: BTreeMap::new(),
            cache_bust: None,
        }
    }

    /// Set the page index and size
    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Set the sort order
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the criteria
    pub fn with_filters(mut self, filters: FilterRequest) -> Self {
        self.filters = filters;
        self
    }

    /// Add a query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    /// Set the cache-busting key
    pub fn with_cache_bust(mut self, cache_bust: u64) -> Self {
        self.cache_bust = Some(cache_bust);
        self
    }

    /// Query parameters in wire order: `page`, `size`, `sort`, extra
    /// parameters with a value, then `_k`
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.page_size.to_string()),
        ];
        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.to_string()));
        }
        pairs.extend(
            self.extra_params
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        if let Some(cache_bust) = self.cache_bust {
            pairs.push(("_k".to_string(), cache_bust.to_string()));
        }
        pairs
    }

    /// Canonical form of every parameter
    pub(crate) fn cache_key(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One page of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    /// The records, opaque to this crate
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
    /// Number of records matching the criteria across all pages
    #[serde(default)]
    pub total_elements: u64,
    /// Number of pages at the requested size
    #[serde(default)]
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use grants_filter::{FilterCriterion, Operator};
    use pretty_assertions::assert_eq;

    #[test]
    fn it_orders_query_parameters() {
        let request = QueryRequest::new("/api/users")
            .with_page(2, 25)
            .with_sort(Sort::desc("createdAt"))
            .with_param("status", "active")
            .with_param("q", "")
            .with_cache_bust(7);

        assert_eq!(
            request.query_pairs(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("size".to_string(), "25".to_string()),
                ("sort".to_string(), "createdAt,DESC".to_string()),
                ("status".to_string(), "active".to_string()),
                ("_k".to_string(), "7".to_string()),
            ]
        );
    }

    #[test]
    fn it_keys_on_every_parameter() -> Result<(), serde_json::Error> {
        let base = QueryRequest::new("/api/users");
        let filtered = base.clone().with_filters(FilterRequest::from(vec![FilterCriterion::new(
            "name",
            Operator::Like,
            "ann",
        )]));
        let busted = base.clone().with_cache_bust(1);

        assert_eq!(base.cache_key()?, QueryRequest::new("/api/users").cache_key()?);
        assert_ne!(base.cache_key()?, filtered.cache_key()?);
        assert_ne!(base.cache_key()?, busted.cache_key()?);
        Ok(())
    }

    #[test]
    fn it_reads_the_page_envelope() -> Result<(), serde_json::Error> {
        let page: QueryPage = serde_json::from_str(
            r#"{ "content": [{ "id": 1 }], "totalElements": 41, "totalPages": 5, "number": 0 }"#,
        )?;

        assert_eq!(page.content.len(), 1);
        assert_eq!(page.total_elements, 41);
        assert_eq!(page.total_pages, 5);
        Ok(())
    }
}
