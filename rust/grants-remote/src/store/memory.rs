//! In-memory record store for testing

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grants_filter::{FilterCriterion, Operator};
use parking_lot::Mutex;
use serde_json::Value;

use super::RecordStore;
use crate::{QueryError, QueryPage, QueryRequest, SortDirection};

#[derive(Debug, Default)]
struct MemoryRecordState {
    resources: HashMap<String, Vec<Value>>,
    requests: usize,
    latency: Option<Duration>,
}

/// An in-memory record store.
///
/// Evaluates criteria against JSON records the way the remote store does:
/// criteria are combined conjunctively, fields may be dotted paths, and
/// operands are compared numerically when both sides are numbers (or numeric
/// strings) and as text otherwise. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordStore {
    state: Arc<Mutex<MemoryRecordState>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records to a resource
    pub fn insert<I>(&self, resource: impl Into<String>, records: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.state
            .lock()
            .resources
            .entry(resource.into())
            .or_default()
            .extend(records);
    }

    /// Delay every response
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = Some(latency);
        self
    }

    /// Number of queries received
    pub fn requests(&self) -> usize {
        self.state.lock().requests
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn filter(&self, request: &QueryRequest) -> Result<QueryPage, QueryError> {
        let latency = {
            let mut state = self.state.lock();
            state.requests += 1;
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut matched: Vec<Value> = {
            let state = self.state.lock();
            let records = state.resources.get(&request.resource).ok_or_else(|| {
                QueryError::FetchFailed {
                    resource: request.resource.clone(),
                    reason: "HTTP 404 - Not Found".to_string(),
                }
            })?;
            records
                .iter()
                .filter(|record| {
                    request
                        .filters
                        .criteria
                        .iter()
                        .all(|criterion| matches(record, criterion))
                })
                .cloned()
                .collect()
        };

        if let Some(sort) = &request.sort {
            matched.sort_by(|a, b| {
                let ordering = match (lookup(a, &sort.field), lookup(b, &sort.field)) {
                    (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                };
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let total_elements = matched.len() as u64;
        let size = request.page_size as usize;
        let total_pages = if size == 0 {
            0
        } else {
            matched.len().div_ceil(size) as u32
        };
        let content = matched
            .into_iter()
            .skip(request.page as usize * size)
            .take(size)
            .collect();

        Ok(QueryPage {
            content,
            total_elements,
            total_pages,
        })
    }
}

fn lookup<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    let pointer = format!("/{}", field.replace('.', "/"));
    record.pointer(&pointer).filter(|value| !value.is_null())
}

fn text(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (number(a), number(b)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(text(a).cmp(&text(b))),
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}

fn any_equals(field: &Value, values: &Value) -> bool {
    match values {
        Value::Array(values) => values.iter().any(|value| equals(field, value)),
        value => equals(field, value),
    }
}

fn matches(record: &Value, criterion: &FilterCriterion) -> bool {
    let Some(field) = lookup(record, &criterion.field) else {
        return matches!(
            criterion.operator,
            Operator::IsNull | Operator::NotEqual | Operator::NotIn
        );
    };

    let operand = &criterion.value;
    let ordering = || compare(field, operand);

    match criterion.operator {
        Operator::IsNull => false,
        Operator::IsNotNull => true,
        Operator::Equal => equals(field, operand),
        Operator::NotEqual => !equals(field, operand),
        Operator::In => any_equals(field, operand),
        Operator::NotIn => !any_equals(field, operand),
        Operator::Like => text(field)
            .to_lowercase()
            .contains(&text(operand).to_lowercase()),
        Operator::StartsWith => text(field)
            .to_lowercase()
            .starts_with(&text(operand).to_lowercase()),
        Operator::EndsWith => text(field)
            .to_lowercase()
            .ends_with(&text(operand).to_lowercase()),
        Operator::Gt | Operator::After => ordering() == Some(Ordering::Greater),
        Operator::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt | Operator::Before => ordering() == Some(Ordering::Less),
        Operator::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        Operator::Between => {
            let above = matches!(ordering(), Some(Ordering::Greater | Ordering::Equal));
            let below = criterion.value2.as_ref().is_some_and(|high| {
                matches!(compare(field, high), Some(Ordering::Less | Ordering::Equal))
            });
            above && below
        }
    }
}
