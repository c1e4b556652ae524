use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use grants_filter::{
    CriteriaSet, DataType, FieldMeta, FieldType, FilterCriteriaBuilder, FilterRequest, Operator,
};
use grants_remote::{
    AuthMethod, GrantCachePolicy, GrantTreeCache, MemoryRecordStore, QueryCachePolicy,
    QueryExecutor, QueryRequest, RecordStore, RemoteConfig, RestGrantSource, RestRecordStore, Sort,
};
use grants_tree::{EmptyScopes, GrantResolver};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

const TAG: &str = "\"grants-1\"";

#[derive(Clone)]
struct Backend {
    grants: Value,
    permission_requests: Arc<AtomicUsize>,
    records: MemoryRecordStore,
    filter_bodies: Arc<Mutex<Vec<Value>>>,
}

async fn permissions(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.permission_requests.fetch_add(1, Ordering::SeqCst);

    if headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) == Some(TAG) {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    (StatusCode::OK, [(header::ETAG, TAG)], Json(backend.grants.clone())).into_response()
}

async fn filter(
    State(backend): State<Backend>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    backend.filter_bodies.lock().push(body.clone());
    let Ok(filters) = serde_json::from_value::<FilterRequest>(body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let page = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(0);
    let size = params.get("size").and_then(|v| v.parse().ok()).unwrap_or(10);
    let mut request = QueryRequest::new(format!("/api/{}", resource))
        .with_page(page, size)
        .with_filters(filters);
    if let Some((field, direction)) = params.get("sort").and_then(|sort| sort.split_once(',')) {
        request = request.with_sort(match direction {
            "DESC" => Sort::desc(field),
            _ => Sort::asc(field),
        });
    }

    match backend.records.filter(&request).await {
        Ok(page) => Json(page).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_backend(backend: Backend) -> Result<String> {
    let app = Router::new()
        .route("/auth/me/permissions", get(permissions))
        .route("/api/{resource}/filter", post(filter))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}", addr))
}

fn backend() -> Backend {
    let records = MemoryRecordStore::new();
    records.insert(
        "/api/appointments",
        [
            json!({ "id": 1, "branchId": "branch-9", "patient": "Ann", "duration": 30 }),
            json!({ "id": 2, "branchId": "branch-1", "patient": "Bob", "duration": 45 }),
            json!({ "id": 3, "branchId": "branch-9", "patient": "Cid", "duration": 90 }),
            json!({ "id": 4, "branchId": "branch-9", "patient": "Dee", "duration": 15 }),
        ],
    );

    Backend {
        grants: json!({ "systems": [{
            "systemId": "S1", "name": "Appointments",
            "sections": [{
                "systemSectionId": "schedule", "name": "Schedule Management",
                "actions": [
                    { "systemSectionActionId": "A1", "code": "create", "name": "Create",
                      "scopes": [{ "scopeValueId": "branch-9", "effect": "ALLOW",
                                   "tableName": "Organization Branch" }] },
                    { "systemSectionActionId": "A2", "code": "delete", "name": "Delete",
                      "effect": "DENY" }
                ]
            }]
        }]}),
        permission_requests: Arc::new(AtomicUsize::new(0)),
        records,
        filter_bodies: Arc::default(),
    }
}

fn config(endpoint: &str) -> RemoteConfig {
    RemoteConfig::new(endpoint).with_auth(AuthMethod::Bearer("token".to_string()))
}

#[tokio::test]
async fn it_restricts_a_paginated_query_to_granted_branches() -> Result<()> {
    let backend = backend();
    let endpoint = start_backend(backend.clone()).await?;

    let grants = GrantTreeCache::new(
        RestGrantSource::new(config(&endpoint)),
        GrantCachePolicy::default(),
    );
    let resolver = GrantResolver::new(grants.fetch(false).await?);
    assert!(resolver.can_perform_action("create", Some("branch-9")));
    assert!(!resolver.can_perform_action("create", Some("branch-1")));
    assert!(!resolver.can_perform_action("delete", None));

    let mut builder = FilterCriteriaBuilder::new(vec![
        FieldMeta::new("patient", FieldType::String),
        FieldMeta::new("duration", FieldType::Number),
    ]);
    let row = builder.add_row()?;
    builder.set_field(row, "duration")?;
    builder.set_operator(row, Operator::Between)?;
    builder.set_value(row, 20)?;
    builder.set_value2(row, 60)?;

    let restriction = resolver.scopes().restriction_for(
        "schedule",
        "branchId",
        DataType::Uuid,
        EmptyScopes::Deny,
    );
    let filters = CriteriaSet::new()
        .restrict(restriction)
        .user(builder.build())
        .into_request()?;

    let executor = QueryExecutor::new(
        RestRecordStore::new(config(&endpoint)),
        QueryCachePolicy::default(),
    )?;
    let page = executor
        .query(
            QueryRequest::new("/api/appointments")
                .with_page(0, 10)
                .with_sort(Sort::desc("duration"))
                .with_filters(filters),
        )
        .await?;

    let ids: Vec<i64> = page.content.iter().filter_map(|r| r["id"].as_i64()).collect();
    assert_eq!(ids, vec![1]);
    assert_eq!(page.total_elements, 1);

    let bodies = backend.filter_bodies.lock().clone();
    assert_eq!(
        bodies,
        vec![json!({ "criteria": [
            { "field": "branchId", "operator": "IN", "value": ["branch-9"], "dataType": "UUID" },
            { "field": "duration", "operator": "BETWEEN", "value": 20, "value2": 60 }
        ]})]
    );
    Ok(())
}

#[tokio::test]
async fn it_revalidates_grants_with_the_entity_tag() -> Result<()> {
    let backend = backend();
    let endpoint = start_backend(backend.clone()).await?;

    let grants = GrantTreeCache::new(
        RestGrantSource::new(config(&endpoint)),
        GrantCachePolicy::default().with_stale_after(std::time::Duration::ZERO),
    );

    let first = grants.fetch(false).await?;
    let second = grants.fetch(false).await?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(backend.permission_requests.load(Ordering::SeqCst), 2);
    Ok(())
}
