//! REST record store against a mock HTTP server.

use std::sync::Arc;

use crmcheck_client::{RestClientConfig, RestRecordStore};
use crmcheck_core::{CacheSettings, CrmError, FieldProjection, RecordFilter, StoreError};
use crmcheck_storage::{CachedRecordClient, InMemoryKeyValueStore, RecordStore, SchemaCache};
use crmcheck_test_utils::{assertions, fixtures, init_test_tracing};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "/services/data/v59.0";

async fn setup() -> (MockServer, RestRecordStore) {
    init_test_tracing();
    let server = MockServer::start().await;
    let store = RestRecordStore::new(RestClientConfig::new(server.uri(), "test-token")).unwrap();
    (server, store)
}

async fn mount_describe(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/sobjects/{name}/describe")))
        .respond_with(ResponseTemplate::new(200).set_body_json(describe_body(name)))
        .expect(1)
        .mount(server)
        .await;
}

fn describe_body(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "fields": [
            {"name": "Id", "custom": false},
            {"name": "Email", "custom": false},
            {"name": "Score__c", "custom": true}
        ]
    })
}

#[tokio::test]
async fn test_find_sends_query_and_strips_attributes() {
    let (server, store) = setup().await;
    mount_describe(&server, "Lead").await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/query")))
        .and(header("Authorization", "Bearer test-token"))
        .and(query_param(
            "q",
            "SELECT Id,Email,Score__c FROM Lead WHERE Email = 'a@example.com'",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{"attributes": {"type": "Lead"}, "Id": "00Q000000000001", "Email": "a@example.com"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = store
        .find_one("Lead", &RecordFilter::by("Email", "a@example.com"), &FieldProjection::All)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.get("Id"), Some(&json!("00Q000000000001")));
    assert!(!found.contains_key("attributes"));
}

#[tokio::test]
async fn test_find_follows_continuation_pages() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 2,
            "done": false,
            "nextRecordsUrl": format!("{BASE}/query/01g-2000"),
            "records": [{"Id": "a"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/query/01g-2000")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 2,
            "done": true,
            "records": [{"Id": "b"}]
        })))
        .mount(&server)
        .await;

    let rows = store
        .find(
            "Case",
            &RecordFilter::new(),
            &FieldProjection::Only(vec!["Id".to_string()]),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_unrestricted_find_returns_every_page_past_two_hundred() {
    let (server, store) = setup().await;
    mount_describe(&server, "Lead").await;
    let rows = |from: usize, to: usize| -> Vec<serde_json::Value> {
        (from..to)
            .map(|i| json!({"attributes": {"type": "Lead"}, "Id": format!("00Q{:012}", i)}))
            .collect()
    };
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/query")))
        .and(query_param("q", "SELECT Id,Email,Score__c FROM Lead"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 250,
            "done": false,
            "nextRecordsUrl": format!("{BASE}/query/01g-200"),
            "records": rows(0, 200)
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/query/01g-200")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 250,
            "done": true,
            "records": rows(200, 250)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = store
        .find("Lead", &RecordFilter::new(), &FieldProjection::All)
        .await
        .unwrap();
    assert_eq!(found.len(), 250);
    assert_eq!(found[249]["Id"], json!("00Q000000000249"));

    // the schema is described once and reused for the next query text
    assert!(store.schema_cache().cached("Lead").await.is_some());
}

#[tokio::test]
async fn test_describe_partitions_fields() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/sobjects/Lead/describe")))
        .respond_with(ResponseTemplate::new(200).set_body_json(describe_body("Lead")))
        .mount(&server)
        .await;

    let schema = store.describe("Lead").await.unwrap();
    assert_eq!(schema.object_type, "Lead");
    assert_eq!(schema.standard_fields().collect::<Vec<_>>(), vec!["Id", "Email"]);
    assert_eq!(schema.custom_fields().collect::<Vec<_>>(), vec!["Score__c"]);
}

#[tokio::test]
async fn test_error_status_maps_to_request_failed() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/sobjects/Nope__c/describe")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!([
            {"errorCode": "NOT_FOUND", "message": "The requested resource does not exist"}
        ])))
        .mount(&server)
        .await;

    match store.describe("Nope__c").await {
        Err(CrmError::Store(StoreError::RequestFailed { status, message, operation, .. })) => {
            assert_eq!(status, 404);
            assert_eq!(operation, "describe");
            assert_eq!(message, "NOT_FOUND: The requested resource does not exist");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, store) = setup().await;
    mount_describe(&server, "Lead").await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = store
        .find("Lead", &RecordFilter::new(), &FieldProjection::All)
        .await;
    assert!(matches!(
        result,
        Err(CrmError::Store(StoreError::InvalidResponse { .. }))
    ));
}

#[tokio::test]
async fn test_mutations() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/sobjects/Contact")))
        .and(body_json(json!({"Email": "c@example.com", "Name": "Test Contact"})))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "003000000000001", "success": true, "errors": []})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{BASE}/sobjects/Contact/003000000000001")))
        .and(body_json(json!({"Name": "Renamed"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{BASE}/sobjects/Contact/003000000000001")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let created = store
        .create("Contact", fixtures::contact("c@example.com"))
        .await
        .unwrap();
    let id = created.id.unwrap();

    let update = fixtures::record(json!({"Id": id, "Name": "Renamed"}));
    assert!(store.update("Contact", update).await.unwrap().success);
    assert!(store.delete("Contact", &id).await.unwrap().success);

    let missing_id = store.update("Contact", fixtures::record(json!({"Name": "x"}))).await;
    assertions::assert_store_error(&missing_id);
}

#[tokio::test]
async fn test_bulk_create_uses_composite_endpoint() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/composite/sobjects")))
        .and(body_json(json!({
            "allOrNone": false,
            "records": [
                {"attributes": {"type": "Lead"}, "Email": "x@example.com", "Name": "Test Lead", "Status": "Open - Not Contacted"},
                {"attributes": {"type": "Lead"}, "Email": "y@example.com", "Name": "Test Lead", "Status": "Open - Not Contacted"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "00Q000000000001", "success": true, "errors": []},
            {"success": false, "errors": [{"statusCode": "DUPLICATES_DETECTED", "message": "dup"}]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let results = store
        .bulk_create(
            "Lead",
            vec![fixtures::lead("x@example.com"), fixtures::lead("y@example.com")],
        )
        .await
        .unwrap();
    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].errors, vec!["DUPLICATES_DETECTED: dup"]);
}

#[tokio::test]
async fn test_cached_client_over_rest_store() {
    let (server, store) = setup().await;
    let schemas = Arc::new(SchemaCache::new());
    let store = store.with_schema_cache(Arc::clone(&schemas));
    mount_describe(&server, "Contact").await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{"attributes": {"type": "Contact"}, "Id": "003000000000009", "Email": "k@example.com"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CachedRecordClient::new(
        Arc::new(store),
        Arc::new(InMemoryKeyValueStore::new()),
        schemas,
        CacheSettings::default(),
        fixtures::unique_scope(),
    );

    for _ in 0..3 {
        let found = client.contact_find_by_email("k@example.com", &[]).await.unwrap();
        assert_eq!(found.unwrap()["Id"], json!("003000000000009"));
    }
    // expectations on the mocks are verified when the server drops
}
