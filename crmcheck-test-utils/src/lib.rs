//! crmcheck Test Utilities
//!
//! Shared test infrastructure for the crmcheck workspace:
//! - An in-memory record store with call counters and failure injection
//! - A key-value store that always fails
//! - Schema and record fixtures
//! - Proptest generators
//! - Custom assertions on `CrmResult`

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub use crmcheck_core::{
    record_id, CacheError, CacheResult, CacheSettings, CreateResult, CrmError, CrmResult,
    EntityKind, FieldDescriptor, FieldProjection, MutationResult, ObjectSchema, Record,
    RecordFilter, SchemaError, StoreError,
};
pub use crmcheck_storage::{KeyValueStore, RecordStore, ScenarioScope};

/// Install a test-friendly tracing subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MOCK RECORD STORE
// ============================================================================

/// Per-operation call counts on [`MockRecordStore`].
#[derive(Debug, Default)]
struct CallCounters {
    find: AtomicUsize,
    create: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    describe: AtomicUsize,
}

/// In-memory record store.
///
/// Records are kept per object type and receive ids shaped like the real
/// store's (three-character key prefix, fifteen characters in total).
/// Describe answers from registered schemas and fails for anything else.
#[derive(Debug, Default)]
pub struct MockRecordStore {
    records: RwLock<HashMap<String, Vec<Record>>>,
    schemas: RwLock<HashMap<String, ObjectSchema>>,
    next_id: AtomicUsize,
    calls: CallCounters,
    last_projection: RwLock<Option<FieldProjection>>,
    fail_find: AtomicBool,
    fail_mutations: AtomicBool,
    fail_describe: AtomicBool,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with narrow schemas registered for the well-known entities.
    pub fn with_standard_schemas() -> Self {
        let store = Self::new();
        for entity in [
            EntityKind::Account,
            EntityKind::Contact,
            EntityKind::Lead,
            EntityKind::Opportunity,
            EntityKind::Case,
            EntityKind::Campaign,
            EntityKind::CampaignMember,
        ] {
            store.register_schema(fixtures::narrow_schema(entity.as_str()));
        }
        store
    }

    pub fn register_schema(&self, schema: ObjectSchema) {
        self.schemas
            .write()
            .unwrap()
            .insert(schema.object_type.clone(), schema);
    }

    /// Insert a record directly, bypassing counters. Assigns an `Id` if absent.
    pub fn seed(&self, object_type: &str, mut record: Record) -> String {
        let id = match record_id(&record) {
            Some(id) => id.to_string(),
            None => {
                let id = self.generate_id(object_type);
                record.insert("Id".to_string(), Value::from(id.clone()));
                id
            }
        };
        self.records
            .write()
            .unwrap()
            .entry(object_type.to_string())
            .or_default()
            .push(record);
        id
    }

    /// Every stored record of `object_type`.
    pub fn records(&self, object_type: &str) -> Vec<Record> {
        self.records
            .read()
            .unwrap()
            .get(object_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn find_calls(&self) -> usize {
        self.calls.find.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.calls.update.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.calls.describe.load(Ordering::SeqCst)
    }

    /// Projection passed to the most recent find.
    pub fn last_projection(&self) -> Option<FieldProjection> {
        self.last_projection.read().unwrap().clone()
    }

    pub fn fail_find(&self, fail: bool) {
        self.fail_find.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn fail_describe(&self, fail: bool) {
        self.fail_describe.store(fail, Ordering::SeqCst);
    }

    fn generate_id(&self, object_type: &str) -> String {
        let prefix = match object_type {
            "Account" => "001",
            "Contact" => "003",
            "Opportunity" => "006",
            "Lead" => "00Q",
            "Case" => "500",
            "Campaign" => "701",
            "CampaignMember" => "00v",
            _ => "a00",
        };
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}{n:012}")
    }

    fn injected_failure(operation: &str, object_type: &str) -> CrmError {
        StoreError::RequestFailed {
            operation: operation.to_string(),
            object_type: object_type.to_string(),
            status: 500,
            message: "injected failure".to_string(),
        }
        .into()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn find(
        &self,
        object_type: &str,
        filter: &RecordFilter,
        projection: &FieldProjection,
    ) -> CrmResult<Vec<Record>> {
        self.calls.find.fetch_add(1, Ordering::SeqCst);
        *self.last_projection.write().unwrap() = Some(projection.clone());
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(Self::injected_failure("find", object_type));
        }
        let records = self.records.read().unwrap();
        Ok(records
            .get(object_type)
            .map(|rows| {
                rows.iter()
                    .filter(|r| filter.matches(r))
                    .map(|r| projection.apply(r))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, object_type: &str, mut fields: Record) -> CrmResult<CreateResult> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::injected_failure("create", object_type));
        }
        fields.remove("Id");
        let id = self.seed(object_type, fields);
        Ok(CreateResult::created(id))
    }

    async fn update(&self, object_type: &str, fields: Record) -> CrmResult<MutationResult> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::injected_failure("update", object_type));
        }
        let id = record_id(&fields)
            .ok_or_else(|| StoreError::InvalidResponse {
                operation: "update".to_string(),
                reason: "record has no Id".to_string(),
            })?
            .to_string();

        let mut records = self.records.write().unwrap();
        let existing = records
            .get_mut(object_type)
            .and_then(|rows| rows.iter_mut().find(|r| record_id(r) == Some(id.as_str())))
            .ok_or_else(|| StoreError::NotFound {
                object_type: object_type.to_string(),
                id: id.clone(),
            })?;
        for (field, value) in fields {
            existing.insert(field, value);
        }
        Ok(MutationResult::ok(id))
    }

    async fn delete(&self, object_type: &str, id: &str) -> CrmResult<MutationResult> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::injected_failure("delete", object_type));
        }
        let mut records = self.records.write().unwrap();
        let rows = records.entry(object_type.to_string()).or_default();
        let before = rows.len();
        rows.retain(|r| record_id(r) != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound {
                object_type: object_type.to_string(),
                id: id.to_string(),
            }
            .into());
        }
        Ok(MutationResult::ok(id))
    }

    async fn describe(&self, object_type: &str) -> CrmResult<ObjectSchema> {
        self.calls.describe.fetch_add(1, Ordering::SeqCst);
        if self.fail_describe.load(Ordering::SeqCst) {
            return Err(Self::injected_failure("describe", object_type));
        }
        self.schemas
            .read()
            .unwrap()
            .get(object_type)
            .cloned()
            .ok_or_else(|| {
                StoreError::RequestFailed {
                    operation: "describe".to_string(),
                    object_type: object_type.to_string(),
                    status: 404,
                    message: "NOT_FOUND".to_string(),
                }
                .into()
            })
    }
}

// ============================================================================
// FAILING KEY-VALUE STORE
// ============================================================================

/// Key-value store whose every operation fails, for cache fault tests.
#[derive(Debug, Default)]
pub struct FailingKeyValueStore {
    calls: AtomicUsize,
}

impl FailingKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total operations attempted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self, operation: &str) -> CacheError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CacheError::Backend {
            operation: operation.to_string(),
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl KeyValueStore for FailingKeyValueStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(self.fail("get"))
    }

    async fn set_ex(&self, _key: &str, _ttl: Duration, _value: &str) -> CacheResult<()> {
        Err(self.fail("set_ex"))
    }

    async fn del(&self, _key: &str) -> CacheResult<()> {
        Err(self.fail("del"))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made schemas, records and scopes.

    use super::*;
    use serde_json::json;

    /// Schema with a handful of standard fields and two custom fields.
    pub fn narrow_schema(object_type: &str) -> ObjectSchema {
        ObjectSchema::new(
            object_type,
            vec![
                FieldDescriptor::standard("Id"),
                FieldDescriptor::standard("Name"),
                FieldDescriptor::standard("Email"),
                FieldDescriptor::standard("Status"),
                FieldDescriptor::custom("External_Id__c"),
                FieldDescriptor::custom("Score__c"),
            ],
        )
    }

    /// Schema whose "select every field" query is far past the default
    /// length threshold.
    pub fn wide_schema(object_type: &str) -> ObjectSchema {
        let mut schema = narrow_schema(object_type);
        schema.fields.extend(
            (0..1000).map(|i| FieldDescriptor::custom(format!("Generated_Field_{i:04}__c"))),
        );
        schema
    }

    /// Build a record from a JSON object literal.
    pub fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("record fixture must be a JSON object, got {other}"),
        }
    }

    pub fn lead(email: &str) -> Record {
        record(json!({
            "Email": email,
            "Name": "Test Lead",
            "Status": "Open - Not Contacted",
        }))
    }

    pub fn contact(email: &str) -> Record {
        record(json!({
            "Email": email,
            "Name": "Test Contact",
        }))
    }

    pub fn account(external_id: &str) -> Record {
        record(json!({
            "Name": "Test Account",
            "External_Id__c": external_id,
        }))
    }

    /// A scope with a fresh scenario id.
    pub fn unique_scope() -> ScenarioScope {
        ScenarioScope::new(uuid::Uuid::now_v7().to_string(), "user-1")
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for crmcheck types.

    use super::*;
    use proptest::prelude::*;

    /// Ids as they appear in scenario and requestor identifiers.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_-]{1,24}"
    }

    pub fn arb_scope() -> impl Strategy<Value = ScenarioScope> {
        (arb_identifier(), arb_identifier())
            .prop_map(|(scenario, requestor)| ScenarioScope::new(scenario, requestor))
    }

    pub fn arb_email() -> impl Strategy<Value = String> {
        ("[a-z]{1,12}", "[a-z]{1,10}").prop_map(|(user, domain)| format!("{user}@{domain}.com"))
    }

    pub fn arb_entity_kind() -> impl Strategy<Value = EntityKind> {
        prop_oneof![
            Just(EntityKind::Account),
            Just(EntityKind::Contact),
            Just(EntityKind::Lead),
            Just(EntityKind::Opportunity),
            Just(EntityKind::Case),
            Just(EntityKind::Campaign),
            "[A-Z][a-z]{2,10}__c".prop_map(EntityKind::Object),
        ]
    }

    /// Scalar JSON values as they appear in record fields.
    pub fn arb_field_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            (-1_000_000i64..1_000_000).prop_map(Value::from),
            "[ -~]{0,32}".prop_map(Value::from),
        ]
    }

    pub fn arb_record() -> impl Strategy<Value = Record> {
        proptest::collection::btree_map("[A-Z][A-Za-z]{1,12}", arb_field_value(), 1..8)
            .prop_map(|fields| fields.into_iter().collect())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on `CrmResult` error variants.

    use super::*;

    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &CrmResult<T>) {
        match result {
            Err(CrmError::Store(_)) => {}
            other => panic!("Expected Store error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_schema_error<T: std::fmt::Debug>(result: &CrmResult<T>) {
        match result {
            Err(CrmError::Schema(_)) => {}
            other => panic!("Expected Schema error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CrmResult<T>, object_type: &str) {
        match result {
            Err(CrmError::Store(StoreError::NotFound { object_type: ot, .. })) => {
                assert_eq!(ot, object_type, "Wrong object type in NotFound error");
            }
            other => panic!("Expected NotFound error for {}, got: {:?}", object_type, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_store_crud() {
        let store = MockRecordStore::new();
        let created = store
            .create("Lead", fixtures::lead("a@example.com"))
            .await
            .unwrap();
        let id = created.id.clone().unwrap();
        assert!(id.starts_with("00Q"));
        assert_eq!(id.len(), 15);

        let mut update = Record::new();
        update.insert("Id".to_string(), json!(id));
        update.insert("Status".to_string(), json!("Working"));
        store.update("Lead", update).await.unwrap();

        let found = store
            .find_one("Lead", &RecordFilter::by("Id", id.as_str()), &FieldProjection::All)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["Status"], json!("Working"));

        store.delete("Lead", &id).await.unwrap();
        assertions::assert_not_found(&store.delete("Lead", &id).await, "Lead");
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.delete_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_store_failure_injection() {
        let store = MockRecordStore::with_standard_schemas();
        store.fail_find(true);
        store.fail_describe(true);

        let result = store
            .find("Lead", &RecordFilter::new(), &FieldProjection::All)
            .await;
        assertions::assert_store_error(&result);
        assert!(store.describe("Lead").await.is_err());
    }

    #[tokio::test]
    async fn test_failing_kv_counts_calls() {
        let kv = FailingKeyValueStore::new();
        assert!(kv.get("k").await.is_err());
        assert!(kv.del("k").await.is_err());
        assert_eq!(kv.calls(), 2);
    }

    #[test]
    fn test_wide_schema_is_wider_than_narrow() {
        assert!(fixtures::wide_schema("Lead").fields.len() > fixtures::narrow_schema("Lead").fields.len());
    }
}
