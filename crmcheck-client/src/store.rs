//! REST record store with a concurrency limit.

use std::sync::Arc;

use async_trait::async_trait;
use crmcheck_core::{
    CreateResult, CrmError, CrmResult, FieldDescriptor, FieldProjection, MutationResult,
    ObjectSchema, Record, RecordFilter, StoreError,
};
use crmcheck_storage::{RecordStore, SchemaCache};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::RestClientConfig;
use crate::soql;
use crate::types::{
    strip_attributes, ApiError, CompositeCreateRequest, DescribeResponse, QueryResponse,
    SaveResult,
};

/// Records accepted per composite create request.
pub const COMPOSITE_BATCH_SIZE: usize = 200;

fn request_failed(
    operation: &str,
    object_type: &str,
    status: u16,
    message: impl Into<String>,
) -> CrmError {
    StoreError::RequestFailed {
        operation: operation.to_string(),
        object_type: object_type.to_string(),
        status,
        message: message.into(),
    }
    .into()
}

fn invalid_response(operation: &str, reason: impl Into<String>) -> CrmError {
    StoreError::InvalidResponse {
        operation: operation.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// [`RecordStore`] over the record store's REST API.
///
/// An unrestricted find selects every described field by name, so the store
/// keeps a schema cache. Share it with the cached client via
/// [`RestRecordStore::with_schema_cache`] to describe each type once.
pub struct RestRecordStore {
    client: Client,
    config: RestClientConfig,
    base_url: String,
    rate_limiter: Arc<Semaphore>,
    schemas: Arc<SchemaCache>,
}

impl RestRecordStore {
    /// Create a store from a validated configuration.
    pub fn new(config: RestClientConfig) -> CrmResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| request_failed("connect", "", 0, format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url(),
            rate_limiter: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            schemas: Arc::new(SchemaCache::new()),
            config,
        })
    }

    pub fn with_schema_cache(mut self, schemas: Arc<SchemaCache>) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    pub fn schema_cache(&self) -> &Arc<SchemaCache> {
        &self.schemas
    }

    /// Field names a query for `projection` selects.
    async fn selected_fields(
        &self,
        object_type: &str,
        projection: &FieldProjection,
    ) -> CrmResult<Vec<String>> {
        match projection {
            FieldProjection::Only(fields) => Ok(fields.clone()),
            FieldProjection::All => {
                let schema = self.schemas.get_schema(self, object_type).await?;
                Ok(schema.field_names().map(str::to_string).collect())
            }
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.access_token)
    }

    /// Send a request and return the response if its status is 2xx.
    async fn send(
        &self,
        operation: &str,
        object_type: &str,
        request: RequestBuilder,
    ) -> CrmResult<Response> {
        let _permit = self.rate_limiter.acquire().await.map_err(|e| {
            request_failed(operation, object_type, 0, format!("Rate limiter error: {}", e))
        })?;

        let response = request.send().await.map_err(|e| {
            request_failed(
                operation,
                object_type,
                0,
                format!("HTTP request failed: {}", e),
            )
        })?;

        let status = response.status();
        debug!(operation, object_type, status = status.as_u16(), "REST call completed");
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<Vec<ApiError>>(&error_text) {
            Ok(errors) if !errors.is_empty() => errors
                .iter()
                .map(ApiError::describe)
                .collect::<Vec<_>>()
                .join("; "),
            _ => error_text,
        };
        Err(request_failed(operation, object_type, status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        object_type: &str,
        request: RequestBuilder,
    ) -> CrmResult<T> {
        self.send(operation, object_type, request)
            .await?
            .json()
            .await
            .map_err(|e| invalid_response(operation, format!("Failed to parse response: {}", e)))
    }

    /// Run a query and follow every continuation page.
    async fn query(&self, object_type: &str, soql: &str) -> CrmResult<Vec<Record>> {
        debug!(object_type, soql, "Querying records");
        let url = format!("{}/query", self.base_url);
        let mut page: QueryResponse = self
            .send_json(
                "query",
                object_type,
                self.request(Method::GET, &url).query(&[("q", soql)]),
            )
            .await?;

        let mut records = Vec::with_capacity(page.total_size as usize);
        loop {
            records.extend(page.records.drain(..).map(|mut r| {
                strip_attributes(&mut r);
                r
            }));
            match (page.done, page.next_records_url.take()) {
                (false, Some(next)) => {
                    let url = format!("{}{}", self.config.instance_url.trim_end_matches('/'), next);
                    page = self
                        .send_json("query", object_type, self.request(Method::GET, &url))
                        .await?;
                }
                _ => break,
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn find(
        &self,
        object_type: &str,
        filter: &RecordFilter,
        projection: &FieldProjection,
    ) -> CrmResult<Vec<Record>> {
        let fields = self.selected_fields(object_type, projection).await?;
        self.query(object_type, &soql::select(object_type, filter, &fields))
            .await
    }

    async fn create(&self, object_type: &str, fields: Record) -> CrmResult<CreateResult> {
        let url = format!("{}/sobjects/{}", self.base_url, object_type);
        let result: SaveResult = self
            .send_json(
                "create",
                object_type,
                self.request(Method::POST, &url).json(&fields),
            )
            .await?;
        Ok(result.into())
    }

    async fn bulk_create(
        &self,
        object_type: &str,
        records: Vec<Record>,
    ) -> CrmResult<Vec<CreateResult>> {
        let url = format!("{}/composite/sobjects", self.base_url);
        let mut results = Vec::with_capacity(records.len());

        for batch in records.chunks(COMPOSITE_BATCH_SIZE) {
            let body = CompositeCreateRequest {
                all_or_none: false,
                records: batch
                    .iter()
                    .map(|record| {
                        let mut record = record.clone();
                        record.insert(
                            "attributes".to_string(),
                            serde_json::json!({ "type": object_type }),
                        );
                        Value::Object(record)
                    })
                    .collect(),
            };
            let saved: Vec<SaveResult> = self
                .send_json(
                    "bulk_create",
                    object_type,
                    self.request(Method::POST, &url).json(&body),
                )
                .await?;
            if saved.len() != batch.len() {
                return Err(invalid_response(
                    "bulk_create",
                    format!("expected {} results, got {}", batch.len(), saved.len()),
                ));
            }
            results.extend(saved.into_iter().map(CreateResult::from));
        }
        Ok(results)
    }

    async fn update(&self, object_type: &str, mut fields: Record) -> CrmResult<MutationResult> {
        let id = match fields.remove("Id") {
            Some(Value::String(id)) => id,
            _ => {
                return Err(request_failed(
                    "update",
                    object_type,
                    0,
                    "record has no string Id",
                ))
            }
        };
        let url = format!("{}/sobjects/{}/{}", self.base_url, object_type, id);
        self.send(
            "update",
            object_type,
            self.request(Method::PATCH, &url).json(&fields),
        )
        .await?;
        Ok(MutationResult::ok(id))
    }

    async fn delete(&self, object_type: &str, id: &str) -> CrmResult<MutationResult> {
        let url = format!("{}/sobjects/{}/{}", self.base_url, object_type, id);
        self.send("delete", object_type, self.request(Method::DELETE, &url))
            .await?;
        Ok(MutationResult::ok(id))
    }

    async fn describe(&self, object_type: &str) -> CrmResult<ObjectSchema> {
        let url = format!("{}/sobjects/{}/describe", self.base_url, object_type);
        let described: DescribeResponse = self
            .send_json("describe", object_type, self.request(Method::GET, &url))
            .await?;
        let fields = described
            .fields
            .into_iter()
            .map(|f| FieldDescriptor {
                name: f.name,
                custom: f.custom,
            })
            .collect();
        Ok(ObjectSchema::new(described.name, fields))
    }
}

impl std::fmt::Debug for RestRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestRecordStore")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
