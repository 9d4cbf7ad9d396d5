//! REST API request and response types

use crmcheck_core::{CreateResult, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query endpoint response page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub total_size: u64,
    pub done: bool,
    pub records: Vec<Record>,
    pub next_records_url: Option<String>,
}

/// Describe endpoint response; only what the schema cache needs.
#[derive(Debug, Deserialize)]
pub struct DescribeResponse {
    pub name: String,
    pub fields: Vec<DescribeField>,
}

#[derive(Debug, Deserialize)]
pub struct DescribeField {
    pub name: String,
    #[serde(default)]
    pub custom: bool,
}

/// One entry of the error array returned with a non-2xx status or inside a
/// save result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub message: String,
    #[serde(alias = "statusCode")]
    pub error_code: Option<String>,
}

impl ApiError {
    pub fn describe(&self) -> String {
        match &self.error_code {
            Some(code) => format!("{}: {}", code, self.message),
            None => self.message.clone(),
        }
    }
}

/// Create and composite create response item.
#[derive(Debug, Deserialize)]
pub struct SaveResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl From<SaveResult> for CreateResult {
    fn from(result: SaveResult) -> Self {
        CreateResult {
            id: result.id,
            success: result.success,
            errors: result.errors.iter().map(ApiError::describe).collect(),
        }
    }
}

/// Composite create request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeCreateRequest {
    pub all_or_none: bool,
    pub records: Vec<Value>,
}

/// Remove the `attributes` envelope member from a record and any nested
/// relationship records.
pub fn strip_attributes(record: &mut Record) {
    record.remove("attributes");
    for value in record.values_mut() {
        if let Value::Object(nested) = value {
            strip_attributes(nested);
        }
    }
}
