//! Shared helpers for integration tests.

#![allow(dead_code)]

use airtable_client::{Airtable, Configuration, RetrySettings, TableClient};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use wiremock::MockServer;

pub const BASE_ID: &str = "appTest";
pub const TABLE: &str = "Tasks";
pub const TABLE_PATH: &str = "/v0/appTest/Tasks";
pub const API_KEY: &str = "keyTest";

/// Row type used across integration tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "Name")]
    pub name: String,
}

impl Task {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Retry settings short enough for tests: one retry after 1-2 seconds.
pub fn fast_retry() -> RetrySettings {
    RetrySettings {
        wait_min_secs: 1,
        wait_max_secs: 2,
        retries: 1,
    }
}

pub fn config_for(endpoint: &str) -> Configuration {
    Configuration::builder(API_KEY)
        .endpoint_url(endpoint)
        .retry(fast_retry())
        .build()
        .expect("valid test configuration")
}

pub fn airtable(server: &MockServer) -> Airtable {
    Airtable::new(config_for(&format!("{}/v0", server.uri()))).expect("client should build")
}

pub fn table<T>(server: &MockServer) -> TableClient<T>
where
    T: DeserializeOwned + Send + 'static,
{
    airtable(server)
        .table(BASE_ID, TABLE)
        .expect("table URL should build")
}

/// A record as returned by the API.
pub fn record_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "fields": {"Name": name},
        "createdTime": "2024-01-01T00:00:00.000Z"
    })
}

/// A list response body with the given records and optional cursor.
pub fn page_json(records: &[(&str, &str)], offset: Option<&str>) -> Value {
    let records: Vec<Value> = records
        .iter()
        .map(|(id, name)| record_json(id, name))
        .collect();
    match offset {
        Some(offset) => json!({"records": records, "offset": offset}),
        None => json!({"records": records}),
    }
}
