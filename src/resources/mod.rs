//! Operations on Xray resources, as `XrayClient` methods.

mod test_cases;
mod test_executions;
mod test_groups;

pub use test_groups::GroupKind;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::api::XrayClient;
use crate::error::{Result, XrayError};
use crate::types::SearchResults;

pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Quote a value for use inside a single-quoted JQL string.
fn jql_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn key_jql(key: &str) -> String {
    format!("key = '{}'", jql_quote(key))
}

pub fn project_jql(project_key: &str) -> String {
    format!("project = '{}'", jql_quote(project_key))
}

/// Jira fields shared by every create mutation.
fn issue_fields(project_key: &str, summary: &str, description: Option<&str>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("project".to_string(), json!({ "key": project_key }));
    fields.insert("summary".to_string(), json!(summary));
    if let Some(description) = description {
        fields.insert("description".to_string(), json!(description));
    }
    fields
}

/// Take `field` out of a GraphQL `data` object and decode it.
fn take_field<T: DeserializeOwned>(mut data: Value, field: &str) -> Result<T> {
    let value = data
        .get_mut(field)
        .map(Value::take)
        .filter(|v| !v.is_null())
        .ok_or_else(|| XrayError::decode(field, "field missing from response"))?;
    serde_json::from_value(value).map_err(|e| XrayError::decode(field, e))
}

impl XrayClient {
    /// Run a `get*` search query. `jql` and `limit` are sent unchanged.
    async fn search<T: DeserializeOwned>(
        &self,
        document: &str,
        field: &str,
        jql: &str,
        limit: u32,
    ) -> Result<SearchResults<T>> {
        let data: Value = self
            .execute(document, json!({ "jql": jql, "limit": limit }))
            .await?;
        take_field(data, field)
    }

    /// Exact-key lookup: a search limited to one result.
    async fn find_by_key<T: DeserializeOwned>(
        &self,
        document: &str,
        field: &str,
        label: &str,
        key: &str,
    ) -> Result<T> {
        let page: SearchResults<T> = self.search(document, field, &key_jql(key), 1).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| XrayError::not_found(format!("{} {} not found", label, key)))
    }
}
