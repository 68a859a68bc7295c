use serde_json::{json, Map, Value};
use tracing::debug;

use super::{issue_fields, project_jql, take_field};
use crate::api::XrayClient;
use crate::error::{Result, XrayError};
use crate::queries;
use crate::types::{
    CreatedTestCase, DeletedTestCase, NewTestCase, SearchResults, TestCase, TestCaseUpdate,
};

const UPDATE_UNSUPPORTED: &str = "Updating test case fields is not supported through the Xray GraphQL API. \
Change summary, description, labels or priority through Jira's issue update API, \
and test type or steps through Xray's dedicated test definition mutations.";

fn create_test_variables(input: &NewTestCase) -> Value {
    let mut fields = issue_fields(
        &input.project_key,
        &input.summary,
        input.description.as_deref(),
    );
    if !input.labels.is_empty() {
        fields.insert("labels".to_string(), json!(input.labels));
    }
    if let Some(priority) = &input.priority {
        fields.insert("priority".to_string(), json!({ "name": priority }));
    }

    let mut variables = Map::new();
    if let Some(test_type) = input.test_type {
        variables.insert("testType".to_string(), json!({ "name": test_type.as_str() }));
    }
    variables.insert("jira".to_string(), json!({ "fields": fields }));
    Value::Object(variables)
}

#[derive(serde::Deserialize)]
struct CreateTestPayload {
    test: TestCase,
}

impl XrayClient {
    pub async fn create_test_case(&self, input: &NewTestCase) -> Result<CreatedTestCase> {
        let data: Value = self
            .execute(queries::CREATE_TEST, create_test_variables(input))
            .await?;
        let payload: CreateTestPayload = take_field(data, "createTest")?;
        let key = payload
            .test
            .key()
            .ok_or_else(|| XrayError::decode("createTest", "created test has no key"))?
            .to_string();

        Ok(CreatedTestCase {
            id: payload.test.issue_id,
            self_link: self.config().browse_url(&key),
            key,
        })
    }

    pub async fn get_test_case(&self, key: &str) -> Result<TestCase> {
        self.find_by_key(queries::GET_TESTS, "getTests", "Test case", key)
            .await
    }

    pub async fn search_test_cases(&self, jql: &str, limit: u32) -> Result<SearchResults<TestCase>> {
        self.search(queries::GET_TESTS, "getTests", jql, limit).await
    }

    pub async fn get_project_test_cases(
        &self,
        project_key: &str,
        limit: u32,
    ) -> Result<SearchResults<TestCase>> {
        self.search_test_cases(&project_jql(project_key), limit)
            .await
    }

    /// Xray deletes by issue id, so the key is resolved first.
    pub async fn delete_test_case(&self, key: &str) -> Result<DeletedTestCase> {
        let test = self.get_test_case(key).await?;
        let data: Value = self
            .execute(queries::DELETE_TEST, json!({ "issueId": test.issue_id }))
            .await?;
        debug!(key, response = %data["deleteTest"], "Deleted test case");
        Ok(DeletedTestCase {
            issue_id: test.issue_id,
            key: key.to_string(),
        })
    }

    /// Always fails: structured field updates are not exposed by this client. Needs no
    /// session, so callers without credentials get the same answer.
    pub fn update_test_case(key: &str, _update: &TestCaseUpdate) -> Result<TestCase> {
        debug!(key, "Rejected test case update");
        Err(XrayError::Unsupported(UPDATE_UNSUPPORTED.to_string()))
    }
}
