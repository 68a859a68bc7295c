use serde_json::{json, Map, Value};

use super::{issue_fields, project_jql, take_field};
use crate::api::XrayClient;
use crate::error::{Result, XrayError};
use crate::queries;
use crate::types::{CreatedTestExecution, NewTestExecution, RunStatus, SearchResults, TestExecution};

fn create_execution_variables(input: &NewTestExecution) -> Value {
    let mut variables = Map::new();
    if !input.test_issue_ids.is_empty() {
        variables.insert("testIssueIds".to_string(), json!(input.test_issue_ids));
    }
    if !input.test_environments.is_empty() {
        variables.insert(
            "testEnvironments".to_string(),
            json!(input.test_environments),
        );
    }
    let fields = issue_fields(
        &input.project_key,
        &input.summary,
        input.description.as_deref(),
    );
    variables.insert("jira".to_string(), json!({ "fields": fields }));
    Value::Object(variables)
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTestExecutionPayload {
    test_execution: TestExecution,
}

impl XrayClient {
    /// Create a test execution. Xray creates one test run per associated test and returns
    /// them in the same response.
    pub async fn create_test_execution(
        &self,
        input: &NewTestExecution,
    ) -> Result<CreatedTestExecution> {
        let data: Value = self
            .execute(
                queries::CREATE_TEST_EXECUTION,
                create_execution_variables(input),
            )
            .await?;
        let payload: CreateTestExecutionPayload = take_field(data, "createTestExecution")?;
        let execution = payload.test_execution;
        let key = execution
            .key()
            .ok_or_else(|| XrayError::decode("createTestExecution", "created execution has no key"))?
            .to_string();

        Ok(CreatedTestExecution {
            issue_id: execution.issue_id,
            key,
            test_runs: execution.test_runs.results,
        })
    }

    /// Fetch one execution by key. At most 100 test runs are returned.
    pub async fn get_test_execution(&self, key: &str) -> Result<TestExecution> {
        self.find_by_key(
            queries::GET_TEST_EXECUTIONS,
            "getTestExecutions",
            "Test execution",
            key,
        )
        .await
    }

    pub async fn search_test_executions(
        &self,
        jql: &str,
        limit: u32,
    ) -> Result<SearchResults<TestExecution>> {
        self.search(queries::GET_TEST_EXECUTIONS, "getTestExecutions", jql, limit)
            .await
    }

    pub async fn get_project_test_executions(
        &self,
        project_key: &str,
        limit: u32,
    ) -> Result<SearchResults<TestExecution>> {
        self.search_test_executions(&project_jql(project_key), limit)
            .await
    }

    /// Returns Xray's confirmation text. Re-fetch the execution to see the new status.
    pub async fn update_test_run_status(&self, run_id: &str, status: RunStatus) -> Result<String> {
        let data: Value = self
            .execute(
                queries::UPDATE_TEST_RUN_STATUS,
                json!({ "id": run_id, "status": status.as_str() }),
            )
            .await?;
        let message = match &data["updateTestRunStatus"] {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{graphql_ok, graphql_request, mount_auth, mount_graphql, test_client};
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn new_execution() -> NewTestExecution {
        NewTestExecution {
            project_key: "TEST".to_string(),
            summary: "Sprint 1 regression".to_string(),
            description: None,
            test_issue_ids: vec!["10001".to_string()],
            test_environments: Vec::new(),
        }
    }

    /// Minimal stateful Xray: remembers the status of a single test run.
    struct FakeExecutionBackend {
        run_status: Arc<Mutex<String>>,
    }

    impl FakeExecutionBackend {
        fn execution(&self) -> Value {
            let status = self.run_status.lock().unwrap().clone();
            json!({
                "issueId": "20001",
                "jira": { "key": "TEST-200", "summary": "Sprint 1 regression" },
                "testEnvironments": [],
                "tests": { "total": 1, "results": [{ "issueId": "10001", "jira": { "key": "TEST-123" } }] },
                "testRuns": { "total": 1, "results": [{
                    "id": "run-1",
                    "status": { "name": status },
                    "test": { "issueId": "10001", "jira": { "key": "TEST-123" } }
                }] }
            })
        }
    }

    impl Respond for FakeExecutionBackend {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let query = body["query"].as_str().unwrap_or_default();
            if query.contains("createTestExecution") {
                graphql_ok(json!({ "createTestExecution": {
                    "testExecution": self.execution(),
                    "warnings": [],
                    "createdTestEnvironments": []
                } }))
            } else if query.contains("updateTestRunStatus") {
                *self.run_status.lock().unwrap() =
                    body["variables"]["status"].as_str().unwrap().to_string();
                graphql_ok(json!({ "updateTestRunStatus": "Test run status updated" }))
            } else if query.contains("getTestExecutions") {
                graphql_ok(json!({ "getTestExecutions": {
                    "total": 1, "start": 0, "limit": 1, "results": [self.execution()]
                } }))
            } else {
                ResponseTemplate::new(400).set_body_string("unexpected query")
            }
        }
    }

    #[test]
    fn test_create_variables_omit_empty_lists() {
        let input = NewTestExecution {
            test_issue_ids: Vec::new(),
            ..new_execution()
        };
        let vars = create_execution_variables(&input);
        assert!(vars.get("testIssueIds").is_none());
        assert!(vars.get("testEnvironments").is_none());
        assert_eq!(vars["jira"]["fields"]["summary"], "Sprint 1 regression");
    }

    #[test]
    fn test_create_variables_keep_environment_order() {
        let input = NewTestExecution {
            test_environments: vec!["chrome".to_string(), "android".to_string()],
            ..new_execution()
        };
        let vars = create_execution_variables(&input);
        assert_eq!(vars["testIssueIds"], json!(["10001"]));
        assert_eq!(vars["testEnvironments"], json!(["chrome", "android"]));
    }

    #[tokio::test]
    async fn test_run_status_update_visible_on_refetch() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        Mock::given(method("POST"))
            .and(path("/api/v2/graphql"))
            .respond_with(FakeExecutionBackend {
                run_status: Arc::new(Mutex::new("TODO".to_string())),
            })
            .mount(&server)
            .await;

        let client = test_client(&server);
        let created = client.create_test_execution(&new_execution()).await.unwrap();
        assert_eq!(created.key, "TEST-200");
        assert_eq!(created.test_runs.len(), 1);
        assert_eq!(created.test_runs[0].status_name(), Some("TODO"));

        let run_id = created.test_runs[0].id.clone();
        let message = client
            .update_test_run_status(&run_id, RunStatus::Pass)
            .await
            .unwrap();
        assert_eq!(message, "Test run status updated");

        let execution = client.get_test_execution(&created.key).await.unwrap();
        assert_eq!(execution.test_runs.results[0].status_name(), Some("PASS"));
    }

    #[tokio::test]
    async fn test_update_run_status_sends_synonym_verbatim() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        mount_graphql(
            &server,
            "updateTestRunStatus",
            json!({ "updateTestRunStatus": null }),
            1,
        )
        .await;

        let client = test_client(&server);
        let message = client
            .update_test_run_status("run-9", RunStatus::Passed)
            .await
            .unwrap();
        assert!(message.is_empty());

        let body = graphql_request(&server, 0).await;
        assert_eq!(body["variables"]["id"], "run-9");
        assert_eq!(body["variables"]["status"], "PASSED");
    }

    #[tokio::test]
    async fn test_get_test_execution_not_found() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        mount_graphql(
            &server,
            "getTestExecutions",
            json!({ "getTestExecutions": { "total": 0, "start": 0, "limit": 1, "results": [] } }),
            1,
        )
        .await;

        let client = test_client(&server);
        let err = client.get_test_execution("TEST-404").await.unwrap_err();
        assert_eq!(err.to_string(), "Test execution TEST-404 not found");
    }

    #[tokio::test]
    async fn test_project_executions_search() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        mount_graphql(
            &server,
            "getTestExecutions",
            json!({ "getTestExecutions": { "total": 12, "start": 0, "limit": 10, "results": [
                { "issueId": "1", "jira": { "key": "TEST-1" }, "testRuns": { "total": 0, "results": [] } }
            ] } }),
            1,
        )
        .await;

        let client = test_client(&server);
        let page = client.get_project_test_executions("TEST", 10).await.unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.results[0].key(), Some("TEST-1"));

        let body = graphql_request(&server, 0).await;
        assert_eq!(body["variables"]["jql"], "project = 'TEST'");
    }
}
