use serde_json::{json, Map, Value};

use super::{issue_fields, project_jql, take_field};
use crate::api::XrayClient;
use crate::error::{Result, XrayError};
use crate::queries;
use crate::types::{
    CreatedTestGroup, NewTestGroup, SearchResults, TestGroup, TestsAdded, TestsRemoved,
};

/// Test plans and test sets share one shape and differ only in the Xray operations used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Plan,
    Set,
}

struct GroupOperations {
    label: &'static str,
    create: &'static str,
    create_field: &'static str,
    created_field: &'static str,
    search: &'static str,
    search_field: &'static str,
    add: &'static str,
    add_field: &'static str,
    remove: &'static str,
    remove_field: &'static str,
}

static PLAN_OPERATIONS: GroupOperations = GroupOperations {
    label: "Test plan",
    create: queries::CREATE_TEST_PLAN,
    create_field: "createTestPlan",
    created_field: "testPlan",
    search: queries::GET_TEST_PLANS,
    search_field: "getTestPlans",
    add: queries::ADD_TESTS_TO_TEST_PLAN,
    add_field: "addTestsToTestPlan",
    remove: queries::REMOVE_TESTS_FROM_TEST_PLAN,
    remove_field: "removeTestsFromTestPlan",
};

static SET_OPERATIONS: GroupOperations = GroupOperations {
    label: "Test set",
    create: queries::CREATE_TEST_SET,
    create_field: "createTestSet",
    created_field: "testSet",
    search: queries::GET_TEST_SETS,
    search_field: "getTestSets",
    add: queries::ADD_TESTS_TO_TEST_SET,
    add_field: "addTestsToTestSet",
    remove: queries::REMOVE_TESTS_FROM_TEST_SET,
    remove_field: "removeTestsFromTestSet",
};

impl GroupKind {
    fn operations(self) -> &'static GroupOperations {
        match self {
            GroupKind::Plan => &PLAN_OPERATIONS,
            GroupKind::Set => &SET_OPERATIONS,
        }
    }

    pub fn label(self) -> &'static str {
        self.operations().label
    }
}

fn create_group_variables(input: &NewTestGroup) -> Value {
    let mut variables = Map::new();
    if !input.test_issue_ids.is_empty() {
        variables.insert("testIssueIds".to_string(), json!(input.test_issue_ids));
    }
    let fields = issue_fields(
        &input.project_key,
        &input.summary,
        input.description.as_deref(),
    );
    variables.insert("jira".to_string(), json!({ "fields": fields }));
    Value::Object(variables)
}

impl XrayClient {
    pub async fn create_test_group(
        &self,
        kind: GroupKind,
        input: &NewTestGroup,
    ) -> Result<CreatedTestGroup> {
        let ops = kind.operations();
        let data: Value = self
            .execute(ops.create, create_group_variables(input))
            .await?;
        let mut payload: Value = take_field(data, ops.create_field)?;
        let warnings: Vec<String> = payload
            .get_mut("warnings")
            .map(Value::take)
            .and_then(|w| serde_json::from_value(w).ok())
            .unwrap_or_default();
        let group: TestGroup = take_field(payload, ops.created_field)?;
        let key = group
            .key()
            .ok_or_else(|| XrayError::decode(ops.create_field, "created issue has no key"))?
            .to_string();

        Ok(CreatedTestGroup {
            issue_id: group.issue_id,
            key,
            warnings,
        })
    }

    /// Fetch one plan or set by key. At most 100 associated tests are returned.
    pub async fn get_test_group(&self, kind: GroupKind, key: &str) -> Result<TestGroup> {
        let ops = kind.operations();
        self.find_by_key(ops.search, ops.search_field, ops.label, key)
            .await
    }

    pub async fn search_test_groups(
        &self,
        kind: GroupKind,
        jql: &str,
        limit: u32,
    ) -> Result<SearchResults<TestGroup>> {
        let ops = kind.operations();
        self.search(ops.search, ops.search_field, jql, limit).await
    }

    pub async fn get_project_test_groups(
        &self,
        kind: GroupKind,
        project_key: &str,
        limit: u32,
    ) -> Result<SearchResults<TestGroup>> {
        self.search_test_groups(kind, &project_jql(project_key), limit)
            .await
    }

    pub async fn add_tests_to_group(
        &self,
        kind: GroupKind,
        issue_id: &str,
        test_issue_ids: &[String],
    ) -> Result<TestsAdded> {
        let ops = kind.operations();
        let data: Value = self
            .execute(
                ops.add,
                json!({ "issueId": issue_id, "testIssueIds": test_issue_ids }),
            )
            .await?;
        take_field(data, ops.add_field)
    }

    pub async fn remove_tests_from_group(
        &self,
        kind: GroupKind,
        issue_id: &str,
        test_issue_ids: &[String],
    ) -> Result<TestsRemoved> {
        let ops = kind.operations();
        let data: Value = self
            .execute(
                ops.remove,
                json!({ "issueId": issue_id, "testIssueIds": test_issue_ids }),
            )
            .await?;
        take_field(data, ops.remove_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{graphql_request, mount_auth, mount_graphql, test_client};
    use wiremock::MockServer;

    fn new_group(ids: &[&str]) -> NewTestGroup {
        NewTestGroup {
            project_key: "TEST".to_string(),
            summary: "Release 1.0".to_string(),
            description: Some("Scope of the release".to_string()),
            test_issue_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_create_variables() {
        let vars = create_group_variables(&new_group(&[]));
        assert!(vars.get("testIssueIds").is_none());
        assert_eq!(vars["jira"]["fields"]["description"], "Scope of the release");

        let vars = create_group_variables(&new_group(&["1", "2"]));
        assert_eq!(vars["testIssueIds"], json!(["1", "2"]));
    }

    #[test]
    fn test_kinds_use_distinct_operations() {
        assert_eq!(GroupKind::Plan.label(), "Test plan");
        assert_eq!(GroupKind::Set.label(), "Test set");
        assert!(GroupKind::Plan.operations().create.contains("createTestPlan"));
        assert!(GroupKind::Set.operations().create.contains("createTestSet"));
        assert!(GroupKind::Set.operations().remove.contains("removeTestsFromTestSet"));
    }

    #[tokio::test]
    async fn test_create_test_plan() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        mount_graphql(
            &server,
            "createTestPlan",
            json!({ "createTestPlan": {
                "testPlan": { "issueId": "30001", "jira": { "key": "TEST-300" } },
                "warnings": ["Test 99 not found"]
            } }),
            1,
        )
        .await;

        let client = test_client(&server);
        let created = client
            .create_test_group(GroupKind::Plan, &new_group(&["10001"]))
            .await
            .unwrap();
        assert_eq!(created.issue_id, "30001");
        assert_eq!(created.key, "TEST-300");
        assert_eq!(created.warnings, vec!["Test 99 not found".to_string()]);
    }

    #[tokio::test]
    async fn test_get_test_set_not_found() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        mount_graphql(
            &server,
            "getTestSets",
            json!({ "getTestSets": { "total": 0, "start": 0, "limit": 1, "results": [] } }),
            1,
        )
        .await;

        let client = test_client(&server);
        let err = client
            .get_test_group(GroupKind::Set, "TEST-77")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Test set TEST-77 not found");
    }

    #[tokio::test]
    async fn test_get_test_plan_with_tests() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        mount_graphql(
            &server,
            "getTestPlans",
            json!({ "getTestPlans": { "total": 1, "start": 0, "limit": 1, "results": [{
                "issueId": "30001",
                "jira": { "key": "TEST-300", "summary": "Release 1.0" },
                "tests": { "total": 2, "results": [
                    { "issueId": "10001", "jira": { "key": "TEST-1" } },
                    { "issueId": "10002", "jira": { "key": "TEST-2" } }
                ] }
            }] } }),
            1,
        )
        .await;

        let client = test_client(&server);
        let plan = client
            .get_test_group(GroupKind::Plan, "TEST-300")
            .await
            .unwrap();
        assert_eq!(plan.tests.total, Some(2));
        assert_eq!(plan.tests.results[1].jira.key.as_deref(), Some("TEST-2"));
    }

    #[tokio::test]
    async fn test_add_tests_returns_vendor_payload() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        mount_graphql(
            &server,
            "addTestsToTestSet",
            json!({ "addTestsToTestSet": { "addedTests": ["10001"], "warning": "10002 already in set" } }),
            1,
        )
        .await;

        let client = test_client(&server);
        let ids = vec!["10001".to_string(), "10002".to_string()];
        let added = client
            .add_tests_to_group(GroupKind::Set, "40001", &ids)
            .await
            .unwrap();
        assert_eq!(added.added_tests, vec!["10001".to_string()]);
        assert_eq!(added.warning.as_deref(), Some("10002 already in set"));

        let body = graphql_request(&server, 0).await;
        assert_eq!(body["variables"]["issueId"], "40001");
        assert_eq!(body["variables"]["testIssueIds"], json!(["10001", "10002"]));
    }

    #[tokio::test]
    async fn test_remove_tests_from_plan() {
        let server = MockServer::start().await;
        mount_auth(&server, "T", 1).await;
        mount_graphql(
            &server,
            "removeTestsFromTestPlan",
            json!({ "removeTestsFromTestPlan": { "removedTests": ["10001"], "warning": null } }),
            1,
        )
        .await;

        let client = test_client(&server);
        let removed = client
            .remove_tests_from_group(GroupKind::Plan, "30001", &["10001".to_string()])
            .await
            .unwrap();
        assert_eq!(removed.removed_tests, vec!["10001".to_string()]);
        assert!(removed.warning.is_none());
    }
}
