//! MCP tool surface: schemas for `tools/list` and name-based dispatch onto `XrayClient`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::XrayClient;
use crate::error::{Result, XrayError};
use crate::resources::{GroupKind, DEFAULT_SEARCH_LIMIT};
use crate::types::{
    NewTestCase, NewTestExecution, NewTestGroup, RunStatus, TestCaseUpdate,
};

fn default_limit() -> u32 {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyArgs {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    jql: String,
    #[serde(default = "default_limit")]
    max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectArgs {
    project_key: String,
    #[serde(default = "default_limit")]
    max_results: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTestCaseArgs {
    #[serde(default)]
    key: String,
    #[serde(flatten)]
    update: TestCaseUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunStatusArgs {
    test_run_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupTestsArgs {
    issue_id: String,
    test_issue_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    message: String,
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| XrayError::InvalidInput(format!("{}: {}", tool, e)))
}

fn to_value<T: Serialize>(tool: &str, value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| XrayError::decode(tool, e))
}

/// Call the tool `name` with JSON `args`.
pub async fn dispatch(client: &XrayClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "create_test_case" => {
            let input: NewTestCase = parse_args(name, args)?;
            to_value(name, client.create_test_case(&input).await?)
        }
        "get_test_case" => {
            let args: KeyArgs = parse_args(name, args)?;
            to_value(name, client.get_test_case(&args.key).await?)
        }
        "update_test_case" => {
            // Refused whatever the arguments look like.
            let args: UpdateTestCaseArgs = serde_json::from_value(args).unwrap_or_default();
            to_value(name, XrayClient::update_test_case(&args.key, &args.update)?)
        }
        "delete_test_case" => {
            let args: KeyArgs = parse_args(name, args)?;
            to_value(name, client.delete_test_case(&args.key).await?)
        }
        "search_test_cases" => {
            let args: SearchArgs = parse_args(name, args)?;
            to_value(name, client.search_test_cases(&args.jql, args.max_results).await?)
        }
        "get_project_test_cases" => {
            let args: ProjectArgs = parse_args(name, args)?;
            to_value(
                name,
                client
                    .get_project_test_cases(&args.project_key, args.max_results)
                    .await?,
            )
        }
        "create_test_execution" => {
            let input: NewTestExecution = parse_args(name, args)?;
            to_value(name, client.create_test_execution(&input).await?)
        }
        "get_test_execution" => {
            let args: KeyArgs = parse_args(name, args)?;
            to_value(name, client.get_test_execution(&args.key).await?)
        }
        "search_test_executions" => {
            let args: SearchArgs = parse_args(name, args)?;
            to_value(
                name,
                client
                    .search_test_executions(&args.jql, args.max_results)
                    .await?,
            )
        }
        "get_project_test_executions" => {
            let args: ProjectArgs = parse_args(name, args)?;
            to_value(
                name,
                client
                    .get_project_test_executions(&args.project_key, args.max_results)
                    .await?,
            )
        }
        "update_test_run_status" => {
            let args: RunStatusArgs = parse_args(name, args)?;
            let status: RunStatus = args.status.parse()?;
            let message = client
                .update_test_run_status(&args.test_run_id, status)
                .await?;
            to_value(name, Message { message })
        }
        _ => dispatch_group_tool(client, name, args).await,
    }
}

/// Plan and set tools are named `<verb>_test_plan(s)` / `<verb>_test_set(s)`.
async fn dispatch_group_tool(client: &XrayClient, name: &str, args: Value) -> Result<Value> {
    let Some((kind, verb)) = split_group_tool(name) else {
        return Err(XrayError::InvalidInput(format!("Unknown tool: {}", name)));
    };

    match verb {
        "create" => {
            let input: NewTestGroup = parse_args(name, args)?;
            to_value(name, client.create_test_group(kind, &input).await?)
        }
        "get" => {
            let args: KeyArgs = parse_args(name, args)?;
            to_value(name, client.get_test_group(kind, &args.key).await?)
        }
        "search" => {
            let args: SearchArgs = parse_args(name, args)?;
            to_value(
                name,
                client
                    .search_test_groups(kind, &args.jql, args.max_results)
                    .await?,
            )
        }
        "get_project" => {
            let args: ProjectArgs = parse_args(name, args)?;
            to_value(
                name,
                client
                    .get_project_test_groups(kind, &args.project_key, args.max_results)
                    .await?,
            )
        }
        "add_tests_to" => {
            let args: GroupTestsArgs = parse_args(name, args)?;
            to_value(
                name,
                client
                    .add_tests_to_group(kind, &args.issue_id, &args.test_issue_ids)
                    .await?,
            )
        }
        "remove_tests_from" => {
            let args: GroupTestsArgs = parse_args(name, args)?;
            to_value(
                name,
                client
                    .remove_tests_from_group(kind, &args.issue_id, &args.test_issue_ids)
                    .await?,
            )
        }
        _ => Err(XrayError::InvalidInput(format!("Unknown tool: {}", name))),
    }
}

/// `search_test_plans` -> (Plan, `search`), `add_tests_to_test_set` -> (Set, `add_tests_to`).
fn split_group_tool(name: &str) -> Option<(GroupKind, &str)> {
    for (kind, noun) in [(GroupKind::Plan, "plan"), (GroupKind::Set, "set")] {
        let plural = format!("_test_{}s", noun);
        if let Some(verb) = name.strip_suffix(plural.as_str()) {
            if matches!(verb, "search" | "get_project") {
                return Some((kind, verb));
            }
        }
        let singular = format!("_test_{}", noun);
        if let Some(verb) = name.strip_suffix(singular.as_str()) {
            if matches!(verb, "create" | "get" | "add_tests_to" | "remove_tests_from") {
                return Some((kind, verb));
            }
        }
    }
    None
}

// -- schemas --------------------------------------------------------------

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

fn key_schema(what: &str) -> Value {
    json!({ "key": { "type": "string", "description": format!("{} issue key, e.g. PROJ-123", what) } })
}

fn search_schema() -> Value {
    json!({
        "jql": { "type": "string", "description": "JQL query" },
        "maxResults": { "type": "integer", "description": "Maximum results (default 50)", "default": DEFAULT_SEARCH_LIMIT }
    })
}

fn project_schema() -> Value {
    json!({
        "projectKey": { "type": "string", "description": "Jira project key" },
        "maxResults": { "type": "integer", "description": "Maximum results (default 50)", "default": DEFAULT_SEARCH_LIMIT }
    })
}

fn issue_schema(extra: Value) -> Value {
    let mut props = json!({
        "projectKey": { "type": "string", "description": "Jira project key" },
        "summary": { "type": "string" },
        "description": { "type": "string" }
    });
    if let (Some(props), Some(extra)) = (props.as_object_mut(), extra.as_object()) {
        props.extend(extra.clone());
    }
    props
}

fn group_tools(kind: &str, label: &str) -> Vec<Value> {
    let ids = json!({
        "issueId": { "type": "string", "description": format!("{} issue id", label) },
        "testIssueIds": { "type": "array", "items": { "type": "string" } }
    });
    vec![
        tool(
            &format!("create_test_{}", kind),
            &format!("Create a {}", label.to_lowercase()),
            issue_schema(json!({ "testIssueIds": { "type": "array", "items": { "type": "string" } } })),
            &["projectKey", "summary"],
        ),
        tool(
            &format!("get_test_{}", kind),
            &format!("Get a {} with its tests", label.to_lowercase()),
            key_schema(label),
            &["key"],
        ),
        tool(
            &format!("search_test_{}s", kind),
            &format!("Search {}s with JQL", label.to_lowercase()),
            search_schema(),
            &["jql"],
        ),
        tool(
            &format!("get_project_test_{}s", kind),
            &format!("List {}s in a project", label.to_lowercase()),
            project_schema(),
            &["projectKey"],
        ),
        tool(
            &format!("add_tests_to_test_{}", kind),
            &format!("Add tests to a {}", label.to_lowercase()),
            ids.clone(),
            &["issueId", "testIssueIds"],
        ),
        tool(
            &format!("remove_tests_from_test_{}", kind),
            &format!("Remove tests from a {}", label.to_lowercase()),
            ids,
            &["issueId", "testIssueIds"],
        ),
    ]
}

/// Definitions advertised by `tools/list`.
pub fn tool_definitions() -> Vec<Value> {
    let test_types = json!(["Manual", "Cucumber", "Generic"]);
    let statuses: Vec<&str> = RunStatus::ALL.iter().map(|s| s.as_str()).collect();

    let mut tools = vec![
        tool(
            "create_test_case",
            "Create a test case in Xray",
            issue_schema(json!({
                "testType": { "type": "string", "enum": test_types },
                "labels": { "type": "array", "items": { "type": "string" } },
                "priority": { "type": "string" }
            })),
            &["projectKey", "summary"],
        ),
        tool(
            "get_test_case",
            "Get a test case with its steps",
            key_schema("Test case"),
            &["key"],
        ),
        tool(
            "update_test_case",
            "Update a test case (not supported by the Xray GraphQL API; always returns an explanation)",
            json!({
                "key": { "type": "string" },
                "summary": { "type": "string" },
                "description": { "type": "string" },
                "testType": { "type": "string", "enum": test_types },
                "labels": { "type": "array", "items": { "type": "string" } },
                "priority": { "type": "string" }
            }),
            &["key"],
        ),
        tool(
            "delete_test_case",
            "Delete a test case",
            key_schema("Test case"),
            &["key"],
        ),
        tool(
            "search_test_cases",
            "Search test cases with JQL",
            search_schema(),
            &["jql"],
        ),
        tool(
            "get_project_test_cases",
            "List test cases in a project",
            project_schema(),
            &["projectKey"],
        ),
        tool(
            "create_test_execution",
            "Create a test execution; Xray creates a test run per test",
            issue_schema(json!({
                "testIssueIds": { "type": "array", "items": { "type": "string" } },
                "testEnvironments": { "type": "array", "items": { "type": "string" } }
            })),
            &["projectKey", "summary"],
        ),
        tool(
            "get_test_execution",
            "Get a test execution with its test runs (up to 100)",
            key_schema("Test execution"),
            &["key"],
        ),
        tool(
            "search_test_executions",
            "Search test executions with JQL",
            search_schema(),
            &["jql"],
        ),
        tool(
            "get_project_test_executions",
            "List test executions in a project",
            project_schema(),
            &["projectKey"],
        ),
        tool(
            "update_test_run_status",
            "Set the status of a test run",
            json!({
                "testRunId": { "type": "string" },
                "status": { "type": "string", "enum": statuses }
            }),
            &["testRunId", "status"],
        ),
    ];
    tools.extend(group_tools("plan", "Test plan"));
    tools.extend(group_tools("set", "Test set"));
    tools
}
