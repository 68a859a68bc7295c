//! Typed structs for Xray Cloud API payloads.
//!
//! Xray returns the Jira side of every issue as an open-ended `jira` object. The fields we
//! request are enumerated on [`JiraFields`]; anything else the vendor sends is kept in its
//! `extra` map so a new vendor field is carried through instead of being dropped.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::XrayError;

/// Treat an explicit `null` the same as a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Xray test type. Parsed case-insensitively from both CLI flags and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum TestType {
    Manual,
    Cucumber,
    Generic,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Manual => "Manual",
            TestType::Cucumber => "Cucumber",
            TestType::Generic => "Generic",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = XrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(TestType::Manual),
            "cucumber" => Ok(TestType::Cucumber),
            "generic" => Ok(TestType::Generic),
            _ => Err(XrayError::InvalidInput(format!(
                "Unknown test type '{}'. Use Manual, Cucumber or Generic",
                s
            ))),
        }
    }
}

impl TryFrom<String> for TestType {
    type Error = XrayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Test run status accepted by `updateTestRunStatus`.
///
/// PASS/PASSED and FAIL/FAILED are distinct values here. They are sent to Xray exactly as
/// given; Xray decides which names are canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Todo,
    Executing,
    Pass,
    Fail,
    Aborted,
    Passed,
    Failed,
}

impl RunStatus {
    pub const ALL: [RunStatus; 7] = [
        RunStatus::Todo,
        RunStatus::Executing,
        RunStatus::Pass,
        RunStatus::Fail,
        RunStatus::Aborted,
        RunStatus::Passed,
        RunStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Todo => "TODO",
            RunStatus::Executing => "EXECUTING",
            RunStatus::Pass => "PASS",
            RunStatus::Fail => "FAIL",
            RunStatus::Aborted => "ABORTED",
            RunStatus::Passed => "PASSED",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = XrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RunStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = RunStatus::ALL.iter().map(|s| s.as_str()).collect();
                XrayError::InvalidInput(format!(
                    "Unknown test run status '{}'. Use one of: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// `{ name }` reference used for status, priority and test type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// The Jira half of an Xray issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Plain text or an Atlassian document, depending on the Jira instance.
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub priority: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A manual test step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub issue_id: String,
    #[serde(default)]
    pub test_type: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_default")]
    pub steps: Vec<TestStep>,
    #[serde(default, deserialize_with = "null_default")]
    pub jira: JiraFields,
}

impl TestCase {
    pub fn key(&self) -> Option<&str> {
        self.jira.key.as_deref()
    }
}

/// Nested `{ total, results }` collection inside an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default = "Vec::new", deserialize_with = "null_default")]
    pub results: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            total: None,
            results: Vec::new(),
        }
    }
}

/// Reference to a test from inside an execution, plan or set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRef {
    pub issue_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub jira: JiraFields,
}

/// One test's run inside a test execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub id: String,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub test: Option<TestRef>,
    #[serde(default)]
    pub started_on: Option<String>,
    #[serde(default)]
    pub finished_on: Option<String>,
    #[serde(default)]
    pub executed_by_id: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl TestRun {
    pub fn status_name(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.name.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecution {
    pub issue_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub jira: JiraFields,
    #[serde(default, deserialize_with = "null_default")]
    pub test_environments: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub tests: Connection<TestRef>,
    #[serde(default, deserialize_with = "null_default")]
    pub test_runs: Connection<TestRun>,
}

impl TestExecution {
    pub fn key(&self) -> Option<&str> {
        self.jira.key.as_deref()
    }
}

/// A test plan or a test set. Both carry the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestGroup {
    pub issue_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub jira: JiraFields,
    #[serde(default, deserialize_with = "null_default")]
    pub tests: Connection<TestRef>,
}

impl TestGroup {
    pub fn key(&self) -> Option<&str> {
        self.jira.key.as_deref()
    }
}

/// Page of search results. `results.len()` may be smaller than `total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct SearchResults<T> {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default = "Vec::new", deserialize_with = "null_default")]
    pub results: Vec<T>,
}

// -- inputs ---------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestCase {
    pub project_key: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_type: Option<TestType>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// Fields a caller may ask to change on a test case. Never applied; see
/// `XrayClient::update_test_case`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseUpdate {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_type: Option<TestType>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestExecution {
    pub project_key: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_issue_ids: Vec<String>,
    #[serde(default)]
    pub test_environments: Vec<String>,
}

/// Input for creating a test plan or a test set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestGroup {
    pub project_key: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_issue_ids: Vec<String>,
}

// -- results --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedTestCase {
    pub id: String,
    pub key: String,
    /// Browse link built from the configured Jira URL, not returned by Xray.
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTestCase {
    pub issue_id: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTestExecution {
    pub issue_id: String,
    pub key: String,
    pub test_runs: Vec<TestRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTestGroup {
    pub issue_id: String,
    pub key: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestsAdded {
    #[serde(default, deserialize_with = "null_default")]
    pub added_tests: Vec<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestsRemoved {
    #[serde(default, deserialize_with = "null_default")]
    pub removed_tests: Vec<String>,
    #[serde(default)]
    pub warning: Option<String>,
}
