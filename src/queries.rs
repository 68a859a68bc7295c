//! GraphQL documents sent to Xray Cloud, one per operation.
//!
//! Documents carry no per-call data. Every value goes through `variables`.

/// Jira fields requested for full issue records.
macro_rules! jira_fields {
    () => {
        r#"jira(fields: ["key", "summary", "description", "status", "priority", "labels", "created", "updated"])"#
    };
}

// -- tests ----------------------------------------------------------------

pub const CREATE_TEST: &str = r#"
    mutation CreateTest($testType: UpdateTestTypeInput, $jira: JSON!) {
        createTest(testType: $testType, jira: $jira) {
            test {
                issueId
                testType { name }
                jira(fields: ["key"])
            }
            warnings
        }
    }
"#;

pub const GET_TESTS: &str = concat!(
    r#"
    query GetTests($jql: String, $limit: Int!) {
        getTests(jql: $jql, limit: $limit) {
            total
            start
            limit
            results {
                issueId
                testType { name }
                steps { id action data result }
                "#,
    jira_fields!(),
    r#"
            }
        }
    }
"#
);

pub const DELETE_TEST: &str = r#"
    mutation DeleteTest($issueId: String!) {
        deleteTest(issueId: $issueId)
    }
"#;

// -- test executions ------------------------------------------------------

pub const CREATE_TEST_EXECUTION: &str = r#"
    mutation CreateTestExecution($testIssueIds: [String], $testEnvironments: [String], $jira: JSON!) {
        createTestExecution(testIssueIds: $testIssueIds, testEnvironments: $testEnvironments, jira: $jira) {
            testExecution {
                issueId
                jira(fields: ["key"])
                testRuns(limit: 100) {
                    total
                    results {
                        id
                        status { name }
                        test { issueId }
                    }
                }
            }
            warnings
            createdTestEnvironments
        }
    }
"#;

pub const GET_TEST_EXECUTIONS: &str = concat!(
    r#"
    query GetTestExecutions($jql: String, $limit: Int!) {
        getTestExecutions(jql: $jql, limit: $limit) {
            total
            start
            limit
            results {
                issueId
                testEnvironments
                "#,
    jira_fields!(),
    r#"
                tests(limit: 100) {
                    total
                    results {
                        issueId
                        jira(fields: ["key", "summary"])
                    }
                }
                testRuns(limit: 100) {
                    total
                    results {
                        id
                        status { name }
                        test {
                            issueId
                            jira(fields: ["key", "summary"])
                        }
                        startedOn
                        finishedOn
                        executedById
                        comment
                    }
                }
            }
        }
    }
"#
);

pub const UPDATE_TEST_RUN_STATUS: &str = r#"
    mutation UpdateTestRunStatus($id: String!, $status: String!) {
        updateTestRunStatus(id: $id, status: $status)
    }
"#;

// -- test plans -----------------------------------------------------------

pub const CREATE_TEST_PLAN: &str = r#"
    mutation CreateTestPlan($testIssueIds: [String], $jira: JSON!) {
        createTestPlan(testIssueIds: $testIssueIds, jira: $jira) {
            testPlan {
                issueId
                jira(fields: ["key"])
            }
            warnings
        }
    }
"#;

pub const GET_TEST_PLANS: &str = concat!(
    r#"
    query GetTestPlans($jql: String, $limit: Int!) {
        getTestPlans(jql: $jql, limit: $limit) {
            total
            start
            limit
            results {
                issueId
                "#,
    jira_fields!(),
    r#"
                tests(limit: 100) {
                    total
                    results {
                        issueId
                        jira(fields: ["key", "summary"])
                    }
                }
            }
        }
    }
"#
);

pub const ADD_TESTS_TO_TEST_PLAN: &str = r#"
    mutation AddTestsToTestPlan($issueId: String!, $testIssueIds: [String]!) {
        addTestsToTestPlan(issueId: $issueId, testIssueIds: $testIssueIds) {
            addedTests
            warning
        }
    }
"#;

pub const REMOVE_TESTS_FROM_TEST_PLAN: &str = r#"
    mutation RemoveTestsFromTestPlan($issueId: String!, $testIssueIds: [String]!) {
        removeTestsFromTestPlan(issueId: $issueId, testIssueIds: $testIssueIds) {
            removedTests
            warning
        }
    }
"#;

// -- test sets ------------------------------------------------------------

pub const CREATE_TEST_SET: &str = r#"
    mutation CreateTestSet($testIssueIds: [String], $jira: JSON!) {
        createTestSet(testIssueIds: $testIssueIds, jira: $jira) {
            testSet {
                issueId
                jira(fields: ["key"])
            }
            warnings
        }
    }
"#;

pub const GET_TEST_SETS: &str = concat!(
    r#"
    query GetTestSets($jql: String, $limit: Int!) {
        getTestSets(jql: $jql, limit: $limit) {
            total
            start
            limit
            results {
                issueId
                "#,
    jira_fields!(),
    r#"
                tests(limit: 100) {
                    total
                    results {
                        issueId
                        jira(fields: ["key", "summary"])
                    }
                }
            }
        }
    }
"#
);

pub const ADD_TESTS_TO_TEST_SET: &str = r#"
    mutation AddTestsToTestSet($issueId: String!, $testIssueIds: [String]!) {
        addTestsToTestSet(issueId: $issueId, testIssueIds: $testIssueIds) {
            addedTests
            warning
        }
    }
"#;

pub const REMOVE_TESTS_FROM_TEST_SET: &str = r#"
    mutation RemoveTestsFromTestSet($issueId: String!, $testIssueIds: [String]!) {
        removeTestsFromTestSet(issueId: $issueId, testIssueIds: $testIssueIds) {
            removedTests
            warning
        }
    }
"#;
