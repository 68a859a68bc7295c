use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use tabled::{Table, Tabled};

use crate::api::XrayClient;
use crate::output::{colored_status, description_text, print_json, print_serialized, truncate, OutputOptions};
use crate::resources::DEFAULT_SEARCH_LIMIT;
use crate::types::{NewTestExecution, RunStatus, SearchResults, TestExecution, TestRun};

#[derive(Subcommand)]
pub enum ExecutionCommands {
    /// Create a test execution; Xray adds one test run per test
    #[command(after_help = r#"EXAMPLES:
    xray-cli executions create -p TEST "Sprint 12 regression" --test 10001 --test 10002
    xray-cli executions create -p TEST "Nightly" --env chrome --env android"#)]
    Create {
        summary: String,
        /// Jira project key
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Test issue id to include (repeatable)
        #[arg(long = "test")]
        tests: Vec<String>,
        /// Test environment (repeatable)
        #[arg(long = "env")]
        environments: Vec<String>,
    },
    /// Show an execution and its test runs
    Get {
        key: String,
    },
    /// Search executions with JQL
    Search {
        jql: String,
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// List executions in a project
    #[command(alias = "ls")]
    Project {
        project: String,
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// Set the status of a test run
    #[command(after_help = r#"EXAMPLES:
    xray-cli executions run-status 5acc7ab0a3fe1b6fcdc3c737 PASS
    xray-cli executions run-status 5acc7ab0a3fe1b6fcdc3c737 failed"#)]
    RunStatus {
        /// Test run id (from `executions get`)
        run_id: String,
        /// TODO, EXECUTING, PASS, FAIL, ABORTED, PASSED or FAILED
        status: RunStatus,
    },
}

#[derive(Tabled)]
struct ExecutionRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Tests")]
    tests: String,
    #[tabled(rename = "Environments")]
    environments: String,
}

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Run ID")]
    id: String,
    #[tabled(rename = "Test")]
    test: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Finished")]
    finished: String,
}

pub async fn handle(
    cmd: ExecutionCommands,
    client: &XrayClient,
    output: &OutputOptions,
) -> Result<()> {
    match cmd {
        ExecutionCommands::Create {
            summary,
            project,
            description,
            tests,
            environments,
        } => {
            let input = NewTestExecution {
                project_key: project,
                summary,
                description,
                test_issue_ids: tests,
                test_environments: environments,
            };
            let created = client.create_test_execution(&input).await?;
            if output.is_json() {
                return print_serialized(&created, output);
            }
            println!(
                "{} Created test execution {} ({}) with {} test runs",
                "+".green(),
                created.key.cyan(),
                created.issue_id,
                created.test_runs.len()
            );
            print_runs(&created.test_runs);
        }
        ExecutionCommands::Get { key } => {
            let execution = client.get_test_execution(&key).await?;
            if output.is_json() {
                return print_serialized(&execution, output);
            }
            print_execution(&execution);
        }
        ExecutionCommands::Search { jql, limit } => {
            let page = client.search_test_executions(&jql, limit).await?;
            print_executions(&page, output)?;
        }
        ExecutionCommands::Project { project, limit } => {
            let page = client.get_project_test_executions(&project, limit).await?;
            print_executions(&page, output)?;
        }
        ExecutionCommands::RunStatus { run_id, status } => {
            let message = client.update_test_run_status(&run_id, status).await?;
            if output.is_json() {
                return print_json(
                    &serde_json::json!({ "id": run_id, "status": status, "message": message }),
                    output,
                );
            }
            println!(
                "{} Test run {} set to {}",
                "+".green(),
                run_id,
                colored_status(status.as_str())
            );
            if !message.is_empty() {
                println!("  {}", message.dimmed());
            }
        }
    }
    Ok(())
}

fn print_execution(execution: &TestExecution) {
    let jira = &execution.jira;
    println!(
        "{} {}",
        execution.key().unwrap_or("-").cyan().bold(),
        jira.summary.as_deref().unwrap_or("").bold()
    );
    println!("{}", "-".repeat(50));
    println!("Issue ID:     {}", execution.issue_id);
    if !execution.test_environments.is_empty() {
        println!("Environments: {}", execution.test_environments.join(", "));
    }
    if let Some(description) = description_text(jira) {
        println!("\n{}", description);
    }
    let total = execution
        .test_runs
        .total
        .unwrap_or(execution.test_runs.results.len() as u64);
    println!("\n{} ({}):", "Test runs".bold(), total);
    print_runs(&execution.test_runs.results);
}

fn print_runs(runs: &[TestRun]) {
    if runs.is_empty() {
        return;
    }
    let rows: Vec<RunRow> = runs
        .iter()
        .map(|run| RunRow {
            id: run.id.clone(),
            test: run
                .test
                .as_ref()
                .and_then(|t| t.jira.key.clone())
                .unwrap_or_else(|| "-".to_string()),
            status: colored_status(run.status_name().unwrap_or("-")).to_string(),
            finished: run.finished_on.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn print_executions(page: &SearchResults<TestExecution>, output: &OutputOptions) -> Result<()> {
    if output.is_json() {
        return print_serialized(page, output);
    }
    if page.results.is_empty() {
        println!("No test executions found.");
        return Ok(());
    }

    let rows: Vec<ExecutionRow> = page
        .results
        .iter()
        .map(|e| ExecutionRow {
            key: e.key().unwrap_or("-").to_string(),
            summary: truncate(e.jira.summary.as_deref().unwrap_or(""), 50),
            tests: e
                .test_runs
                .total
                .or(e.tests.total)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            environments: e.test_environments.join(", "),
        })
        .collect();
    println!("{}", Table::new(rows));
    println!("\n{} of {} test executions", page.results.len(), page.total);
    Ok(())
}
