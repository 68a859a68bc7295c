use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{Table, Tabled};

use crate::api::XrayClient;
use crate::output::{description_text, name_of, print_serialized, truncate, OutputOptions};
use crate::resources::DEFAULT_SEARCH_LIMIT;
use crate::types::{NewTestCase, SearchResults, TestCase, TestCaseUpdate, TestType};

#[derive(Subcommand)]
pub enum CaseCommands {
    /// Create a test case
    #[command(after_help = r#"EXAMPLES:
    xray-cli cases create -p TEST "Login works" --type manual --label smoke
    xray-cli cases create -p TEST "Checkout" -d "Pays with a card" --priority High"#)]
    Create {
        /// Summary of the new test
        summary: String,
        /// Jira project key
        #[arg(short, long)]
        project: String,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
        /// Test type: manual, cucumber or generic
        #[arg(short = 't', long = "type")]
        test_type: Option<TestType>,
        /// Label (repeatable)
        #[arg(short, long = "label")]
        labels: Vec<String>,
        /// Jira priority name
        #[arg(long)]
        priority: Option<String>,
    },
    /// Show a test case with its steps
    Get {
        /// Test issue key, e.g. TEST-123
        key: String,
    },
    /// Update a test case (always refused; see the message for alternatives)
    Update(UpdateArgs),
    /// Delete a test case
    #[command(alias = "rm")]
    Delete {
        key: String,
    },
    /// Search test cases with JQL
    Search {
        /// JQL query, sent to Xray unchanged
        jql: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// List test cases in a project
    #[command(alias = "ls")]
    Project {
        /// Jira project key
        project: String,
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
}

#[derive(Args)]
pub struct UpdateArgs {
    key: String,
    #[arg(long)]
    summary: Option<String>,
    #[arg(short, long)]
    description: Option<String>,
    #[arg(short = 't', long = "type")]
    test_type: Option<TestType>,
    #[arg(short, long = "label")]
    labels: Vec<String>,
    #[arg(long)]
    priority: Option<String>,
}

#[derive(Tabled)]
struct CaseRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Type")]
    test_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Steps")]
    steps: usize,
}

/// Update is refused before any configuration is read.
fn refuse_update(args: UpdateArgs) -> Result<()> {
    let update = TestCaseUpdate {
        summary: args.summary,
        description: args.description,
        test_type: args.test_type,
        labels: (!args.labels.is_empty()).then_some(args.labels),
        priority: args.priority,
    };
    XrayClient::update_test_case(&args.key, &update)?;
    Ok(())
}

pub async fn handle(cmd: CaseCommands, output: &OutputOptions) -> Result<()> {
    match cmd {
        CaseCommands::Update(args) => refuse_update(args),
        cmd => handle_with_client(cmd, &crate::connect()?, output).await,
    }
}

async fn handle_with_client(
    cmd: CaseCommands,
    client: &XrayClient,
    output: &OutputOptions,
) -> Result<()> {
    match cmd {
        CaseCommands::Create {
            summary,
            project,
            description,
            test_type,
            labels,
            priority,
        } => {
            let input = NewTestCase {
                project_key: project,
                summary,
                description,
                test_type,
                labels,
                priority,
            };
            let created = client.create_test_case(&input).await?;
            if output.is_json() {
                return print_serialized(&created, output);
            }
            println!(
                "{} Created test {} ({})",
                "+".green(),
                created.key.cyan(),
                created.id
            );
            println!("  {}", created.self_link.dimmed());
        }
        CaseCommands::Get { key } => {
            let test = client.get_test_case(&key).await?;
            if output.is_json() {
                return print_serialized(&test, output);
            }
            print_test_case(&test);
        }
        CaseCommands::Update(args) => refuse_update(args)?,
        CaseCommands::Delete { key } => {
            let deleted = client.delete_test_case(&key).await?;
            if output.is_json() {
                return print_serialized(&deleted, output);
            }
            println!("{} Deleted test {}", "+".green(), deleted.key.cyan());
        }
        CaseCommands::Search { jql, limit } => {
            let page = client.search_test_cases(&jql, limit).await?;
            print_cases(&page, output)?;
        }
        CaseCommands::Project { project, limit } => {
            let page = client.get_project_test_cases(&project, limit).await?;
            print_cases(&page, output)?;
        }
    }
    Ok(())
}

fn print_test_case(test: &TestCase) {
    let jira = &test.jira;
    println!(
        "{} {}",
        test.key().unwrap_or("-").cyan().bold(),
        jira.summary.as_deref().unwrap_or("").bold()
    );
    println!("{}", "-".repeat(50));
    println!("Issue ID: {}", test.issue_id);
    println!("Type:     {}", name_of(&test.test_type));
    println!("Status:   {}", name_of(&jira.status));
    println!("Priority: {}", name_of(&jira.priority));
    if !jira.labels.is_empty() {
        println!("Labels:   {}", jira.labels.join(", "));
    }
    if let Some(updated) = &jira.updated {
        println!("Updated:  {}", updated.dimmed());
    }
    if let Some(description) = description_text(jira) {
        println!("\n{}", "Description".bold());
        println!("{}", description);
    }
    if !test.steps.is_empty() {
        println!("\n{} ({}):", "Steps".bold(), test.steps.len());
        for (i, step) in test.steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step.action.as_deref().unwrap_or(""));
            if let Some(data) = step.data.as_deref().filter(|d| !d.is_empty()) {
                println!("     {} {}", "data:".dimmed(), data);
            }
            if let Some(result) = step.result.as_deref().filter(|r| !r.is_empty()) {
                println!("     {} {}", "expected:".dimmed(), result);
            }
        }
    }
}

fn print_cases(page: &SearchResults<TestCase>, output: &OutputOptions) -> Result<()> {
    if output.is_json() {
        return print_serialized(page, output);
    }
    if page.results.is_empty() {
        println!("No test cases found.");
        return Ok(());
    }

    let rows: Vec<CaseRow> = page
        .results
        .iter()
        .map(|t| CaseRow {
            key: t.key().unwrap_or("-").to_string(),
            test_type: name_of(&t.test_type).to_string(),
            status: name_of(&t.jira.status).to_string(),
            summary: truncate(t.jira.summary.as_deref().unwrap_or(""), 60),
            steps: t.steps.len(),
        })
        .collect();
    println!("{}", Table::new(rows));
    println!("\n{} of {} test cases", page.results.len(), page.total);
    Ok(())
}
