use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use tabled::{Table, Tabled};

use crate::api::XrayClient;
use crate::output::{description_text, print_serialized, truncate, OutputOptions};
use crate::resources::{GroupKind, DEFAULT_SEARCH_LIMIT};
use crate::types::{NewTestGroup, SearchResults, TestGroup};

/// Shared by `plans` and `sets`.
#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a new group of tests
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
    },
    /// Show details and associated tests
    Get {
        key: String,
    },
    /// Search with JQL
    Search {
        jql: String,
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// List everything in a project
    #[command(alias = "ls")]
    Project {
        project: String,
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// Associate tests by issue id
    AddTests {
        /// Issue id of the plan or set
        issue_id: String,
        /// Test issue ids
        #[arg(required = true)]
        tests: Vec<String>,
    },
    /// Remove tests by issue id
    RemoveTests {
        issue_id: String,
        #[arg(required = true)]
        tests: Vec<String>,
    },
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Issue ID")]
    issue_id: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Tests")]
    tests: String,
}

pub async fn handle(
    kind: GroupKind,
    cmd: GroupCommands,
    client: &XrayClient,
    output: &OutputOptions,
) -> Result<()> {
    let label = kind.label();
    match cmd {
        GroupCommands::Create {
            summary,
            project,
            description,
            tests,
        } => {
            let input = NewTestGroup {
                project_key: project,
                summary,
                description,
                test_issue_ids: tests,
            };
            let created = client.create_test_group(kind, &input).await?;
            if output.is_json() {
                return print_serialized(&created, output);
            }
            println!(
                "{} Created {} {} ({})",
                "+".green(),
                label.to_lowercase(),
                created.key.cyan(),
                created.issue_id
            );
            for warning in &created.warnings {
                println!("  {} {}", "!".yellow(), warning);
            }
        }
        GroupCommands::Get { key } => {
            let group = client.get_test_group(kind, &key).await?;
            if output.is_json() {
                return print_serialized(&group, output);
            }
            print_group(&group);
        }
        GroupCommands::Search { jql, limit } => {
            let page = client.search_test_groups(kind, &jql, limit).await?;
            print_groups(label, &page, output)?;
        }
        GroupCommands::Project { project, limit } => {
            let page = client.get_project_test_groups(kind, &project, limit).await?;
            print_groups(label, &page, output)?;
        }
        GroupCommands::AddTests { issue_id, tests } => {
            let added = client.add_tests_to_group(kind, &issue_id, &tests).await?;
            if output.is_json() {
                return print_serialized(&added, output);
            }
            println!(
                "{} Added {} tests to {} {}",
                "+".green(),
                added.added_tests.len(),
                label.to_lowercase(),
                issue_id
            );
            if let Some(warning) = &added.warning {
                println!("  {} {}", "!".yellow(), warning);
            }
        }
        GroupCommands::RemoveTests { issue_id, tests } => {
            let removed = client
                .remove_tests_from_group(kind, &issue_id, &tests)
                .await?;
            if output.is_json() {
                return print_serialized(&removed, output);
            }
            println!(
                "{} Removed {} tests from {} {}",
                "+".green(),
                removed.removed_tests.len(),
                label.to_lowercase(),
                issue_id
            );
            if let Some(warning) = &removed.warning {
                println!("  {} {}", "!".yellow(), warning);
            }
        }
    }
    Ok(())
}

fn print_group(group: &TestGroup) {
    let jira = &group.jira;
    println!(
        "{} {}",
        group.key().unwrap_or("-").cyan().bold(),
        jira.summary.as_deref().unwrap_or("").bold()
    );
    println!("{}", "-".repeat(50));
    println!("Issue ID: {}", group.issue_id);
    if let Some(description) = description_text(jira) {
        println!("\n{}", description);
    }

    let total = group.tests.total.unwrap_or(group.tests.results.len() as u64);
    println!("\n{} ({}):", "Tests".bold(), total);
    for test in &group.tests.results {
        println!(
            "  {} {}",
            test.jira.key.as_deref().unwrap_or(&test.issue_id).cyan(),
            test.jira.summary.as_deref().unwrap_or("").dimmed()
        );
    }
}

fn print_groups(label: &str, page: &SearchResults<TestGroup>, output: &OutputOptions) -> Result<()> {
    if output.is_json() {
        return print_serialized(page, output);
    }
    if page.results.is_empty() {
        println!("No {}s found.", label.to_lowercase());
        return Ok(());
    }

    let rows: Vec<GroupRow> = page
        .results
        .iter()
        .map(|g| GroupRow {
            key: g.key().unwrap_or("-").to_string(),
            issue_id: g.issue_id.clone(),
            summary: truncate(g.jira.summary.as_deref().unwrap_or(""), 50),
            tests: g
                .tests
                .total
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    println!("{}", Table::new(rows));
    println!(
        "\n{} of {} {}s",
        page.results.len(),
        page.total,
        label.to_lowercase()
    );
    Ok(())
}
