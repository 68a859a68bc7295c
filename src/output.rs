use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::Value;

use crate::error::XrayError;
use crate::types::{JiraFields, NamedRef};

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// Display results as formatted tables (default)
    #[default]
    Table,
    /// Display results as raw JSON
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub compact: bool,
}

impl OutputOptions {
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

pub fn print_json(value: &Value, output: &OutputOptions) -> Result<()> {
    let text = if output.compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", text);
    Ok(())
}

pub fn print_serialized<T: Serialize>(value: &T, output: &OutputOptions) -> Result<()> {
    print_json(&serde_json::to_value(value)?, output)
}

/// Errors go to stderr; JSON mode keeps them machine readable.
pub fn print_error(err: &anyhow::Error, output: &OutputOptions) {
    if output.is_json() {
        let body = match err.downcast_ref::<XrayError>() {
            Some(xray) => xray.to_json(),
            None => serde_json::json!({
                "error": true,
                "kind": "general",
                "message": format!("{:#}", err),
            }),
        };
        eprintln!("{}", body);
    } else {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
    }
}

pub fn truncate(value: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    if max_len <= 3 {
        return value.chars().take(max_len).collect();
    }
    let truncated: String = value.chars().take(max_len - 3).collect();
    format!("{}...", truncated)
}

pub fn name_of(named: &Option<NamedRef>) -> &str {
    named
        .as_ref()
        .and_then(|n| n.name.as_deref())
        .unwrap_or("-")
}

/// Jira descriptions come back either as text or as an Atlassian document.
pub fn description_text(jira: &JiraFields) -> Option<String> {
    match jira.description.as_ref()? {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        doc => {
            let mut out = String::new();
            collect_text(doc, &mut out);
            let out = out.trim().to_string();
            (!out.is_empty()).then_some(out)
        }
    }
}

fn collect_text(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(|t| t.as_str()) {
        out.push_str(text);
    }
    if let Some(children) = node.get("content").and_then(|c| c.as_array()) {
        for child in children {
            collect_text(child, out);
        }
        if node.get("type").and_then(|t| t.as_str()) == Some("paragraph") {
            out.push('\n');
        }
    }
}

pub fn colored_status(status: &str) -> ColoredString {
    match status.to_uppercase().as_str() {
        "PASS" | "PASSED" => status.green(),
        "FAIL" | "FAILED" | "ABORTED" => status.red(),
        "EXECUTING" => status.yellow(),
        "TODO" => status.dimmed(),
        _ => status.normal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer summary", 10), "a longe...");
        assert_eq!(truncate("abcdef", 2), "ab");
        assert_eq!(truncate("ünïcödé text", 6), "ünï...");
    }

    #[test]
    fn test_description_plain_text() {
        let jira: JiraFields = serde_json::from_value(json!({ "description": "Checks login" })).unwrap();
        assert_eq!(description_text(&jira).as_deref(), Some("Checks login"));
    }

    #[test]
    fn test_description_document() {
        let jira: JiraFields = serde_json::from_value(json!({ "description": {
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": "First" }] },
                { "type": "paragraph", "content": [{ "type": "text", "text": "Second" }] }
            ]
        } }))
        .unwrap();
        assert_eq!(description_text(&jira).as_deref(), Some("First\nSecond"));
    }

    #[test]
    fn test_description_missing() {
        let jira = JiraFields::default();
        assert!(description_text(&jira).is_none());
    }

    #[test]
    fn test_name_of() {
        assert_eq!(name_of(&None), "-");
        assert_eq!(
            name_of(&Some(NamedRef {
                name: Some("Manual".to_string())
            })),
            "Manual"
        );
    }
}
