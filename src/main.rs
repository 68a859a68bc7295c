mod api;
mod auth;
mod commands;
mod config;
mod error;
mod mcp;
mod output;
mod queries;
mod resources;
#[cfg(test)]
mod testing;
mod tools;
mod types;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use api::XrayClient;
use commands::{cases, doctor, executions, groups};
use config::XrayConfig;
use error::XrayError;
use output::{print_error, OutputFormat, OutputOptions};
use resources::GroupKind;

#[derive(Parser)]
#[command(name = "xray-cli")]
#[command(about = "Manage Xray Cloud test cases, executions, plans and sets from your terminal or an MCP client")]
#[command(version)]
#[command(after_help = r#"QUICK START:
    1. Create an API key pair in Jira: Apps > Xray > Settings > API Keys
    2. Configure the CLI:
       xray-cli config set-credentials CLIENT_ID CLIENT_SECRET --jira-url https://acme.atlassian.net
    3. List test cases:
       xray-cli cases project TEST
    4. Serve the tools to an MCP client:
       xray-cli serve

For more info on a command, run: xray-cli <command> --help"#)]
struct Cli {
    /// Output format (table or json)
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Single-line JSON output
    #[arg(long, global = true)]
    compact: bool,

    /// Debug logging on stderr (XRAY_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage test cases - create, view, search, delete
    #[command(alias = "c")]
    #[command(after_help = r#"EXAMPLES:
    xray-cli cases get TEST-123                    # View a test with its steps
    xray-cli c project TEST --limit 20             # List tests in a project
    xray-cli c search "labels = smoke"             # Search with JQL
    xray-cli c create -p TEST "Login works"        # Create a manual test"#)]
    Cases {
        #[command(subcommand)]
        action: cases::CaseCommands,
    },
    /// Manage test executions and test run statuses
    #[command(alias = "e")]
    #[command(after_help = r#"EXAMPLES:
    xray-cli executions get TEST-200               # Show runs and their statuses
    xray-cli e create -p TEST "Regression" --test 10001
    xray-cli e run-status RUN_ID PASS              # Record a result"#)]
    Executions {
        #[command(subcommand)]
        action: executions::ExecutionCommands,
    },
    /// Manage test plans
    #[command(alias = "p")]
    #[command(after_help = r#"EXAMPLES:
    xray-cli plans project TEST                    # List plans
    xray-cli p add-tests 30001 10001 10002         # Add tests by issue id"#)]
    Plans {
        #[command(subcommand)]
        action: groups::GroupCommands,
    },
    /// Manage test sets
    #[command(alias = "s")]
    #[command(after_help = r#"EXAMPLES:
    xray-cli sets get TEST-400                     # Show a set and its tests
    xray-cli s remove-tests 40001 10002            # Remove a test by issue id"#)]
    Sets {
        #[command(subcommand)]
        action: groups::GroupCommands,
    },
    /// Run an MCP server on stdio exposing the Xray tools
    #[command(after_help = r#"EXAMPLE (MCP client configuration):
    { "command": "xray-cli", "args": ["serve"],
      "env": { "XRAY_CLIENT_ID": "...", "XRAY_CLIENT_SECRET": "..." } }"#)]
    Serve,
    /// Check configuration and connectivity
    Doctor {
        /// Also authenticate against Xray
        #[arg(long)]
        check_api: bool,
    },
    /// Configure credentials and profiles
    #[command(after_help = r#"EXAMPLES:
    xray-cli config set-credentials ID SECRET      # Save the default profile
    xray-cli config set-credentials ID SECRET --name staging --base-url https://eu.xray.cloud.getxray.app
    xray-cli config use staging                    # Switch profile
    xray-cli config show                           # Show configuration"#)]
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Save an Xray client id and secret
    SetCredentials {
        client_id: String,
        client_secret: String,
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,
        /// Xray Cloud base URL (regional instances)
        #[arg(long)]
        base_url: Option<String>,
        /// Jira site URL used for browse links
        #[arg(long)]
        jira_url: Option<String>,
    },
    /// Show current configuration
    Show,
    /// Switch to a different profile
    #[command(alias = "switch")]
    Use {
        name: String,
    },
    /// List profiles
    #[command(alias = "list")]
    Profiles,
    /// Generate shell completions
    #[command(after_help = r#"EXAMPLES:
    xray-cli config completions bash > ~/.bash_completion.d/xray-cli
    xray-cli config completions zsh > ~/.zfunc/_xray-cli"#)]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("XRAY_LOG")
                .from_env_lossy(),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = OutputOptions {
        format: cli.output,
        compact: cli.compact,
    };

    if let Err(e) = run_command(cli.command, &output).await {
        print_error(&e, &output);
        std::process::exit(exit_code(&e) as i32);
    }
}

/// 1=general error, 2=not found, 3=auth error
fn exit_code(e: &anyhow::Error) -> u8 {
    e.downcast_ref::<XrayError>()
        .map(XrayError::exit_code)
        .unwrap_or(1)
}

fn connect() -> Result<XrayClient> {
    Ok(XrayClient::new(XrayConfig::resolve()?)?)
}

async fn run_command(command: Commands, output: &OutputOptions) -> Result<()> {
    match command {
        Commands::Cases { action } => cases::handle(action, output).await?,
        Commands::Executions { action } => {
            executions::handle(action, &connect()?, output).await?
        }
        Commands::Plans { action } => {
            groups::handle(GroupKind::Plan, action, &connect()?, output).await?
        }
        Commands::Sets { action } => {
            groups::handle(GroupKind::Set, action, &connect()?, output).await?
        }
        Commands::Serve => mcp::serve_stdio(&connect()?).await?,
        Commands::Doctor { check_api } => doctor::run(output, check_api).await?,
        Commands::Config { action } => match action {
            ConfigCommands::SetCredentials {
                client_id,
                client_secret,
                name,
                base_url,
                jira_url,
            } => {
                config::set_credentials(
                    &name,
                    config::Profile {
                        client_id,
                        client_secret,
                        base_url,
                        jira_url,
                    },
                )?;
                println!("Credentials saved to profile '{}'", name);
            }
            ConfigCommands::Show => config::show_config()?,
            ConfigCommands::Use { name } => config::use_profile(&name)?,
            ConfigCommands::Profiles => config::list_profiles()?,
            ConfigCommands::Completions { shell } => {
                let mut cmd = Cli::command();
                generate(shell, &mut cmd, "xray-cli", &mut std::io::stdout());
            }
        },
    }

    Ok(())
}
