use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::api::XrayClient;
use crate::config::{self, XrayConfig};
use crate::output::{print_json, OutputOptions};

pub async fn run(output: &OutputOptions, check_api: bool) -> Result<()> {
    let config_path = config::config_file_path()?;
    let config_data = config::load_config()?;
    let env_profile = std::env::var("XRAY_PROFILE").ok().filter(|p| !p.is_empty());
    let env_credentials = ["XRAY_CLIENT_ID", "XRAY_CLIENT_SECRET"]
        .iter()
        .all(|name| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false));
    let profile = env_profile.clone().or_else(|| config_data.current.clone());

    let resolved = XrayConfig::resolve();
    let (configured, config_error) = match &resolved {
        Ok(_) => (true, None),
        Err(err) => (false, Some(format!("{:#}", err))),
    };
    let base_url = resolved.as_ref().ok().map(|c| c.base_url.clone());
    let jira_url = resolved.as_ref().ok().map(|c| c.jira_url.clone());

    let mut api_ok = None;
    let mut api_error = None;
    if check_api {
        let result = match resolved {
            Ok(config) => validate_api(config).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => api_ok = Some(true),
            Err(err) => {
                api_ok = Some(false);
                api_error = Some(format!("{:#}", err));
            }
        }
    }

    if output.is_json() {
        print_json(
            &json!({
                "config_path": config_path.to_string_lossy(),
                "profile": profile,
                "profiles": config_data.profiles.len(),
                "configured": configured,
                "config_error": config_error,
                "env_credentials": env_credentials,
                "env_profile": env_profile,
                "base_url": base_url,
                "jira_url": jira_url,
                "api_ok": api_ok,
                "api_error": api_error,
            }),
            output,
        )?;
        return Ok(());
    }

    println!("Config path: {}", config_path.display());
    println!("Profile: {}", profile.unwrap_or_else(|| "none".to_string()));
    println!("Profiles configured: {}", config_data.profiles.len());
    println!(
        "Configured: {}",
        if configured { "yes".green() } else { "no".red() }
    );
    if let Some(err) = config_error {
        println!("Config error: {}", err);
    }
    println!(
        "Env credentials override: {}",
        if env_credentials { "yes" } else { "no" }
    );
    println!(
        "Env profile override: {}",
        env_profile.unwrap_or_else(|| "none".to_string())
    );
    if let Some(base_url) = base_url {
        println!("Base URL: {}", base_url);
    }
    if let Some(jira_url) = jira_url {
        println!("Jira URL: {}", jira_url);
    }
    if let Some(api_ok) = api_ok {
        println!(
            "API check: {}",
            if api_ok { "ok".green() } else { "failed".red() }
        );
        if let Some(err) = api_error {
            println!("API error: {}", err);
        }
    }

    Ok(())
}

/// Authentication is the cheapest call that proves the credentials work.
async fn validate_api(config: XrayConfig) -> Result<()> {
    let client = XrayClient::new(config)?;
    client.ensure_token().await?;
    Ok(())
}
