use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[cfg(unix)]
use std::io::Write;

use crate::error::XrayError;

pub const DEFAULT_BASE_URL: &str = "https://xray.cloud.getxray.app";
/// Only used to build browse links for created tests.
pub const DEFAULT_JIRA_URL: &str = "https://your-domain.atlassian.net";

const ENV_CLIENT_ID: &str = "XRAY_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "XRAY_CLIENT_SECRET";
const ENV_BASE_URL: &str = "XRAY_BASE_URL";
const ENV_JIRA_URL: &str = "XRAY_JIRA_URL";
const ENV_PROFILE: &str = "XRAY_PROFILE";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    pub current: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Validated settings for one `XrayClient`.
#[derive(Debug, Clone)]
pub struct XrayConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub jira_url: String,
}

impl XrayConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            jira_url: DEFAULT_JIRA_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_jira_url(mut self, jira_url: impl Into<String>) -> Self {
        self.jira_url = jira_url.into();
        self
    }

    pub fn validate(&self) -> Result<(), XrayError> {
        if self.client_id.trim().is_empty() {
            return Err(XrayError::InvalidInput("client id is required".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(XrayError::InvalidInput(
                "client secret is required".to_string(),
            ));
        }
        for (name, value) in [("base URL", &self.base_url), ("Jira URL", &self.jira_url)] {
            url::Url::parse(value)
                .map_err(|e| XrayError::InvalidInput(format!("invalid {} '{}': {}", name, value, e)))?;
        }
        Ok(())
    }

    pub fn auth_url(&self) -> String {
        format!("{}/api/v2/authenticate", self.base_url.trim_end_matches('/'))
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/api/v2/graphql", self.base_url.trim_end_matches('/'))
    }

    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.jira_url.trim_end_matches('/'), key)
    }

    /// Resolve settings from the environment, falling back to the config file.
    pub fn resolve() -> Result<Self> {
        let file = load_config()?;
        Self::resolve_from(&file, |name| {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        })
    }

    fn resolve_from<F>(file: &ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile_name = env(ENV_PROFILE).or_else(|| file.current.clone());
        let profile = match profile_name.as_deref() {
            Some(name) => file.profiles.get(name),
            None => None,
        };

        let client_id = env(ENV_CLIENT_ID)
            .or_else(|| profile.map(|p| p.client_id.clone()))
            .context(
                "No Xray credentials. Set XRAY_CLIENT_ID/XRAY_CLIENT_SECRET or run: xray-cli config set-credentials",
            )?;
        let client_secret = env(ENV_CLIENT_SECRET)
            .or_else(|| profile.map(|p| p.client_secret.clone()))
            .context("No Xray client secret. Set XRAY_CLIENT_SECRET")?;

        let mut config = XrayConfig::new(client_id, client_secret);
        if let Some(base_url) = env(ENV_BASE_URL).or_else(|| profile.and_then(|p| p.base_url.clone())) {
            config = config.with_base_url(base_url);
        }
        if let Some(jira_url) = env(ENV_JIRA_URL).or_else(|| profile.and_then(|p| p.jira_url.clone())) {
            config = config.with_jira_url(jira_url);
        }

        config.validate()?;
        Ok(config)
    }
}

fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not find config directory")?
        .join("xray-cli");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.toml"))
}

pub fn config_file_path() -> Result<PathBuf> {
    config_path()
}

pub fn load_config() -> Result<ConfigFile> {
    let path = config_path()?;
    if path.exists() {
        let content = fs::read_to_string(&path)?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    } else {
        Ok(ConfigFile::default())
    }
}

pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path()?;
    let content = toml::to_string_pretty(config)?;

    // Write to temp file then rename for atomicity
    let dir = path.parent().context("Config path has no parent directory")?;
    let temp_path = dir.join(".config.toml.tmp");

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
    }

    #[cfg(not(unix))]
    {
        fs::write(&temp_path, &content)?;
    }

    fs::rename(&temp_path, &path).context("Failed to atomically update config file")?;
    Ok(())
}

/// Store credentials under `name` and make it current if nothing is selected yet.
pub fn set_credentials(name: &str, profile: Profile) -> Result<()> {
    XrayConfig {
        client_id: profile.client_id.clone(),
        client_secret: profile.client_secret.clone(),
        base_url: profile.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        jira_url: profile.jira_url.clone().unwrap_or_else(|| DEFAULT_JIRA_URL.to_string()),
    }
    .validate()?;

    let mut config = load_config()?;
    config.profiles.insert(name.to_string(), profile);
    if config.current.is_none() {
        config.current = Some(name.to_string());
    }
    save_config(&config)
}

pub fn use_profile(name: &str) -> Result<()> {
    let mut config = load_config()?;
    if !config.profiles.contains_key(name) {
        anyhow::bail!(
            "Profile '{}' not found. Run: xray-cli config profiles",
            name
        );
    }
    config.current = Some(name.to_string());
    save_config(&config)?;
    println!("Switched to profile '{}'", name);
    Ok(())
}

pub fn list_profiles() -> Result<()> {
    let config = load_config()?;
    if config.profiles.is_empty() {
        println!("No profiles configured. Run: xray-cli config set-credentials");
        return Ok(());
    }

    let mut names: Vec<&String> = config.profiles.keys().collect();
    names.sort();
    for name in names {
        let marker = if config.current.as_ref() == Some(name) { "*" } else { " " };
        println!("{} {}", marker, name);
    }
    Ok(())
}

pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

pub fn show_config() -> Result<()> {
    let config = load_config()?;
    let path = config_path()?;

    println!("Config file: {}", path.display());
    println!();

    match config.current.as_ref().and_then(|c| config.profiles.get(c).map(|p| (c, p))) {
        Some((name, profile)) => {
            println!("Current profile: {}", name);
            println!("Client ID: {}", profile.client_id);
            println!("Client secret: {}", mask_secret(&profile.client_secret));
            println!(
                "Base URL: {}",
                profile.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
            );
            println!(
                "Jira URL: {}",
                profile.jira_url.as_deref().unwrap_or(DEFAULT_JIRA_URL)
            );
        }
        None => println!("No profile selected."),
    }

    for name in [ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_BASE_URL, ENV_JIRA_URL, ENV_PROFILE] {
        if std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false) {
            println!("{} is set (overrides config file)", name);
        }
    }

    Ok(())
}
