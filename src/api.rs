use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::auth::{self, BearerToken};
use crate::config::XrayConfig;
use crate::error::{Result, XrayError};

/// Client for the Xray Cloud GraphQL API.
///
/// Holds the credentials and the cached bearer token. The token is fetched on the first call
/// and reused until it expires. Every request is a single attempt.
pub struct XrayClient {
    http: Client,
    config: XrayConfig,
    token: RwLock<Option<BearerToken>>,
}

impl XrayClient {
    pub fn new(config: XrayConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("xray-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| XrayError::Transport {
                status: None,
                body: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &XrayConfig {
        &self.config
    }

    /// Return a valid bearer token, authenticating when none is cached or it has expired.
    ///
    /// Two callers racing past an expired token both authenticate; the later one wins. Either
    /// token is valid, so no lock is held across the network call.
    pub async fn ensure_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_valid() {
                return Ok(token.value.clone());
            }
        }

        let fresh = auth::authenticate(
            &self.http,
            &self.config.auth_url(),
            &self.config.client_id,
            &self.config.client_secret,
        )
        .await?;
        let value = fresh.value.clone();
        *self.token.write().await = Some(fresh);
        Ok(value)
    }

    /// Send a GraphQL document and decode its `data` field into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, document: &str, variables: Value) -> Result<T> {
        let data = self.execute_raw(document, variables).await?;
        serde_json::from_value(data).map_err(|e| XrayError::decode(operation_name(document), e))
    }

    async fn execute_raw(&self, document: &str, variables: Value) -> Result<Value> {
        let token = self.ensure_token().await?;
        let operation = operation_name(document);
        debug!(operation, "Sending Xray GraphQL request");

        let response = self
            .http
            .post(self.config.graphql_url())
            .bearer_auth(&token)
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await
            .map_err(|e| XrayError::Transport {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "Received Xray GraphQL response");
        let body = response.text().await.map_err(|e| XrayError::Transport {
            status: Some(status.as_u16()),
            body: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(XrayError::Transport {
                status: Some(status.as_u16()),
                body,
            });
        }

        let envelope: Value =
            serde_json::from_str(&body).map_err(|e| XrayError::decode(operation, e))?;
        unwrap_envelope(operation, envelope)
    }

    /// Force the next call to re-authenticate.
    #[cfg(test)]
    pub(crate) async fn expire_token(&self) {
        if let Some(token) = self.token.write().await.as_mut() {
            token.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
        }
    }
}

/// Split a `{data, errors}` envelope. Any error entry fails the whole call.
fn unwrap_envelope(operation: &str, mut envelope: Value) -> Result<Value> {
    if let Some(errors) = envelope.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            let serialized = serde_json::to_string(errors).unwrap_or_else(|_| format!("{:?}", errors));
            return Err(XrayError::GraphQl(serialized));
        }
    }

    match envelope.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(XrayError::decode(operation, "response has no data")),
    }
}

/// Name declared after `query`/`mutation`, for logs and error messages.
fn operation_name(document: &str) -> &str {
    let mut words = document.split_whitespace();
    while let Some(word) = words.next() {
        if word == "query" || word == "mutation" {
            return words
                .next()
                .map(|name| name.split('(').next().unwrap_or(name))
                .unwrap_or("anonymous");
        }
    }
    "anonymous"
}
