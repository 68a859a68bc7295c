use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, XrayError};

/// Xray tokens are valid for 24 hours; we stop using them one hour early.
pub const TOKEN_LIFETIME_HOURS: i64 = 23;

/// A bearer token and the instant after which it must not be sent.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl BearerToken {
    pub fn issued_at(value: String, now: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: now + Duration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

/// Exchange client credentials for a bearer token.
pub async fn authenticate(
    http: &Client,
    auth_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<BearerToken> {
    debug!(url = auth_url, "Requesting Xray bearer token");

    let response = http
        .post(auth_url)
        .json(&Credentials {
            client_id,
            client_secret,
        })
        .send()
        .await
        .map_err(|e| XrayError::Authentication(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| XrayError::Authentication(format!("Failed to read token response: {}", e)))?;

    if !status.is_success() {
        return Err(XrayError::Authentication(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body
        )));
    }

    let token = parse_token_body(&body)?;
    Ok(BearerToken::issued_at(token, Utc::now()))
}

/// Xray answers with a JSON string literal. A bare token is accepted too.
fn parse_token_body(body: &str) -> Result<String> {
    let token = serde_json::from_str::<String>(body)
        .unwrap_or_else(|_| body.trim().trim_matches('"').to_string());
    if token.trim().is_empty() {
        return Err(XrayError::Authentication(
            "Token response was empty".to_string(),
        ));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_token_valid_inside_window() {
        let now = Utc::now();
        let token = BearerToken::issued_at("t".to_string(), now);
        assert!(token.is_valid_at(now));
        assert!(token.is_valid_at(now + Duration::hours(22)));
    }

    #[test]
    fn test_token_expires_after_23_hours() {
        let now = Utc::now();
        let token = BearerToken::issued_at("t".to_string(), now);
        assert_eq!(token.expires_at, now + Duration::hours(23));
        assert!(!token.is_valid_at(token.expires_at));
        assert!(!token.is_valid_at(now + Duration::hours(24)));
    }

    #[test]
    fn test_parse_token_body_json_string() {
        assert_eq!(parse_token_body(r#""abc.def""#).unwrap(), "abc.def");
    }

    #[test]
    fn test_parse_token_body_bare() {
        assert_eq!(parse_token_body("abc.def\n").unwrap(), "abc.def");
    }

    #[test]
    fn test_parse_token_body_empty() {
        assert!(matches!(
            parse_token_body(r#""""#),
            Err(XrayError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/authenticate"))
            .and(body_json(serde_json::json!({
                "client_id": "id",
                "client_secret": "secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#""T""#))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/api/v2/authenticate", server.uri());
        let token = authenticate(&Client::new(), &url, "id", "secret")
            .await
            .unwrap();
        assert_eq!(token.value, "T");
        assert!(token.is_valid());
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/authenticate"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let url = format!("{}/api/v2/authenticate", server.uri());
        let err = authenticate(&Client::new(), &url, "id", "wrong")
            .await
            .unwrap_err();
        match err {
            XrayError::Authentication(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("bad credentials"));
            }
            other => panic!("expected authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticate_unreachable() {
        // Port 9 (discard) is not listening in test environments.
        let err = authenticate(&Client::new(), "http://127.0.0.1:9/api/v2/authenticate", "id", "s")
            .await
            .unwrap_err();
        assert!(matches!(err, XrayError::Authentication(_)));
    }
}
