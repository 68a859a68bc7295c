use serde_json::{json, Value};
use thiserror::Error;

/// Errors raised by the Xray client and the tool layer on top of it.
#[derive(Debug, Error)]
pub enum XrayError {
    /// Credential exchange was rejected or the auth endpoint was unreachable.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Non-2xx response or network failure on the GraphQL endpoint.
    #[error("GraphQL request failed{}: {body}", http_suffix(.status))]
    Transport { status: Option<u16>, body: String },

    /// HTTP success carrying a non-empty `errors` array.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unsupported(String),

    /// The response parsed but did not have the shape the operation expects.
    #[error("Unexpected response for {operation}: {message}")]
    Decode { operation: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, XrayError>;

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl XrayError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn decode(operation: &str, message: impl ToString) -> Self {
        Self::Decode {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Stable identifier for machine-readable error output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::Transport { .. } => "transport",
            Self::GraphQl(_) => "graphql",
            Self::NotFound(_) => "not_found",
            Self::Unsupported(_) => "unsupported",
            Self::Decode { .. } => "decode",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// Process exit code: 1=general error, 2=not found, 3=auth error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound(_) => 2,
            Self::Authentication(_) => 3,
            _ => 1,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "error": true,
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::Transport {
            status: Some(status),
            ..
        } = self
        {
            out["status"] = json!(status);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_with_status() {
        let err = XrayError::Transport {
            status: Some(502),
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "GraphQL request failed (HTTP 502): bad gateway");
        assert_eq!(err.to_json()["status"], 502);
    }

    #[test]
    fn test_transport_message_without_status() {
        let err = XrayError::Transport {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "GraphQL request failed: connection refused");
        assert!(err.to_json().get("status").is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(XrayError::not_found("Test case X-1 not found").exit_code(), 2);
        assert_eq!(XrayError::Authentication("401".into()).exit_code(), 3);
        assert_eq!(XrayError::GraphQl("[]".into()).exit_code(), 1);
    }

    #[test]
    fn test_not_found_message_is_verbatim() {
        let err = XrayError::not_found("Test case TEST-999 not found");
        assert_eq!(err.to_string(), "Test case TEST-999 not found");
        assert_eq!(err.kind(), "not_found");
    }
}
