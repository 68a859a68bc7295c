//! Newline-delimited JSON-RPC 2.0 over stdio, speaking the MCP tool methods.

use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::api::XrayClient;
use crate::tools;

pub const MCP_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "xray-cli";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const NOT_INITIALIZED: i64 = -32002;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    #[serde(rename = "jsonrpc")]
    pub _jsonrpc: Option<String>,
    pub method: String,
    /// `None` only when the key is absent; `"id": null` is still a request.
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
}

fn present_id<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

fn tool_text_content(text: String) -> Value {
    json!({ "type": "text", "text": text })
}

pub struct McpServer<'a> {
    client: &'a XrayClient,
    initialized: bool,
}

impl<'a> McpServer<'a> {
    pub fn new(client: &'a XrayClient) -> Self {
        Self {
            client,
            initialized: false,
        }
    }

    /// Handle one raw line. Returns `None` for notifications.
    pub async fn handle_line(&mut self, line: &str) -> Option<Value> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!(error = %e, "Unparseable JSON-RPC message");
                Some(json_rpc_error(None, PARSE_ERROR, &format!("Parse error: {}", e)))
            }
        }
    }

    pub async fn handle(&mut self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        debug!(method, "MCP request");

        if request.id.is_none() {
            // Notifications never get a reply.
            return None;
        }

        if method == "initialize" {
            self.initialized = true;
            let protocol_version = request
                .params
                .as_ref()
                .and_then(|p| p.get("protocolVersion"))
                .and_then(|v| v.as_str())
                .unwrap_or(MCP_VERSION)
                .to_string();
            return Some(json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": protocol_version,
                    "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
                    "capabilities": { "tools": {} }
                }),
            ));
        }

        if !self.initialized {
            return Some(json_rpc_error(
                request.id,
                NOT_INITIALIZED,
                "Server not initialized",
            ));
        }

        match method {
            "ping" => Some(json_rpc_response(request.id, json!({}))),
            "tools/list" => Some(json_rpc_response(
                request.id,
                json!({ "tools": tools::tool_definitions() }),
            )),
            "tools/call" => {
                let Some(params) = request.params.as_ref().and_then(|p| p.as_object()) else {
                    return Some(json_rpc_error(
                        request.id,
                        INVALID_PARAMS,
                        "params must be an object",
                    ));
                };
                let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
                    return Some(json_rpc_error(
                        request.id,
                        INVALID_PARAMS,
                        "params.name must be a string",
                    ));
                };
                let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                Some(json_rpc_response(request.id.clone(), self.call_tool(name, args).await))
            }
            _ => Some(json_rpc_error(
                request.id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", method),
            )),
        }
    }

    async fn call_tool(&self, name: &str, args: Value) -> Value {
        match tools::dispatch(self.client, name, args).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
                json!({ "content": [tool_text_content(text)], "isError": false })
            }
            Err(e) => {
                info!(tool = name, kind = e.kind(), "Tool call failed");
                json!({
                    "content": [
                        tool_text_content(format!("Error: {}", e)),
                        tool_text_content(e.to_json().to_string())
                    ],
                    "isError": true
                })
            }
        }
    }
}

/// Serve MCP on stdin/stdout until stdin closes. Requests are handled one at a time.
pub async fn serve_stdio(client: &XrayClient) -> Result<()> {
    let mut server = McpServer::new(client);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!("MCP server ready on stdio");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = server.handle_line(&line).await {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            stdout.write_all(&out).await?;
            stdout.flush().await?;
        }
    }
    info!("stdin closed, MCP server exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mount_auth, mount_graphql, test_client};
    use wiremock::MockServer;

    async fn initialized(server: &mut McpServer<'_>) {
        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(resp["result"]["protocolVersion"], MCP_VERSION);
        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_requests_before_initialize_are_rejected() {
        let mock = MockServer::start().await;
        let client = test_client(&mock);
        let mut server = McpServer::new(&client);
        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn test_initialize_echoes_client_protocol_version() {
        let mock = MockServer::start().await;
        let client = test_client(&mock);
        let mut server = McpServer::new(&client);
        let resp = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":"a","method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
            )
            .await
            .unwrap();
        assert_eq!(resp["id"], "a");
        assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(resp["result"]["serverInfo"]["name"], "xray-cli");
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mock = MockServer::start().await;
        let client = test_client(&mock);
        let mut server = McpServer::new(&client);
        let resp = server.handle_line("{not json").await.unwrap();
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert!(resp["id"].is_null());
    }

    #[tokio::test]
    async fn test_tools_list_and_unknown_method() {
        let mock = MockServer::start().await;
        let client = test_client(&mock);
        let mut server = McpServer::new(&client);
        initialized(&mut server).await;

        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        assert_eq!(resp["result"]["tools"].as_array().unwrap().len(), 23);

        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"resources/subscribe"}"#)
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_call_requires_name() {
        let mock = MockServer::start().await;
        let client = test_client(&mock);
        let mut server = McpServer::new(&client);
        initialized(&mut server).await;

        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"arguments":{}}}"#)
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_not_found_is_tool_error() {
        let mock = MockServer::start().await;
        mount_auth(&mock, "T", 1).await;
        mount_graphql(
            &mock,
            "getTests",
            json!({ "getTests": { "total": 0, "start": 0, "limit": 1, "results": [] } }),
            1,
        )
        .await;
        let client = test_client(&mock);
        let mut server = McpServer::new(&client);
        initialized(&mut server).await;

        let resp = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"get_test_case","arguments":{"key":"TEST-999"}}}"#,
            )
            .await
            .unwrap();
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("TEST-999 not found"));

        let detail: Value =
            serde_json::from_str(resp["result"]["content"][1]["text"].as_str().unwrap()).unwrap();
        assert_eq!(detail["kind"], "not_found");
        assert_eq!(detail["message"], "Test case TEST-999 not found");
    }

    #[tokio::test]
    async fn test_null_id_is_a_request_not_a_notification() {
        let mock = MockServer::start().await;
        let client = test_client(&mock);
        let mut server = McpServer::new(&client);
        initialized(&mut server).await;

        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();
        assert!(resp["id"].is_null());
        assert_eq!(resp["result"], json!({}));

        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"ping"}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_tools_call_success_returns_json_text() {
        let mock = MockServer::start().await;
        mount_auth(&mock, "T", 1).await;
        mount_graphql(
            &mock,
            "updateTestRunStatus",
            json!({ "updateTestRunStatus": "updated" }),
            1,
        )
        .await;
        let client = test_client(&mock);
        let mut server = McpServer::new(&client);
        initialized(&mut server).await;

        let resp = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"update_test_run_status","arguments":{"testRunId":"r1","status":"PASS"}}}"#,
            )
            .await
            .unwrap();
        assert_eq!(resp["result"]["isError"], false);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["message"], "updated");
    }
}
