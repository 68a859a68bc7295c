//! wiremock fixtures shared by the client tests.

use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::api::XrayClient;
use crate::config::XrayConfig;

pub(crate) const JIRA_URL: &str = "https://acme.atlassian.net";

pub(crate) fn test_client(server: &MockServer) -> XrayClient {
    let config = XrayConfig::new("client-id", "client-secret")
        .with_base_url(server.uri())
        .with_jira_url(JIRA_URL);
    XrayClient::new(config).expect("valid test config")
}

pub(crate) async fn mount_auth(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v2/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(token)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub(crate) fn graphql_ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
}

/// Answer GraphQL requests whose body mentions `operation` with `data`.
pub(crate) async fn mount_graphql(server: &MockServer, operation: &str, data: Value, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v2/graphql"))
        .and(body_string_contains(operation))
        .respond_with(graphql_ok(data))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Body of the `n`th GraphQL request received by `server`.
pub(crate) async fn graphql_request(server: &MockServer, n: usize) -> Value {
    let requests = server
        .received_requests()
        .await
        .expect("request recording enabled");
    let graphql: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v2/graphql")
        .collect();
    serde_json::from_slice(&graphql[n].body).expect("json request body")
}
