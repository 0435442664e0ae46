//! OMBEA hardware API mock server shared by the integration tests
#![allow(dead_code)]

use caces_vote::{HardwareConfig, OmbeaClient, Question};
use serde_json::{json, Value};
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "caces-client";
pub const CLIENT_SECRET: &str = "caces-secret";
pub const ACCESS_TOKEN: &str = "tok-1";
pub const LINKS_PATH: &str = "/rlapi/v1/responselinks";

/// Question list as the exam app hands it over
pub fn load_test_questions() -> Vec<Question> {
    let json_data = include_str!("questions.json");
    serde_json::from_str(json_data).expect("Failed to parse question fixture JSON")
}

pub fn link_json(id: &str, connection_state: &str) -> Value {
    json!({ "id": id, "connectionState": connection_state, "name": format!("Base {id}") })
}

pub fn api_errors(message: &str) -> Value {
    json!({ "errors": [{ "message": message }] })
}

pub struct OmbeaApiMock {
    pub server: MockServer,
}

impl OmbeaApiMock {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> HardwareConfig {
        HardwareConfig {
            base_url: self.server.uri(),
            client_id: Some(CLIENT_ID.to_string()),
            client_secret: Some(CLIENT_SECRET.to_string()),
            ..HardwareConfig::default()
        }
    }

    pub fn client(&self) -> OmbeaClient {
        OmbeaClient::new(&self.config()).expect("Failed to build OMBEA client")
    }

    /// Token exchange with the configured credentials, expected `times` times
    pub async fn mock_token(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path("/token/v1"))
            .and(basic_auth(CLIENT_ID, CLIENT_SECRET))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_token_failure(&self, status: u16, body: Option<Value>) {
        let mut response = ResponseTemplate::new(status);
        if let Some(body) = body {
            response = response.set_body_json(body);
        }
        Mock::given(method("POST"))
            .and(path("/token/v1"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_response_links(&self, links: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(LINKS_PATH))
            .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(links)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_start_poll(&self, link_id: &str, poll_id: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("{LINKS_PATH}/{link_id}/polls")))
            .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "id": poll_id, "state": "running" })),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_stop_poll(&self, link_id: &str, poll_id: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("{LINKS_PATH}/{link_id}/polls/{poll_id}/stop")))
            .respond_with(ResponseTemplate::new(204))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answers the next matching request with 401, ahead of the regular mocks
    pub async fn mock_unauthorized_once(&self, http_method: &str, request_path: &str) {
        Mock::given(method(http_method))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(401).set_body_json(api_errors("Token expired")))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }
}
