use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::HardwareConfig;
use crate::hardware::errors::HardwareError;
use crate::hardware::token::AccessToken;
use crate::hardware::types::{ApiErrorBody, Poll, PollRequest, ResponseLink, TokenResponse};
use crate::hardware::VotingHardware;
use crate::observability::HardwareApiMetrics;
use crate::question::Question;

const TOKEN_PATH: &str = "/token/v1";
const RESPONSE_LINKS_PATH: &str = "/rlapi/v1/responselinks";

#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// HTTP client for the local OMBEA hardware-control API.
///
/// Holds the bearer token for the whole process lifetime of the client; every
/// authorized request that comes back 401 drops the token, re-authenticates and
/// is replayed once.
#[derive(Debug)]
pub struct OmbeaClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<ClientCredentials>,
    scope: String,
    token: Mutex<Option<AccessToken>>,
    metrics: HardwareApiMetrics,
}

impl OmbeaClient {
    pub fn new(config: &HardwareConfig) -> Result<Self, HardwareError> {
        let credentials = match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(ClientCredentials {
                    client_id: id.clone(),
                    client_secret: secret.clone(),
                })
            }
            _ => {
                tracing::warn!(
                    "OMBEA client id or secret not configured, authentication will fail"
                );
                None
            }
        };

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            scope: config.scope.clone(),
            token: Mutex::new(None),
            metrics: HardwareApiMetrics::new(),
        })
    }

    pub fn metrics(&self) -> &HardwareApiMetrics {
        &self.metrics
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Returns the `Authorization` header value, exchanging credentials when the cached
    /// token is missing or close to expiry.
    pub async fn get_access_token(&self) -> Result<String, HardwareError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_valid()) {
            debug!("Using existing valid access token");
            return Ok(token.header_value());
        }
        *cached = None;

        let Some(credentials) = &self.credentials else {
            error!("Client ID or Client Secret is missing, cannot authenticate");
            return Err(HardwareError::MissingCredentials);
        };

        info!("Requesting new access token");
        self.metrics.record_token_request();

        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                self.metrics.record_error();
                error!(endpoint = TOKEN_PATH, error = %e, "Access token request failed");
                HardwareError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(status, response).await;
            self.metrics.record_error();
            error!(
                endpoint = TOKEN_PATH,
                status = status.as_u16(),
                detail = %detail,
                "Failed to get access token"
            );
            return Err(HardwareError::TokenRequest {
                status: status.as_u16(),
                detail,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|_| HardwareError::InvalidToken)?;
        let (Some(access_token), Some(expires_in)) = (body.access_token, body.expires_in) else {
            error!(endpoint = TOKEN_PATH, "Invalid token data received");
            return Err(HardwareError::InvalidToken);
        };

        let token = AccessToken::new(access_token, body.token_type, expires_in);
        let header = token.header_value();
        info!(expires_at = %token.expires_at, "Access token obtained");
        *cached = Some(token);
        Ok(header)
    }

    pub async fn clear_access_token(&self) {
        *self.token.lock().await = None;
        info!("Access token cleared");
    }

    /// Send an authorized request built by `build`, replaying it once after a 401.
    async fn send_authorized<F>(
        &self,
        endpoint: &str,
        build: F,
    ) -> Result<reqwest::Response, HardwareError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut reauthenticated = false;
        loop {
            let token = self.get_access_token().await?;
            self.metrics.record_request();

            let response = build(&self.http)
                .header(AUTHORIZATION, token)
                .send()
                .await
                .map_err(|e| {
                    self.metrics.record_error();
                    error!(endpoint, error = %e, "Hardware API request could not be sent");
                    HardwareError::from(e)
                })?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let detail = error_detail(status, response).await;
            self.metrics.record_error();
            error!(
                endpoint,
                status = status.as_u16(),
                detail = %detail,
                "Hardware API request failed"
            );

            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                self.clear_access_token().await;
                self.metrics.record_reauthentication();
                reauthenticated = true;
                continue;
            }

            return Err(HardwareError::Api {
                status: status.as_u16(),
                detail,
            });
        }
    }

    pub async fn get_response_links(
        &self,
        only_connected: bool,
    ) -> Result<Vec<ResponseLink>, HardwareError> {
        info!(only_connected, "Fetching response links");
        let url = self.url(RESPONSE_LINKS_PATH);

        let response = self
            .send_authorized(RESPONSE_LINKS_PATH, |http| {
                let request = http.get(&url);
                if only_connected {
                    request.query(&[("connectionState", "connected")])
                } else {
                    request
                }
            })
            .await?;

        let links: Vec<ResponseLink> = response.json().await?;
        info!(count = links.len(), "Fetched response links");
        Ok(links)
    }

    pub async fn start_poll(
        &self,
        link_id: &str,
        question: &Question,
    ) -> Result<Poll, HardwareError> {
        let endpoint = format!("{RESPONSE_LINKS_PATH}/{link_id}/polls");
        let url = self.url(&endpoint);
        let body = PollRequest::standard(question.option_count());

        let response = self
            .send_authorized(&endpoint, |http| http.post(&url).json(&body))
            .await?;

        let poll: Poll = response.json().await?;
        info!(
            link_id,
            poll_id = %poll.id,
            question_id = %question.id,
            state = %poll.state,
            "Poll started"
        );
        Ok(poll)
    }

    pub async fn stop_poll(&self, link_id: &str, poll_id: &str) -> Result<(), HardwareError> {
        let endpoint = format!("{RESPONSE_LINKS_PATH}/{link_id}/polls/{poll_id}/stop");
        let url = self.url(&endpoint);

        self.send_authorized(&endpoint, |http| http.post(&url))
            .await?;

        info!(link_id, poll_id, "Poll stopped");
        Ok(())
    }
}

/// First error message reported by the API, or the status text when the body has none.
async fn error_detail(status: StatusCode, response: reqwest::Response) -> String {
    let fallback = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());

    match response.text().await {
        Ok(body) => serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.first_message().map(str::to_string))
            .unwrap_or(fallback),
        Err(_) => fallback,
    }
}

#[async_trait]
impl VotingHardware for OmbeaClient {
    async fn get_access_token(&self) -> Result<String, HardwareError> {
        OmbeaClient::get_access_token(self).await
    }

    async fn clear_access_token(&self) {
        OmbeaClient::clear_access_token(self).await
    }

    async fn get_response_links(
        &self,
        only_connected: bool,
    ) -> Result<Vec<ResponseLink>, HardwareError> {
        OmbeaClient::get_response_links(self, only_connected).await
    }

    async fn start_poll(&self, link_id: &str, question: &Question) -> Result<Poll, HardwareError> {
        OmbeaClient::start_poll(self, link_id, question).await
    }

    async fn stop_poll(&self, link_id: &str, poll_id: &str) -> Result<(), HardwareError> {
        OmbeaClient::stop_poll(self, link_id, poll_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(client_id: Option<&str>, client_secret: Option<&str>) -> HardwareConfig {
        HardwareConfig {
            base_url: "http://localhost:9236/".to_string(),
            client_id: client_id.map(str::to_string),
            client_secret: client_secret.map(str::to_string),
            ..HardwareConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_any_request() {
        let client = OmbeaClient::new(&config(Some("id"), None)).unwrap();
        let err = client.get_access_token().await.unwrap_err();
        assert!(matches!(err, HardwareError::MissingCredentials));
        assert_eq!(client.metrics().get_stats().token_requests, 0);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OmbeaClient::new(&config(Some("id"), Some("secret"))).unwrap();
        assert_eq!(
            client.url(TOKEN_PATH),
            "http://localhost:9236/token/v1"
        );
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = ClientCredentials {
            client_id: "caces".to_string(),
            client_secret: "hunter2".to_string(),
        };
        let printed = format!("{credentials:?}");
        assert!(printed.contains("caces"));
        assert!(!printed.contains("hunter2"));
    }
}
