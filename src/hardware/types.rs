use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Connecting,
    Error,
}

/// A response link (receiver base) as reported by the hardware API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseLink {
    pub id: String,
    pub connection_state: ConnectionState,
    #[serde(default)]
    pub name: Option<String>,
}

impl ResponseLink {
    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    #[serde(rename = "type")]
    pub poll_type: String,
    pub configuration: PollConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfiguration {
    pub option_count: usize,
    pub allow_change_of_mind: bool,
}

impl PollRequest {
    /// Polls are always "standard"; the hardware only cares about the option count.
    pub fn standard(option_count: usize) -> Self {
        Self {
            poll_type: "standard".to_string(),
            configuration: PollConfiguration {
                option_count,
                allow_change_of_mind: true,
            },
        }
    }
}

/// Poll created on a response link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn first_message(&self) -> Option<&str> {
        self.errors
            .first()
            .and_then(|e| e.message.as_deref())
            .filter(|m| !m.is_empty())
    }
}
