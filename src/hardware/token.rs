use chrono::{DateTime, Duration, Utc};

/// Refresh this long before the hardware API would reject the token.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Cached bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: String, token_type: Option<String>, expires_in_secs: i64) -> Self {
        Self::issued_at(Utc::now(), token, token_type, expires_in_secs)
    }

    pub fn issued_at(
        now: DateTime<Utc>,
        token: String,
        token_type: Option<String>,
        expires_in_secs: i64,
    ) -> Self {
        Self {
            token,
            token_type: token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Bearer".to_string()),
            expires_at: now + Duration::seconds(expires_in_secs),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(EXPIRY_BUFFER_SECS)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}
