use thiserror::Error;

/// Failures of the OMBEA hardware-control API. The `Display` text is what the exam
/// operator sees, so it stays in French.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("Client ID ou Client Secret manquant.")]
    MissingCredentials,
    #[error("Échec de l'obtention du token: {detail}")]
    TokenRequest { status: u16, detail: String },
    #[error("Données du token invalides reçues de l'API.")]
    InvalidToken,
    #[error("Erreur API ({status}): {detail}")]
    Api { status: u16, detail: String },
    #[error("Erreur réseau: {0}")]
    Transport(#[from] reqwest::Error),
}

impl HardwareError {
    /// HTTP status reported by the hardware API, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            HardwareError::TokenRequest { status, .. } | HardwareError::Api { status, .. } => {
                Some(*status)
            }
            HardwareError::Transport(err) => err.status().map(|s| s.as_u16()),
            HardwareError::MissingCredentials | HardwareError::InvalidToken => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_surface_detail() {
        let err = HardwareError::Api {
            status: 404,
            detail: "Response link not found".to_string(),
        };
        assert_eq!(err.to_string(), "Erreur API (404): Response link not found");
        assert_eq!(err.status(), Some(404));

        let err = HardwareError::TokenRequest {
            status: 400,
            detail: "invalid_client".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Échec de l'obtention du token: invalid_client"
        );
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_credentials_error_has_no_status() {
        assert_eq!(HardwareError::MissingCredentials.status(), None);
    }
}
