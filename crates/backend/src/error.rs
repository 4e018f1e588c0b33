use {meridian_common::AuthError, thiserror::Error};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// `401`: the credential is no longer valid.
    #[error("unauthorized")]
    Unauthorized,

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, BackendError::Status { status: 403, .. })
    }
}

/// Maps a backend failure onto the caller-facing auth taxonomy.
///
/// Callers that need to treat `401` as session expiry must check for
/// [`BackendError::Unauthorized`] before converting.
impl From<BackendError> for AuthError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unauthorized => AuthError::InvalidCredentials,
            BackendError::Status { status: 403, .. } => AuthError::Forbidden,
            BackendError::Status { status, message } if status >= 500 => {
                AuthError::Unreachable(format!("{status}: {message}"))
            },
            BackendError::Status { message, .. } => AuthError::Rejected(message),
            BackendError::Transport(msg) => AuthError::Unreachable(msg),
            BackendError::Decode(msg) => AuthError::MalformedResponse(msg),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Decode(e.to_string())
    }
}
