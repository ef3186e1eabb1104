use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("session store error: {0}")]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no pending authorization for state")]
    NotFound,

    #[error("pending authorization expired")]
    Expired,

    #[error("state is already registered")]
    DuplicateState,

    #[error("session ttl is out of range")]
    TtlOutOfRange,

    #[error("too many pending authorizations")]
    CapacityExceeded,
}

/// Failure of the outbound token request.
///
/// Never carries the verifier, and `MalformedResponse` drops the body since a
/// half-formed token payload may still contain secrets.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token endpoint unreachable: {message}")]
    Network { message: String, timed_out: bool },

    #[error("token endpoint returned http status {status}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed token response: {message}")]
    MalformedResponse { message: String },
}

impl ExchangeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network_error",
            Self::HttpStatus { .. } => "http_error",
            Self::MalformedResponse { .. } => "malformed_response",
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            timed_out: err.is_timeout(),
            message: err.without_url().to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("provider denied authorization: {error}")]
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    #[error("callback is missing code or state")]
    MissingParameters,

    #[error("state is invalid or expired")]
    InvalidOrExpiredState,

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(#[from] ExchangeError),
}

impl CallbackError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderDenied { .. } => "provider_denied",
            Self::MissingParameters => "missing_parameters",
            Self::InvalidOrExpiredState => "invalid_or_expired_state",
            Self::TokenExchangeFailed(_) => "token_exchange_failed",
        }
    }

    /// Which exchange failure sits behind `token_exchange_failed`.
    pub fn cause(&self) -> Option<&'static str> {
        match self {
            Self::TokenExchangeFailed(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Message safe to show to the end user. Provider denial text is echoed
    /// verbatim; exchange bodies are not.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderDenied { error, description } => match description {
                Some(description) => format!("Provider error: {error} - {description}"),
                None => format!("Provider error: {error}"),
            },
            Self::MissingParameters => {
                "Missing code or state in callback. Start the authorization again.".to_string()
            }
            Self::InvalidOrExpiredState => {
                "Invalid or expired authorization state. Start the authorization again."
                    .to_string()
            }
            Self::TokenExchangeFailed(ExchangeError::Network { .. }) => {
                "Could not reach the token endpoint. Start the authorization again.".to_string()
            }
            Self::TokenExchangeFailed(ExchangeError::HttpStatus { status, .. }) => {
                format!("The provider rejected the token exchange (HTTP {status}).")
            }
            Self::TokenExchangeFailed(ExchangeError::MalformedResponse { .. }) => {
                "The provider returned an unexpected token response.".to_string()
            }
        }
    }
}
