use std::time::Duration;

use url::Url;

use crate::{BrokerError, ProviderEndpoints};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const MAX_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Process-wide authorization settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub session_ttl: Duration,
    pub exchange_timeout: Duration,
    pub authorize_params: Vec<(String, String)>,
}

impl BrokerConfig {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        authorization_endpoint: Url,
        token_endpoint: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: Vec::new(),
            authorization_endpoint,
            token_endpoint,
            session_ttl: DEFAULT_SESSION_TTL,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            authorize_params: Vec::new(),
        }
    }

    pub fn for_provider(
        provider: ProviderEndpoints,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, BrokerError> {
        Ok(Self::new(
            client_id,
            redirect_uri,
            Url::parse(provider.authorization_endpoint)?,
            Url::parse(provider.token_endpoint)?,
        )
        .with_scopes(provider.default_scopes.iter().copied()))
    }

    /// Replaces the scope set. Duplicates and blanks are dropped, first
    /// occurrence wins the ordering.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.clear();
        for scope in scopes {
            let scope = scope.into();
            let scope = scope.trim();
            if !scope.is_empty() && !self.scopes.iter().any(|existing| existing == scope) {
                self.scopes.push(scope.to_string());
            }
        }
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    pub fn with_authorize_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.authorize_params.push((key.into(), value.into()));
        self
    }

    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.client_id.trim().is_empty() {
            return Err(invalid("client id must not be empty"));
        }
        Url::parse(&self.redirect_uri)
            .map_err(|err| invalid(format!("redirect uri is not a valid url: {err}")))?;
        for (name, url) in [
            ("authorization endpoint", &self.authorization_endpoint),
            ("token endpoint", &self.token_endpoint),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid(format!("{name} must use http or https")));
            }
        }
        if self.session_ttl.is_zero() || self.session_ttl > MAX_SESSION_TTL {
            return Err(invalid(format!(
                "session ttl must be between 1s and {}s",
                MAX_SESSION_TTL.as_secs()
            )));
        }
        if self.exchange_timeout.is_zero() || self.exchange_timeout > MAX_EXCHANGE_TIMEOUT {
            return Err(invalid(format!(
                "exchange timeout must be between 1s and {}s",
                MAX_EXCHANGE_TIMEOUT.as_secs()
            )));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> BrokerError {
    BrokerError::InvalidConfig(message.into())
}
