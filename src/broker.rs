use std::sync::Arc;

use crate::callback::Callback;
use crate::exchange::{HttpTokenExchange, TokenExchange};
use crate::pkce::{PkcePair, fingerprint, generate_state};
use crate::session::SessionStore;
use crate::{
    AuthorizationRequest, BrokerConfig, BrokerError, CallbackError, CallbackParams,
    TokenResponse,
};

/// Parameters the initiator always sets; configured extras cannot override them.
const RESERVED_AUTHORIZE_PARAMS: &[&str] = &[
    "response_type",
    "client_id",
    "redirect_uri",
    "scope",
    "state",
    "code_challenge",
    "code_challenge_method",
];

#[derive(Clone)]
pub struct Broker {
    config: Arc<BrokerConfig>,
    store: SessionStore,
    exchanger: Arc<dyn TokenExchange>,
}

impl Broker {
    /// Validates `config` and wires the reqwest-backed token exchange.
    pub fn new(config: BrokerConfig) -> Result<Self, BrokerError> {
        config.validate()?;
        let exchanger = HttpTokenExchange::new(&config)?;
        Ok(Self::with_exchanger(config, SessionStore::new(), Arc::new(exchanger)))
    }

    pub fn with_exchanger(
        config: BrokerConfig,
        store: SessionStore,
        exchanger: Arc<dyn TokenExchange>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            exchanger,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Creates a pending authorization and returns the provider URL to send
    /// the user to. No network traffic.
    pub fn start(&self) -> Result<AuthorizationRequest, BrokerError> {
        let pkce = PkcePair::generate()?;
        let state = generate_state()?;
        let scope = self.config.scope();

        let mut url = self.config.authorization_endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("scope", &scope)
                .append_pair("state", &state)
                .append_pair("code_challenge", &pkce.code_challenge)
                .append_pair("code_challenge_method", "S256");
            for (key, value) in &self.config.authorize_params {
                if !RESERVED_AUTHORIZE_PARAMS.contains(&key.as_str()) {
                    pairs.append_pair(key, value);
                }
            }
        }

        self.store
            .put(state.clone(), pkce.code_verifier, self.config.session_ttl)?;
        tracing::info!(
            state = %fingerprint(&state),
            pending = self.store.len(),
            "authorization started"
        );

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state,
            scope,
        })
    }

    pub async fn handle_callback(
        &self,
        params: CallbackParams,
    ) -> Result<TokenResponse, CallbackError> {
        Callback::new(params)
            .validate(&self.store)?
            .exchange(self.exchanger.as_ref())
            .await
    }
}
