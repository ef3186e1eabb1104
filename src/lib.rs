//! OAuth 2.0 authorization-code + PKCE broker.
//!
//! The broker issues single-use, expiring authorization sessions keyed by an
//! anti-CSRF state token, validates the provider callback against them and
//! exchanges the code for a credential. The HTTP surface lives behind the
//! `server` feature.

mod broker;
mod callback;
mod config;
mod error;
mod exchange;
mod pkce;
mod provider;
#[cfg(feature = "server")]
pub mod server;
mod session;
mod types;

pub use broker::Broker;
pub use callback::{Callback, CallbackPhase, Received, Validated};
pub use config::{
    BrokerConfig, DEFAULT_EXCHANGE_TIMEOUT, DEFAULT_SESSION_TTL, MAX_EXCHANGE_TIMEOUT,
    MAX_SESSION_TTL,
};
pub use error::{BrokerError, CallbackError, ExchangeError, SessionError};
pub use exchange::{HttpTokenExchange, TokenExchange};
pub use pkce::{CodeVerifier, PkcePair, derive_challenge, generate_state, generate_verifier};
pub use provider::ProviderEndpoints;
pub use session::{DEFAULT_MAX_PENDING, PendingAuthorization, SessionStore};
pub use types::{AuthorizationRequest, CallbackParams, TokenResponse};
