//! Callback handling as a typestate machine.
//!
//! `Callback<Received>` can only become `Callback<Validated>`, which can only
//! be consumed by the exchange. Every step takes `self` by value, so a
//! callback never returns to an earlier phase. Succeeded and Failed are the
//! `Ok` and `Err` arms of the final result.

use std::fmt;

use crate::exchange::TokenExchange;
use crate::pkce::{CodeVerifier, fingerprint};
use crate::session::SessionStore;
use crate::{CallbackError, CallbackParams, TokenResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPhase {
    Received,
    Validated,
    Exchanging,
    Succeeded,
    Failed,
}

impl CallbackPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Exchanging => "exchanging",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CallbackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Received {
    params: CallbackParams,
}

#[derive(Debug)]
pub struct Validated {
    code: String,
    code_verifier: CodeVerifier,
    state_tag: String,
}

#[derive(Debug)]
pub struct Callback<S> {
    inner: S,
}

impl<S> Callback<S> {
    fn fail(phase: CallbackPhase, error: CallbackError) -> CallbackError {
        tracing::info!(
            from = %phase,
            to = %CallbackPhase::Failed,
            kind = error.kind(),
            cause = error.cause(),
            "callback failed"
        );
        error
    }
}

impl Callback<Received> {
    pub fn new(params: CallbackParams) -> Self {
        Self {
            inner: Received { params },
        }
    }

    pub fn phase(&self) -> CallbackPhase {
        CallbackPhase::Received
    }

    /// Rejects provider denials and incomplete callbacks, then consumes the
    /// pending authorization for `state`.
    pub fn validate(self, store: &SessionStore) -> Result<Callback<Validated>, CallbackError> {
        let CallbackParams {
            code,
            state,
            error,
            error_description,
        } = self.inner.params;

        if let Some(error) = non_empty(error) {
            return Err(Self::fail(
                CallbackPhase::Received,
                CallbackError::ProviderDenied {
                    error,
                    description: error_description,
                },
            ));
        }

        let (Some(code), Some(state)) = (non_empty(code), non_empty(state)) else {
            return Err(Self::fail(
                CallbackPhase::Received,
                CallbackError::MissingParameters,
            ));
        };

        let state_tag = fingerprint(&state);
        let code_verifier = store.take_if_valid(&state).map_err(|err| {
            // expired and unknown collapse into one outward error
            tracing::debug!(state = %state_tag, reason = %err, "state rejected");
            Self::fail(CallbackPhase::Received, CallbackError::InvalidOrExpiredState)
        })?;

        tracing::debug!(state = %state_tag, phase = %CallbackPhase::Validated, "callback validated");
        Ok(Callback {
            inner: Validated {
                code,
                code_verifier,
                state_tag,
            },
        })
    }
}

impl Callback<Validated> {
    pub fn phase(&self) -> CallbackPhase {
        CallbackPhase::Validated
    }

    pub async fn exchange<E>(self, exchanger: &E) -> Result<TokenResponse, CallbackError>
    where
        E: TokenExchange + ?Sized,
    {
        let Validated {
            code,
            code_verifier,
            state_tag,
        } = self.inner;

        tracing::debug!(state = %state_tag, phase = %CallbackPhase::Exchanging, "exchanging code");
        match exchanger.exchange(&code, &code_verifier).await {
            Ok(token) => {
                tracing::info!(
                    state = %state_tag,
                    phase = %CallbackPhase::Succeeded,
                    token_type = %token.token_type,
                    "token exchange succeeded"
                );
                Ok(token)
            }
            Err(err) => {
                tracing::warn!(state = %state_tag, error = %err, "token exchange failed");
                Err(Self::fail(
                    CallbackPhase::Exchanging,
                    CallbackError::TokenExchangeFailed(err),
                ))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
