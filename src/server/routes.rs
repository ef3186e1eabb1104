use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::{Broker, BrokerError, CallbackParams, SessionError};

use super::sink::CredentialSink;

#[derive(Clone)]
pub struct AppState {
    pub broker: Broker,
    pub sink: Arc<dyn CredentialSink>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/start", get(start_handler))
        .route("/callback", get(callback_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn start_handler(State(state): State<AppState>) -> Response {
    match state.broker.start() {
        Ok(auth) => (StatusCode::FOUND, [(LOCATION, auth.authorization_url)]).into_response(),
        Err(BrokerError::Session(SessionError::CapacityExceeded)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Too many pending authorizations. Try again later.",
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to start authorization");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not start authorization. Try again later.",
            )
                .into_response()
        }
    }
}

async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    match state.broker.handle_callback(params).await {
        Ok(token) => state.sink.succeeded(token),
        Err(err) => state.sink.failed(&err),
    }
}
