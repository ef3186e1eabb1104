use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

use crate::{CallbackError, ExchangeError, TokenResponse};

/// Receives the outcome of a callback and decides how it leaves the process.
pub trait CredentialSink: Send + Sync {
    fn succeeded(&self, token: TokenResponse) -> Response;

    fn failed(&self, error: &CallbackError) -> Response;
}

pub fn failure_status(error: &CallbackError) -> StatusCode {
    match error {
        CallbackError::ProviderDenied { .. } => StatusCode::FORBIDDEN,
        CallbackError::MissingParameters | CallbackError::InvalidOrExpiredState => {
            StatusCode::BAD_REQUEST
        }
        CallbackError::TokenExchangeFailed(ExchangeError::Network { .. }) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        CallbackError::TokenExchangeFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Shows the bearer credential to the user in a browser page.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSink;

impl CredentialSink for HtmlSink {
    fn succeeded(&self, token: TokenResponse) -> Response {
        let refresh = token
            .refresh_token
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| "No refresh token received".to_string());
        let body = format!(
            r#"<!doctype html>
<html>
  <head><meta charset="utf-8" /><title>Authorization complete</title></head>
  <body>
    <h1>Success!</h1>
    <p>Your authorization token:</p>
    <h2><code>Bearer {access}</code></h2>
    <p><strong>Refresh token:</strong></p>
    <code>{refresh}</code>
    <p>Store it securely. It grants access to your account.</p>
  </body>
</html>
"#,
            access = escape_html(&token.access_token),
        );
        (StatusCode::OK, Html(body)).into_response()
    }

    fn failed(&self, error: &CallbackError) -> Response {
        let body = format!(
            r#"<!doctype html>
<html>
  <head><meta charset="utf-8" /><title>Authorization error</title></head>
  <body>
    <h2>Authorization failed</h2>
    <p>{message}</p>
    <p><a href="/start">Start again</a></p>
  </body>
</html>
"#,
            message = escape_html(&error.user_message()),
        );
        (failure_status(error), Html(body)).into_response()
    }
}

/// Returns the credential as JSON, for programmatic callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl CredentialSink for JsonSink {
    fn succeeded(&self, token: TokenResponse) -> Response {
        (StatusCode::OK, Json(token)).into_response()
    }

    fn failed(&self, error: &CallbackError) -> Response {
        let mut body = json!({
            "error": error.kind(),
            "message": error.user_message(),
        });
        if let Some(cause) = error.cause() {
            body["cause"] = json!(cause);
        }
        (failure_status(error), Json(body)).into_response()
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn token(refresh: Option<&str>) -> TokenResponse {
        serde_json::from_value(json!({
            "access_token": "tok123",
            "refresh_token": refresh,
        }))
        .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn html_success_shows_bearer_and_refresh() {
        let response = HtmlSink.succeeded(token(Some("ref456")));
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Bearer tok123"));
        assert!(body.contains("ref456"));
    }

    #[tokio::test]
    async fn html_success_notes_missing_refresh_token() {
        let body = body_text(HtmlSink.succeeded(token(None))).await;
        assert!(body.contains("No refresh token received"));
    }

    #[tokio::test]
    async fn html_failure_escapes_provider_text() {
        let error = CallbackError::ProviderDenied {
            error: "access_denied".to_string(),
            description: Some("<script>alert(1)</script>".to_string()),
        };
        let response = HtmlSink.failed(&error);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_text(response).await;
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }

    #[tokio::test]
    async fn json_failure_names_kind() {
        let response = JsonSink.failed(&CallbackError::InvalidOrExpiredState);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "invalid_or_expired_state");
        assert!(body.get("cause").is_none());
    }

    #[tokio::test]
    async fn json_failure_names_exchange_cause() {
        let error = CallbackError::TokenExchangeFailed(ExchangeError::Network {
            message: "connection refused".to_string(),
            timed_out: false,
        });
        let response = JsonSink.failed(&error);
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "token_exchange_failed");
        assert_eq!(body["cause"], "network_error");
    }

    #[test]
    fn network_failures_map_to_gateway_timeout() {
        let error = CallbackError::TokenExchangeFailed(ExchangeError::Network {
            message: "timed out".to_string(),
            timed_out: true,
        });
        assert_eq!(failure_status(&error), StatusCode::GATEWAY_TIMEOUT);
        let error = CallbackError::TokenExchangeFailed(ExchangeError::MalformedResponse {
            message: "Syntax error at line 1 column 1".to_string(),
        });
        assert_eq!(failure_status(&error), StatusCode::BAD_GATEWAY);
    }
}
