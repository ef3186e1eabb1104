use async_trait::async_trait;
use reqwest::{Client, header::ACCEPT};
use url::Url;

use crate::pkce::CodeVerifier;
use crate::{BrokerConfig, BrokerError, ExchangeError, TokenResponse};

/// Trades an authorization code plus verifier for a credential.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(
        &self,
        code: &str,
        code_verifier: &CodeVerifier,
    ) -> Result<TokenResponse, ExchangeError>;
}

/// Form-encoded POST against the provider's token endpoint. One attempt per
/// code; authorization codes are single-use so nothing is retried.
#[derive(Debug, Clone)]
pub struct HttpTokenExchange {
    token_endpoint: Url,
    client_id: String,
    redirect_uri: String,
    http: Client,
}

impl HttpTokenExchange {
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let http = Client::builder().timeout(config.exchange_timeout).build()?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: &BrokerConfig, http: Client) -> Self {
        Self {
            token_endpoint: config.token_endpoint.clone(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            http,
        }
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    async fn exchange(
        &self,
        code: &str,
        code_verifier: &CodeVerifier,
    ) -> Result<TokenResponse, ExchangeError> {
        let payload = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", code_verifier.secret()),
        ];

        let response = self
            .http
            .post(self.token_endpoint.clone())
            .header(ACCEPT, "application/json")
            .form(&payload[..])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ExchangeError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        parse_token_response(&body)
    }
}

pub(crate) fn parse_token_response(body: &str) -> Result<TokenResponse, ExchangeError> {
    let token: TokenResponse =
        serde_json::from_str(body).map_err(|err| ExchangeError::MalformedResponse {
            // serde's own message can quote values, so keep only the position
            message: format!(
                "{:?} error at line {} column {}",
                err.classify(),
                err.line(),
                err.column()
            ),
        })?;

    if token.access_token.is_empty() {
        return Err(ExchangeError::MalformedResponse {
            message: "access_token is empty".to_string(),
        });
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(server: &MockServer) -> BrokerConfig {
        BrokerConfig::new(
            "client-id",
            "http://localhost:3000/callback",
            Url::parse("https://provider.example/authorize").unwrap(),
            Url::parse(&format!("{}/oauth2/token", server.uri())).unwrap(),
        )
    }

    #[tokio::test]
    async fn posts_form_encoded_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("client_id=client-id"))
            .and(body_string_contains(
                "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback",
            ))
            .and(body_string_contains("code_verifier=the-verifier"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token":"tok123","refresh_token":"ref456","token_type":"bearer","expires_in":7200,"scope":"tweet.read"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpTokenExchange::new(&config(&server)).unwrap();
        let token = client
            .exchange("the-code", &CodeVerifier::new("the-verifier"))
            .await
            .unwrap();

        assert_eq!(token.access_token, "tok123");
        assert_eq!(token.refresh_token.as_deref(), Some("ref456"));
        assert_eq!(token.expires_in, Some(7200));
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .mount(&server)
            .await;

        let client = HttpTokenExchange::new(&config(&server)).unwrap();
        let err = client
            .exchange("code", &CodeVerifier::new("verifier"))
            .await
            .unwrap_err();

        match err {
            ExchangeError::HttpStatus { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_access_token_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token_type":"bearer"}"#))
            .mount(&server)
            .await;

        let client = HttpTokenExchange::new(&config(&server)).unwrap();
        let err = client
            .exchange("code", &CodeVerifier::new("verifier"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out_as_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"access_token":"late"}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = config(&server).with_exchange_timeout(Duration::from_millis(100));
        let client = HttpTokenExchange::new(&config).unwrap();
        let err = client
            .exchange("code", &CodeVerifier::new("verifier"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Network {
                timed_out: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        // bind then release a port so nothing is listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = BrokerConfig::new(
            "client-id",
            "http://localhost:3000/callback",
            Url::parse("https://provider.example/authorize").unwrap(),
            Url::parse(&format!("http://{addr}/oauth2/token")).unwrap(),
        );

        let client = HttpTokenExchange::new(&config).unwrap();
        let err = client
            .exchange("code", &CodeVerifier::new("verifier"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Network { .. }));
    }

    #[test]
    fn empty_access_token_is_malformed() {
        assert!(matches!(
            parse_token_response(r#"{"access_token":""}"#),
            Err(ExchangeError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_token_response("<html>nope</html>"),
            Err(ExchangeError::MalformedResponse { .. })
        ));
    }
}
