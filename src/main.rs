use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use pkce_broker::server::{BrokerServer, CredentialSink, HtmlSink, JsonSink};
use pkce_broker::{Broker, BrokerConfig, BrokerError, ProviderEndpoints};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "pkce-broker",
    about = "Run an OAuth 2.0 authorization-code + PKCE broker."
)]
struct Cli {
    #[arg(long, env = "CLIENT_ID")]
    client_id: String,

    #[arg(long, env = "REDIRECT_URI")]
    redirect_uri: String,

    /// Space or comma separated. Defaults to the provider's scopes.
    #[arg(long, env = "SCOPES")]
    scopes: Option<String>,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, env = "PROVIDER", value_enum, default_value_t = Provider::Twitter)]
    provider: Provider,

    #[arg(long, env = "AUTHORIZATION_ENDPOINT")]
    authorization_endpoint: Option<Url>,

    #[arg(long, env = "TOKEN_ENDPOINT")]
    token_endpoint: Option<Url>,

    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 600)]
    session_ttl_secs: u64,

    #[arg(long, env = "EXCHANGE_TIMEOUT_SECS", default_value_t = 10)]
    exchange_timeout_secs: u64,

    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    sweep_interval_secs: u64,

    #[arg(long, env = "SINK", value_enum, default_value_t = Sink::Html)]
    sink: Sink,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Provider {
    Twitter,
    Custom,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Sink {
    Html,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), BrokerError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = build_config(&cli)?;
    let broker = Broker::new(config)?;
    let sink: Arc<dyn CredentialSink> = match cli.sink {
        Sink::Html => Arc::new(HtmlSink),
        Sink::Json => Arc::new(JsonSink),
    };

    let listener = BrokerServer::bind(SocketAddr::new(cli.host, cli.port)).await?;
    BrokerServer::new(broker)
        .with_sink(sink)
        .with_sweep_interval(Duration::from_secs(cli.sweep_interval_secs.max(1)))
        .serve(listener, shutdown_signal())
        .await
}

fn build_config(cli: &Cli) -> Result<BrokerConfig, BrokerError> {
    let config = match cli.provider {
        Provider::Twitter => {
            let mut config = BrokerConfig::for_provider(
                ProviderEndpoints::twitter(),
                &cli.client_id,
                &cli.redirect_uri,
            )?;
            if let Some(endpoint) = &cli.authorization_endpoint {
                config.authorization_endpoint = endpoint.clone();
            }
            if let Some(endpoint) = &cli.token_endpoint {
                config.token_endpoint = endpoint.clone();
            }
            config
        }
        Provider::Custom => {
            let (Some(authorization), Some(token)) =
                (&cli.authorization_endpoint, &cli.token_endpoint)
            else {
                return Err(BrokerError::InvalidConfig(
                    "custom provider needs --authorization-endpoint and --token-endpoint"
                        .to_string(),
                ));
            };
            BrokerConfig::new(
                &cli.client_id,
                &cli.redirect_uri,
                authorization.clone(),
                token.clone(),
            )
        }
    };

    let config = match &cli.scopes {
        Some(scopes) => config.with_scopes(
            scopes
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|scope| !scope.is_empty()),
        ),
        None => config,
    };

    Ok(config
        .with_session_ttl(Duration::from_secs(cli.session_ttl_secs))
        .with_exchange_timeout(Duration::from_secs(cli.exchange_timeout_secs)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
