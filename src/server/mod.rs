//! HTTP surface: `/`, `/start` and `/callback` on top of a [`Broker`].

mod routes;
mod sink;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::{Broker, BrokerError};

pub use routes::{AppState, router};
pub use sink::{CredentialSink, HtmlSink, JsonSink, failure_status};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct BrokerServer {
    state: AppState,
    sweep_interval: Duration,
}

impl BrokerServer {
    pub fn new(broker: Broker) -> Self {
        Self {
            state: AppState {
                broker,
                sink: Arc::new(HtmlSink),
            },
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn CredentialSink>) -> Self {
        self.state.sink = sink;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub async fn bind(addr: SocketAddr) -> Result<TcpListener, BrokerError> {
        Ok(TcpListener::bind(addr).await?)
    }

    /// Serves until `shutdown` resolves. Expired sessions are swept in the
    /// background for the lifetime of the server.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), BrokerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper = self
            .state
            .broker
            .store()
            .spawn_sweeper(self.sweep_interval);

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "broker listening");
        }

        let app = router(self.state);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        tracing::info!("broker stopped");
        Ok(result?)
    }
}
