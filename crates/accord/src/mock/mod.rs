//! Consumer-side mock server.
//!
//! The mock answers incoming requests with the example response of the first
//! programmed interaction whose request expectation matches. Programming is
//! serialized through a lock-protected interaction table; every received
//! request is recorded, and requests nothing matched are kept separately so a
//! session can report them.

mod handler;
pub mod response;

pub use handler::UnmatchedRequest;

use handler::handle_mock_request;

use crate::error::ContractError;
use crate::interaction::{Interaction, ObservedRequest};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Control endpoint that switches the mock's current provider state. The
/// body is the one the verifier posts for state setup:
/// `{"consumer": .., "state": .., "action": "setup"}`.
pub const PROVIDER_STATES_PATH: &str = "/_accord/provider-states";

/// Shared state between the server task and its owner.
#[derive(Default)]
pub(crate) struct MockState {
    pub(crate) interactions: RwLock<Vec<Interaction>>,
    pub(crate) received: RwLock<Vec<ObservedRequest>>,
    pub(crate) unmatched: RwLock<Vec<UnmatchedRequest>>,
    pub(crate) provider_state: RwLock<Option<String>>,
}

/// A running mock server. Shuts down when dropped.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl MockServer {
    /// Bind to `host:port` (port 0 picks an ephemeral port) and start serving.
    pub async fn start(host: &str, port: u16) -> Result<Self, ContractError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ContractError::Bind {
                addr: format!("{host}:{port}"),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| ContractError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })?;
        info!("Mock server bound to {}", addr);

        let state = Arc::new(MockState::default());
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut shutdown_rx = shutdown_tx.subscribe();
        let server_state = Arc::clone(&state);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = Arc::clone(&server_state);
                                tokio::spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        let state = Arc::clone(&state);
                                        async move { handle_mock_request(req, state).await }
                                    });
                                    if let Err(e) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Mock connection error on {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Mock accept error on {}: {}", addr, e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Mock server on {} shutting down", addr);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            addr,
            state,
            shutdown_tx,
        })
    }

    /// Start a mock pre-programmed with `interactions`.
    pub async fn with_interactions(
        host: &str,
        port: u16,
        interactions: Vec<Interaction>,
    ) -> Result<Self, ContractError> {
        let server = Self::start(host, port).await?;
        server.set_interactions(interactions);
        Ok(server)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for clients. A wildcard bind address is reached via loopback.
    pub fn base_url(&self) -> String {
        if self.addr.ip().is_unspecified() {
            format!("http://127.0.0.1:{}", self.addr.port())
        } else {
            format!("http://{}", self.addr)
        }
    }

    /// Interactions declared for this state are matched before all others.
    pub fn set_provider_state(&self, state: Option<String>) {
        *self.state.provider_state.write() = state;
    }

    pub fn provider_state(&self) -> Option<String> {
        self.state.provider_state.read().clone()
    }

    /// Add an interaction. Among interactions of equal state preference,
    /// earlier ones win when several match.
    pub fn program(&self, interaction: Interaction) {
        debug!("Programming mock with '{}'", interaction.label());
        self.state.interactions.write().push(interaction);
    }

    /// Remove the interaction with this `(description, providerState)`.
    pub fn unprogram(&self, description: &str, provider_state: Option<&str>) -> bool {
        let mut interactions = self.state.interactions.write();
        let before = interactions.len();
        interactions.retain(|i| i.key() != (description, provider_state));
        interactions.len() != before
    }

    pub fn set_interactions(&self, interactions: Vec<Interaction>) {
        *self.state.interactions.write() = interactions;
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.state.interactions.read().clone()
    }

    /// Every request received so far, in arrival order.
    pub fn received_requests(&self) -> Vec<ObservedRequest> {
        self.state.received.read().clone()
    }

    /// Requests no programmed interaction matched.
    pub fn unmatched_requests(&self) -> Vec<UnmatchedRequest> {
        self.state.unmatched.read().clone()
    }

    pub fn clear_requests(&self) {
        self.state.received.write().clear();
        self.state.unmatched.write().clear();
    }

    /// Stop accepting connections.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
