//! `DuelServer` builder and accept loop.
//!
//! This is the entry point for running a duelroom server. It ties
//! together the layers: transport → protocol → coordinator.

use std::net::SocketAddr;
use std::sync::Arc;

use duelroom_protocol::JsonCodec;
use duelroom_room::Coordinator;
use duelroom_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{DuelError, Outbox, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) coordinator: Arc<Coordinator<Outbox>>,
    pub(crate) outbox: Outbox,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a duelroom server.
///
/// # Example
///
/// ```rust,no_run
/// use duelroom::prelude::*;
///
/// # async fn start() -> Result<(), DuelError> {
/// let server = DuelServer::builder().bind("0.0.0.0:3001").build().await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DuelServerBuilder {
    config: ServerConfig,
}

impl DuelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and sets up the coordinator.
    pub async fn build(self) -> Result<DuelServer, DuelError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let outbox = Outbox::new();
        let state = Arc::new(ServerState {
            coordinator: Arc::new(Coordinator::new(outbox.clone())),
            outbox,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(DuelServer { transport, state })
    }
}

/// A bound duelroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DuelServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl DuelServer {
    /// Creates a new builder.
    pub fn builder() -> DuelServerBuilder {
        DuelServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, DuelError> {
        Ok(self
            .transport
            .local_addr()
            .map_err(duelroom_transport::TransportError::AcceptFailed)?)
    }

    /// The coordinator every connection talks to.
    pub fn coordinator(&self) -> Arc<Coordinator<Outbox>> {
        Arc::clone(&self.state.coordinator)
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), DuelError> {
        tracing::info!(addr = %self.state.config.bind_addr, "duelroom server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
