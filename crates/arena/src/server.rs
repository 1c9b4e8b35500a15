//! `ArenaServer` builder and server loop.
//!
//! This is the entry point for running an Arena server. It ties together
//! all the layers: the HTTP surface and the socket surface share one
//! [`SessionGateway`] and one [`EntitlementResolver`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arena_entitlement::{
    EntitlementResolver, OwnershipOracle, PurchaseLedger, ResolverConfig, SkinCatalog,
};
use arena_protocol::{JsonCodec, ServerEvent};
use arena_session::{SessionConfig, SessionGateway};
use arena_transport::{ConnectionId, Transport, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};

use crate::handler::handle_connection;
use crate::sweeper::run_sweeper;
use crate::{http, ArenaError, ServerConfig};

/// Outbound queue of one socket. The socket's writer task drains it.
pub(crate) type PeerSender = mpsc::Sender<ServerEvent>;

/// Events a socket may have queued before further ones are dropped.
pub(crate) const PEER_QUEUE_CAPACITY: usize = 64;

/// Shared server state passed to every HTTP handler and socket task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<L, O> {
    pub(crate) gateway: SessionGateway,
    pub(crate) entitlements: EntitlementResolver<L, O>,
    pub(crate) codec: JsonCodec,
    /// Connected sockets by id. Also serializes broadcasts: whoever holds
    /// this lock is the only one sending membership updates.
    pub(crate) peers: Mutex<HashMap<ConnectionId, PeerSender>>,
}

/// Builder for configuring and starting an Arena server.
///
/// # Example
///
/// ```rust,ignore
/// use arena::prelude::*;
///
/// let config = ServerConfig::from_env()?;
/// let server = ArenaServer::builder()
///     .from_config(&config)
///     .build(ledger, oracle, config.resolver_config())
///     .await?;
/// server.run().await
/// ```
pub struct ArenaServerBuilder {
    http_addr: String,
    ws_addr: String,
    session_config: SessionConfig,
    sweep_interval: Duration,
    catalog: SkinCatalog,
}

impl ArenaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            http_addr: "127.0.0.1:3001".to_string(),
            ws_addr: "127.0.0.1:3002".to_string(),
            session_config: SessionConfig::default(),
            sweep_interval: Duration::from_secs(30),
            catalog: SkinCatalog::default(),
        }
    }

    /// Takes addresses, room settings, and sweep interval from `config`.
    pub fn from_config(self, config: &ServerConfig) -> Self {
        self.http_addr(&config.http_addr)
            .ws_addr(&config.ws_addr)
            .session_config(config.session_config())
            .sweep_interval(config.sweep_interval)
    }

    /// Sets the address the HTTP API binds to.
    pub fn http_addr(mut self, addr: &str) -> Self {
        self.http_addr = addr.to_string();
        self
    }

    /// Sets the address the socket listener binds to.
    pub fn ws_addr(mut self, addr: &str) -> Self {
        self.ws_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// How often idle rooms are swept.
    pub fn sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_interval = every;
        self
    }

    /// Replaces the built-in skin catalog.
    pub fn catalog(mut self, catalog: SkinCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Binds both listeners and assembles the shared state.
    pub async fn build<L, O>(
        self,
        ledger: L,
        oracle: O,
        resolver_config: ResolverConfig,
    ) -> Result<ArenaServer<L, O>, ArenaError>
    where
        L: PurchaseLedger,
        O: OwnershipOracle,
    {
        let gateway = SessionGateway::new(self.session_config)?;
        let entitlements =
            EntitlementResolver::new(ledger, oracle, self.catalog, resolver_config);

        let http = TcpListener::bind(&self.http_addr).await?;
        tracing::info!(addr = %self.http_addr, "HTTP API listening");
        let transport = WebSocketTransport::bind(&self.ws_addr).await?;

        let state = Arc::new(ServerState {
            gateway,
            entitlements,
            codec: JsonCodec,
            peers: Mutex::new(HashMap::new()),
        });

        Ok(ArenaServer {
            http,
            transport,
            state,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for ArenaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Arena server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct ArenaServer<L, O> {
    http: TcpListener,
    transport: WebSocketTransport,
    state: Arc<ServerState<L, O>>,
    sweep_interval: Duration,
}

impl ArenaServer<(), ()> {
    /// Creates a new builder.
    pub fn builder() -> ArenaServerBuilder {
        ArenaServerBuilder::new()
    }
}

impl<L, O> ArenaServer<L, O>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    /// The address the HTTP API is bound to.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    /// The address the socket listener is bound to.
    ///
    /// Useful when binding to port 0 and letting the OS pick.
    pub fn ws_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Serves HTTP, accepts sockets, and sweeps idle rooms until the
    /// process is terminated or a listener fails.
    pub async fn run(self) -> Result<(), ArenaError> {
        tracing::info!("Arena server running");

        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&self.state),
            self.sweep_interval,
        ));

        let app = http::router(Arc::clone(&self.state));
        let result = tokio::select! {
            served = async { axum::serve(self.http, app).await } => {
                served.map_err(ArenaError::Io)
            }
            accepted = accept_loop(self.transport, Arc::clone(&self.state)) => accepted,
        };

        sweeper.abort();
        result
    }
}

/// Accepts sockets and spawns a handler task for each.
async fn accept_loop<L, O>(
    mut transport: WebSocketTransport,
    state: Arc<ServerState<L, O>>,
) -> Result<(), ArenaError>
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    loop {
        match transport.accept().await {
            Ok(conn) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(conn, state).await {
                        tracing::debug!(error = %e, "connection ended with error");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
            }
        }
    }
}
