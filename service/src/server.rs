//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Gridlink server implementation
//!
//! The Server is the main entry point. It owns the TCP listener and the route
//! table, accepts connections, enforces the connection cap, and coordinates
//! with the ConnectionManager and Dispatcher.

use crate::{
    ConnectionId, ConnectionManager, ConnectionWorker, RequestHandler, Result, Router,
    ServerConfig, ServerContext, ServerHandler, ServerMetrics, ServerSnapshot, ServiceError,
};
use metrics::counter;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Server state that only exists while it is running
#[derive(Default)]
struct RunState {
    listener: Option<TcpListener>,
    context: Option<Arc<ServerContext>>,
    accept_handle: Option<JoinHandle<()>>,
}

/// Gridlink server
///
/// This is the main server that accepts connections and manages their lifecycle.
///
/// # Example
///
/// ```no_run
/// use gridlink_service::{CallbackHandler, FnHandler, Request, Server, ServerConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut server = Server::bind(ServerConfig::default()).await?;
///     server.add_router(1, FnHandler::new(|request: Request| async move {
///         let _ = request.connection().send_msg(1, request.payload()).await;
///     }))?;
///
///     server.start(Arc::new(CallbackHandler::default()))?;
///
///     // Server is now running, wait for shutdown signal
///     // tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///
///     Ok(())
/// }
/// ```
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Route table, frozen at start
    router: Router,
    /// Connection registry
    connections: Arc<ConnectionManager>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Actual bind address
    bind_address: SocketAddr,
    /// Server creation time
    started_at: Instant,
    /// Running flag
    running: AtomicBool,
    /// Stops the accept loop
    shutdown: CancellationToken,
    /// Listener, context and accept task
    state: Mutex<RunState>,
}

impl Server {
    /// Create a new server with the given configuration
    ///
    /// This validates the configuration and binds to the configured address but
    /// does not start accepting connections. Call `start()` to begin.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_address).await?;
        let bind_address = listener.local_addr()?;

        tracing::info!(name = %config.name, "Server bound to {}", bind_address);

        Ok(Self {
            config,
            router: Router::new(),
            connections: Arc::new(ConnectionManager::new()),
            metrics: Arc::new(ServerMetrics::new()),
            bind_address,
            started_at: Instant::now(),
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            state: Mutex::new(RunState {
                listener: Some(listener),
                ..Default::default()
            }),
        })
    }

    /// Register a request handler for a message type
    ///
    /// Fails with [`ServiceError::DuplicateRoute`] if the type already has a
    /// handler, or [`ServiceError::RoutesFrozen`] once the server has started.
    pub fn add_router(&mut self, type_id: u32, handler: impl RequestHandler) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(ServiceError::RoutesFrozen);
        }
        self.router.add_route(type_id, handler)
    }

    /// The route table
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Start accepting connections
    ///
    /// Spawns the dispatcher workers and the accept loop, then returns.
    /// The server will continue running until `shutdown()` is called.
    pub fn start(&self, hooks: Arc<dyn ServerHandler>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::AlreadyRunning);
        }

        let mut state = self.state();
        let Some(listener) = state.listener.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Err(ServiceError::Other(
                "Server cannot be restarted after shutdown".to_string(),
            ));
        };

        tracing::info!(
            name = %self.config.name,
            routes = self.router.len(),
            "Starting server on {}",
            self.bind_address
        );

        let context = Arc::new(ServerContext::new(
            self.config.clone(),
            self.connections.clone(),
            self.metrics.clone(),
            Arc::new(self.router.clone()),
            hooks,
        ));

        state.accept_handle = Some(tokio::spawn(accept_loop(
            listener,
            context.clone(),
            self.shutdown.clone(),
        )));
        state.context = Some(context);

        Ok(())
    }

    /// Start the server and wait until it is shut down
    pub async fn serve(&self, hooks: Arc<dyn ServerHandler>) -> Result<()> {
        self.start(hooks)?;
        self.shutdown.cancelled().await;
        Ok(())
    }

    /// Shutdown the server gracefully
    ///
    /// This stops accepting new connections, stops every connection (running
    /// their stop hooks) and then stops the dispatcher workers.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::ServerNotRunning);
        }

        tracing::info!("Shutting down server");

        // Stop accepting
        self.shutdown.cancel();
        let (accept_handle, context) = {
            let mut state = self.state();
            (state.accept_handle.take(), state.context.take())
        };
        if let Some(handle) = accept_handle {
            join_accept_loop(handle, Duration::from_secs(5)).await;
        }

        if let Some(context) = context {
            context.connections().clear_all().await;
            context.shutdown_token().cancel();
            context.dispatcher().shutdown().await;
        }

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the server's bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the connection registry
    pub fn connection_manager(&self) -> Arc<ConnectionManager> {
        self.connections.clone()
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the running server's context
    pub fn context(&self) -> Option<Arc<ServerContext>> {
        self.state().context.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            name: self.config.name.clone(),
            active_connections: self.connections.len(),
            total_connections: self.metrics.total_connections(),
            bind_address: self.bind_address,
            worker_pool_size: self.config.worker_pool_size,
            uptime: self.started_at.elapsed(),
            started_at: self.started_at,
        }
    }

    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn join_accept_loop(handle: JoinHandle<()>, limit: Duration) {
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Accept loop task failed"),
        Err(_) => tracing::warn!("Timed out waiting for accept loop to stop"),
    }
}

/// Hands out connection ids in increasing order, never reusing one
#[derive(Debug)]
struct ConnectionIds {
    next: Option<u32>,
}

impl ConnectionIds {
    fn starting_at(first: u32) -> Self {
        Self { next: Some(first) }
    }

    /// `None` once every id has been handed out
    fn next_id(&mut self) -> Option<ConnectionId> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(ConnectionId::new(id))
    }
}

async fn accept_loop(
    listener: TcpListener,
    context: Arc<ServerContext>,
    shutdown: CancellationToken,
) {
    let max_connections = context.config().max_connections;
    let mut ids = ConnectionIds::starting_at(0);

    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (socket, peer_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
                // Back off on errors to avoid tight loop
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };
        tracing::debug!("Accepted connection from {}", peer_addr);

        if context.connections().len() >= max_connections {
            tracing::warn!(
                "Connection limit reached ({}), rejecting connection from {}",
                max_connections,
                peer_addr
            );
            context.metrics().connection_rejected();
            counter!("gridlink.connections.rejected").increment(1);
            drop(socket);
            continue;
        }

        let Some(id) = ids.next_id() else {
            tracing::error!(
                "Connection ids exhausted, no longer accepting connections from {}",
                peer_addr
            );
            drop(socket);
            break;
        };

        match ConnectionWorker::new(socket, peer_addr, id, context.clone()) {
            Ok(worker) => {
                context.connections().add(worker.connection().clone());
                context.metrics().connection_opened();
                tracing::info!("Connection {} established from {}", id, peer_addr);
                tokio::spawn(worker.run());
            }
            Err(e) => {
                tracing::error!("Failed to set up connection from {}: {}", peer_addr, e);
            }
        }
    }

    tracing::info!("Accept loop terminated");
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.config.name)
            .field("bind_address", &self.bind_address())
            .field("running", &self.is_running())
            .field("connection_count", &self.connection_count())
            .field("router", &self.router)
            .finish()
    }
}

// Implement Drop to ensure cleanup
impl Drop for Server {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("Server dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown.cancel();
            if let Some(context) = self.state().context.take() {
                context.shutdown_token().cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CallbackHandler;
    use async_trait::async_trait;
    use tracing_test::traced_test;

    struct Nothing;

    #[async_trait]
    impl RequestHandler for Nothing {}

    #[test]
    fn test_connection_ids_are_never_reused() {
        let mut ids = ConnectionIds::starting_at(0);
        assert_eq!(ids.next_id(), Some(ConnectionId::new(0)));
        assert_eq!(ids.next_id(), Some(ConnectionId::new(1)));

        let mut ids = ConnectionIds::starting_at(u32::MAX - 1);
        assert_eq!(ids.next_id(), Some(ConnectionId::new(u32::MAX - 1)));
        assert_eq!(ids.next_id(), Some(ConnectionId::new(u32::MAX)));
        assert_eq!(ids.next_id(), None);
        assert_eq!(ids.next_id(), None);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_accept_loop_failure_is_logged() {
        let failed: JoinHandle<()> = tokio::spawn(async { panic!("accept loop blew up") });
        join_accept_loop(failed, Duration::from_secs(1)).await;
        assert!(logs_contain("Accept loop task failed"));

        let stuck = tokio::spawn(std::future::pending::<()>());
        join_accept_loop(stuck, Duration::from_millis(10)).await;
        assert!(logs_contain("Timed out waiting for accept loop to stop"));
    }

    fn local_config() -> ServerConfig {
        ServerConfig::new("127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let server = Server::bind(local_config()).await.unwrap();
        assert!(!server.is_running());
        assert_ne!(server.bind_address().port(), 0);

        server.start(Arc::new(CallbackHandler::default())).unwrap();
        assert!(server.is_running());
        assert!(server.context().is_some());

        server.shutdown().await.unwrap();
        assert!(!server.is_running());
        assert!(matches!(
            server.shutdown().await,
            Err(ServiceError::ServerNotRunning)
        ));
    }

    #[tokio::test]
    async fn test_server_snapshot() {
        let server = Server::bind(local_config().with_name("snap")).await.unwrap();
        let snapshot = server.snapshot();

        assert_eq!(snapshot.name, "snap");
        assert_eq!(snapshot.active_connections, 0);
        assert_eq!(snapshot.total_connections, 0);
    }

    #[tokio::test]
    async fn test_server_double_start() {
        let server = Server::bind(local_config()).await.unwrap();
        server.start(Arc::new(CallbackHandler::default())).unwrap();

        // Second start should fail
        let result = server.start(Arc::new(CallbackHandler::default()));
        assert!(matches!(result, Err(ServiceError::AlreadyRunning)));

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_routes_frozen_after_start() {
        let mut server = Server::bind(local_config()).await.unwrap();
        server.add_router(1, Nothing).unwrap();
        assert!(matches!(
            server.add_router(1, Nothing),
            Err(ServiceError::DuplicateRoute(1))
        ));

        server.start(Arc::new(CallbackHandler::default())).unwrap();
        assert!(matches!(
            server.add_router(2, Nothing),
            Err(ServiceError::RoutesFrozen)
        ));
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_bind() {
        let err = Server::bind(local_config().with_max_connections(0))
            .await
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
