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

//! Shared state of a running server

use crate::{ConnectionManager, Dispatcher, Router, ServerConfig, ServerHandler, ServerMetrics};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a running server shares with its connections
///
/// Created when the server starts and handed to every connection, so there is
/// no process-wide state.
pub struct ServerContext {
    config: ServerConfig,
    connections: Arc<ConnectionManager>,
    dispatcher: Dispatcher,
    hooks: Arc<dyn ServerHandler>,
    metrics: Arc<ServerMetrics>,
    shutdown: CancellationToken,
}

impl ServerContext {
    pub(crate) fn new(
        config: ServerConfig,
        connections: Arc<ConnectionManager>,
        metrics: Arc<ServerMetrics>,
        router: Arc<Router>,
        hooks: Arc<dyn ServerHandler>,
    ) -> Self {
        let dispatcher = Dispatcher::start(router, config.worker_pool(), metrics.clone());
        Self {
            config,
            connections,
            dispatcher,
            hooks,
            metrics,
            shutdown: CancellationToken::new(),
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Connection registry
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Request dispatcher
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Lifecycle hooks
    pub fn hooks(&self) -> &Arc<dyn ServerHandler> {
        &self.hooks
    }

    /// Server metrics
    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }

    /// Parent token of every connection's shutdown token
    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("name", &self.config.name)
            .field("connections", &self.connections.len())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
