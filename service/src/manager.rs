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

//! Connection manager implementation
//!
//! The ConnectionManager is the registry of live connections. It is responsible for:
//! - Tracking connections by id
//! - Fanning a frame out to a set of connections
//! - Stopping every connection on server shutdown

use crate::{Connection, ConnectionId, Result, ServiceError};
use bytes::Bytes;
use dashmap::DashMap;
use gridlink_codec::encode_frame;
use tracing::{debug, info};

/// Result of a broadcast operation
#[derive(Debug, Clone, Default)]
pub struct BroadcastResult {
    /// Total number of connections attempted
    pub total: usize,
    /// Number of successful sends
    pub succeeded: usize,
    /// Number of failed sends
    pub failed: usize,
    /// Errors that occurred (ConnectionId and error message)
    pub errors: Vec<(ConnectionId, String)>,
}

impl BroadcastResult {
    /// Check if all broadcasts succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Get the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }

    fn record(&mut self, id: ConnectionId, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push((id, e.to_string()));
            }
        }
    }
}

/// Connection registry
#[derive(Default)]
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Connection>,
}

impl ConnectionManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection
    pub fn add(&self, connection: Connection) {
        let id = connection.id();
        self.connections.insert(id, connection);
        debug!(connection_id = %id, total = self.connections.len(), "Connection registered");
    }

    /// Unregister a connection, returning it if it was present
    pub fn remove(&self, id: ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove(&id).map(|(_, conn)| conn);
        if removed.is_some() {
            debug!(connection_id = %id, total = self.connections.len(), "Connection unregistered");
        }
        removed
    }

    /// Get a connection by ID
    pub fn get(&self, id: ConnectionId) -> Result<Connection> {
        self.connections
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(ServiceError::ConnectionNotFound(id))
    }

    /// Check if a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Get the number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check whether no connections are registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Get all connection IDs
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Get handles to all registered connections
    pub fn connections(&self) -> Vec<Connection> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Send a frame to the given connections
    ///
    /// The frame is encoded once and handed to every connection concurrently.
    /// Unknown ids count as failures.
    pub async fn send_to(
        &self,
        ids: impl IntoIterator<Item = ConnectionId>,
        type_id: u32,
        payload: impl AsRef<[u8]>,
    ) -> Result<BroadcastResult> {
        let frame = encode_frame(type_id, payload.as_ref())?;
        let mut result = BroadcastResult::default();
        let mut targets = Vec::new();
        for id in ids {
            result.total += 1;
            match self.get(id) {
                Ok(conn) => targets.push(conn),
                Err(e) => result.record(id, Err(e)),
            }
        }
        Ok(Self::fan_out(result, targets, frame).await)
    }

    /// Send a frame to every registered connection
    pub async fn broadcast(&self, type_id: u32, payload: impl AsRef<[u8]>) -> Result<BroadcastResult> {
        let frame = encode_frame(type_id, payload.as_ref())?;
        let targets = self.connections();
        let result = BroadcastResult {
            total: targets.len(),
            ..Default::default()
        };
        Ok(Self::fan_out(result, targets, frame).await)
    }

    async fn fan_out(
        mut result: BroadcastResult,
        targets: Vec<Connection>,
        frame: Bytes,
    ) -> BroadcastResult {
        let sends = targets.into_iter().map(|conn| {
            let frame = frame.clone();
            async move { (conn.id(), conn.send_encoded(frame).await) }
        });

        for (id, outcome) in futures_util::future::join_all(sends).await {
            result.record(id, outcome);
        }
        result
    }

    /// Stop every connection and empty the registry
    ///
    /// Connections are stopped concurrently, in no particular order.
    pub async fn clear_all(&self) {
        let connections = self.connections();
        info!(count = connections.len(), "Stopping all connections");

        futures_util::future::join_all(connections.iter().map(|conn| conn.stop())).await;
        self.connections.clear();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connection_count", &self.len())
            .finish()
    }
}
