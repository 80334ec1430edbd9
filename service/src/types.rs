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

//! Core types for the Gridlink server

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Unique identifier for a connection (monotonically increasing from 0, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    /// Create a new connection ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the underlying u32 value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

impl From<ConnectionId> for u64 {
    fn from(id: ConnectionId) -> Self {
        id.0 as u64
    }
}

/// Connection information snapshot (for non-blocking queries)
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Peer address
    pub peer_addr: SocketAddr,
    /// When the connection was created
    pub created_at: Instant,
    /// Whether the connection has been stopped
    pub closed: bool,
    /// Number of properties currently set
    pub property_count: usize,
}

impl ConnectionInfo {
    /// Get the connection duration
    pub fn duration(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Server name
    pub name: String,
    /// Number of active connections
    pub active_connections: usize,
    /// Total connections since server start
    pub total_connections: u64,
    /// Server bind address
    pub bind_address: SocketAddr,
    /// Number of dispatcher workers (0 = task per request)
    pub worker_pool_size: usize,
    /// Server uptime
    pub uptime: Duration,
    /// Server start time
    pub started_at: Instant,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {{ active: {}, total: {}, addr: {}, workers: {}, uptime: {:?} }}",
            self.name,
            self.active_connections,
            self.total_connections,
            self.bind_address,
            self.worker_pool_size,
            self.uptime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id() {
        let id1 = ConnectionId::new(1);
        let id2 = ConnectionId::new(2);

        assert_eq!(id1.as_u32(), 1);
        assert_eq!(id2.as_u32(), 2);
        assert_ne!(id1, id2);
        assert!(id1 < id2);
        assert_eq!(id1.to_string(), "conn-1");
        assert_eq!(u64::from(id2), 2);
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = ServerSnapshot {
            name: "gridlink".to_string(),
            active_connections: 3,
            total_connections: 7,
            bind_address: "127.0.0.1:8999".parse().unwrap(),
            worker_pool_size: 10,
            uptime: Duration::from_secs(1),
            started_at: Instant::now(),
        };
        assert_eq!(
            snapshot.to_string(),
            "gridlink { active: 3, total: 7, addr: 127.0.0.1:8999, workers: 10, uptime: 1s }"
        );
    }
}
