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

//! Server configuration

use crate::{Result, ServiceError, WorkerPoolConfig};
use serde::{Deserialize, Deserializer};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Server configuration
///
/// This structure contains all configuration options for the Gridlink server.
/// Use the builder pattern methods to customize the configuration, or load it
/// from JSON where missing keys keep their defaults.
///
/// # Example
///
/// ```
/// use gridlink_service::ServerConfig;
///
/// let config = ServerConfig::default()
///     .with_name("mmo")
///     .with_max_connections(500)
///     .with_worker_pool_size(4);
/// assert!(config.validate().is_ok());
///
/// let config = ServerConfig::from_json_str(r#"{ "max_connections": 64 }"#).unwrap();
/// assert_eq!(config.max_connections, 64);
/// assert_eq!(config.max_frame_size, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server name, used in logs and snapshots
    pub name: String,

    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections
    ///
    /// Sockets accepted while the registry is at this size are closed immediately.
    pub max_connections: usize,

    /// Maximum frame payload size in bytes (0 disables the limit)
    pub max_frame_size: u32,

    /// Number of dispatcher workers
    ///
    /// 0 runs every request on its own task, with no ordering guarantee.
    pub worker_pool_size: usize,

    /// Capacity of each worker's request queue
    pub worker_queue_capacity: usize,

    /// Capacity of each connection's outbound channel
    pub outbound_buffer: usize,

    /// Longest a single frame write may take before the connection is stopped
    ///
    /// Read from JSON as `write_timeout_ms`.
    #[serde(rename = "write_timeout_ms", deserialize_with = "duration_from_millis")]
    pub write_timeout: Duration,
}

fn duration_from_millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "gridlink".to_string(),
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8999)),
            max_connections: 1000,
            max_frame_size: 4096,
            worker_pool_size: 10,
            worker_queue_capacity: 1024,
            outbound_buffer: 1,
            write_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Parse a configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ServiceError::InvalidConfig(e.to_string()))
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "Loaded server configuration");
        Ok(config)
    }

    /// Set the server name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the bind address
    pub fn with_bind_address(mut self, bind_address: SocketAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the maximum frame payload size (0 for unlimited)
    pub fn with_max_frame_size(mut self, max: u32) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Set the number of dispatcher workers
    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size;
        self
    }

    /// Set the per-worker queue capacity
    pub fn with_worker_queue_capacity(mut self, capacity: usize) -> Self {
        self.worker_queue_capacity = capacity;
        self
    }

    /// Set the per-connection outbound channel capacity
    pub fn with_outbound_buffer(mut self, capacity: usize) -> Self {
        self.outbound_buffer = capacity;
        self
    }

    /// Set the per-frame write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// The frame size limit as understood by the codec
    pub fn frame_limit(&self) -> Option<u32> {
        (self.max_frame_size > 0).then_some(self.max_frame_size)
    }

    /// Dispatcher settings derived from this configuration
    pub fn worker_pool(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            pool_size: self.worker_pool_size,
            queue_capacity: self.worker_queue_capacity,
        }
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(ServiceError::InvalidConfig(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.worker_pool_size > 0 && self.worker_queue_capacity == 0 {
            return Err(ServiceError::InvalidConfig(
                "worker_queue_capacity must be greater than 0".to_string(),
            ));
        }

        if self.outbound_buffer == 0 {
            return Err(ServiceError::InvalidConfig(
                "outbound_buffer must be greater than 0".to_string(),
            ));
        }

        if self.write_timeout.is_zero() {
            return Err(ServiceError::InvalidConfig(
                "write_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.max_frame_size, 4096);
        assert_eq!(config.worker_pool_size, 10);
        assert_eq!(config.bind_address.port(), 8999);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::default()
            .with_max_connections(500)
            .with_max_frame_size(0)
            .with_worker_pool_size(0);

        assert_eq!(config.max_connections, 500);
        assert_eq!(config.frame_limit(), None);
        assert_eq!(config.worker_pool().pool_size, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();

        // Invalid: zero max_connections
        config.max_connections = 0;
        assert!(config.validate().is_err());

        // Invalid: workers without queues
        config.max_connections = 1000;
        config.worker_queue_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ServiceError::InvalidConfig(_))
        ));

        // Fine once workers are disabled
        config.worker_pool_size = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = ServerConfig::from_json_str(
            r#"{ "name": "mmo", "bind_address": "127.0.0.1:7777", "worker_pool_size": 4 }"#,
        )
        .unwrap();
        assert_eq!(config.name, "mmo");
        assert_eq!(config.bind_address, "127.0.0.1:7777".parse().unwrap());
        assert_eq!(config.worker_pool_size, 4);
        assert_eq!(config.max_connections, 1000);

        let err = ServerConfig::from_json_str(r#"{ "max_connections": "many" }"#).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_write_timeout() {
        let config = ServerConfig::default();
        assert_eq!(config.write_timeout, Duration::from_secs(30));

        let config = ServerConfig::from_json_str(r#"{ "write_timeout_ms": 250 }"#).unwrap();
        assert_eq!(config.write_timeout, Duration::from_millis(250));

        let config = ServerConfig::default().with_write_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ServiceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_missing_file() {
        let err = ServerConfig::from_json_file("/nonexistent/gridlink.json").unwrap_err();
        assert!(matches!(err, ServiceError::Io(_)));
    }
}
