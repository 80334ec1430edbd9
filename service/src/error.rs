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

//! Error types for the Gridlink server

use crate::types::ConnectionId;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Gridlink server error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the codec layer
    #[error("Protocol error: {0}")]
    Codec(#[from] gridlink_codec::CodecError),

    /// Connection with the given ID was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// No property stored under the key
    #[error("Property '{0}' not found")]
    PropertyNotFound(String),

    /// Property exists but holds a different kind of value
    #[error("Property '{key}' is not of type {expected}")]
    PropertyType {
        /// Property key
        key: String,
        /// Name of the requested type
        expected: &'static str,
    },

    /// A handler is already registered for this message type
    #[error("Route for message type {0} already registered")]
    DuplicateRoute(u32),

    /// Routes cannot change once the server has started
    #[error("Routes cannot be added after the server has started")]
    RoutesFrozen,

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Server was started twice
    #[error("Server already running")]
    AlreadyRunning,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Generic error with a message
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ServiceError::ConnectionNotFound(_)
                | ServiceError::ConnectionClosed
                | ServiceError::Io(_)
        )
    }

    /// Check if the error came from a malformed or oversize frame
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, ServiceError::Codec(codec) if !codec.is_io())
    }

    /// Check if the error must abort startup
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ServiceError::DuplicateRoute(_)
                | ServiceError::RoutesFrozen
                | ServiceError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_codec::CodecError;

    #[test]
    fn test_error_is_connection_error() {
        assert!(ServiceError::ConnectionNotFound(ConnectionId::new(1)).is_connection_error());
        assert!(ServiceError::ConnectionClosed.is_connection_error());
        assert!(!ServiceError::RoutesFrozen.is_connection_error());
    }

    #[test]
    fn test_error_is_protocol_error() {
        let err = ServiceError::from(CodecError::PayloadTooLarge {
            length: 5000,
            max: 4096,
        });
        assert!(err.is_protocol_error());

        let err = ServiceError::from(CodecError::from(std::io::Error::other("reset")));
        assert!(!err.is_protocol_error());
        assert!(!ServiceError::ConnectionClosed.is_protocol_error());
    }

    #[test]
    fn test_error_is_configuration_error() {
        assert!(ServiceError::DuplicateRoute(3).is_configuration_error());
        assert!(ServiceError::InvalidConfig("bad".into()).is_configuration_error());
        assert!(!ServiceError::PropertyNotFound("pid".into()).is_configuration_error());
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::ConnectionNotFound(ConnectionId::new(42));
        assert_eq!(err.to_string(), "Connection conn-42 not found");

        let err = ServiceError::PropertyType {
            key: "playerId".into(),
            expected: "i64",
        };
        assert_eq!(err.to_string(), "Property 'playerId' is not of type i64");
    }
}
