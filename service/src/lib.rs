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

//! Gridlink Server Implementation
//!
//! An async TCP server for real-time multiplayer services. Clients exchange
//! length-prefixed frames (see `gridlink-codec`); each decoded frame becomes a
//! [`Request`] that is routed by message type to a [`RequestHandler`].
//!
//! - One read loop and one write loop per connection
//! - A fixed worker pool; requests from one connection always run in order
//! - A connection cap enforced at accept time
//! - A typed per-connection property bag
//! - Lock-free metrics and monitoring
//!
//! # Architecture
//!
//! ```text
//! Server ── accept ──> ConnectionWorker ── read loop ──> Dispatcher ──> Router ──> RequestHandler
//!   │                        │                            (worker = id % pool)
//!   │                        └── write loop <── Connection::send_msg
//!   └── ConnectionManager (registry), ServerHandler (lifecycle hooks)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gridlink_service::{CallbackHandler, Request, RequestHandler, Server, ServerConfig};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Ping;
//!
//! #[async_trait]
//! impl RequestHandler for Ping {
//!     async fn handle(&self, request: &Request) {
//!         let _ = request.connection().send_msg(1, b"pong").await;
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind(ServerConfig::default()).await?;
//!     server.add_router(0, Ping)?;
//!     server.serve(Arc::new(CallbackHandler::default())).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod config;
mod connection;
mod context;
mod dispatcher;
mod error;
mod handler;
mod manager;
mod metrics;
mod property;
mod request;
mod router;
mod server;
mod types;
mod worker;

pub use config::ServerConfig;
pub use connection::Connection;
pub use context::ServerContext;
pub use dispatcher::{Dispatcher, WorkerPoolConfig};
pub use error::{Result, ServiceError};
pub use handler::{CallbackHandler, ServerHandler};
pub use manager::{BroadcastResult, ConnectionManager};
pub use crate::metrics::{MetricsSnapshot, ServerMetrics};
pub use property::PropertyValue;
pub use request::Request;
pub use router::{FnHandler, RequestHandler, Router};
pub use server::Server;
pub use types::{ConnectionId, ConnectionInfo, ServerSnapshot};
pub use worker::ConnectionWorker;
