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

//! Connection lifecycle hooks

use crate::Connection;
use async_trait::async_trait;

/// Server lifecycle hook trait
///
/// Implement this trait to observe connections coming and going.
/// All methods are async and have default implementations that do nothing.
/// Each hook is invoked at most once per connection.
///
/// # Example
///
/// ```no_run
/// use gridlink_service::{Connection, ServerHandler};
/// use async_trait::async_trait;
///
/// struct Greeter;
///
/// #[async_trait]
/// impl ServerHandler for Greeter {
///     async fn on_connection_start(&self, conn: &Connection) {
///         let _ = conn.send_msg(1, b"welcome").await;
///     }
/// }
/// ```
#[async_trait]
pub trait ServerHandler: Send + Sync + 'static {
    /// Called once the connection's write loop is running
    ///
    /// The read loop starts after this returns, so no request from this
    /// connection is dispatched before the hook completes.
    async fn on_connection_start(&self, _conn: &Connection) {}

    /// Called when the connection stops, before its socket is torn down
    ///
    /// The connection is already marked closed; sending to it fails, sending to
    /// other connections works.
    async fn on_connection_stop(&self, _conn: &Connection) {}
}

/// Callback-based hook implementation
///
/// This provides a way to supply hooks using closures instead of
/// implementing the `ServerHandler` trait.
///
/// # Example
///
/// ```no_run
/// use gridlink_service::CallbackHandler;
/// use std::sync::Arc;
///
/// let hooks = Arc::new(CallbackHandler {
///     on_connection_start: Some(Box::new(|conn| {
///         println!("Connection {} established", conn.id());
///     })),
///     ..Default::default()
/// });
/// ```
#[derive(Default)]
pub struct CallbackHandler {
    /// Called on connection start
    pub on_connection_start: Option<Box<dyn Fn(&Connection) + Send + Sync + 'static>>,
    /// Called on connection stop
    pub on_connection_stop: Option<Box<dyn Fn(&Connection) + Send + Sync + 'static>>,
}

#[async_trait]
impl ServerHandler for CallbackHandler {
    async fn on_connection_start(&self, conn: &Connection) {
        if let Some(ref f) = self.on_connection_start {
            f(conn);
        }
    }

    async fn on_connection_stop(&self, conn: &Connection) {
        if let Some(ref f) = self.on_connection_stop {
            f(conn);
        }
    }
}
