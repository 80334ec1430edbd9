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

//! Connection handle
//!
//! A [`Connection`] is the handle handlers and hooks hold on to. It does not own
//! the socket; the read and write loops live in the
//! [`ConnectionWorker`](crate::ConnectionWorker) and are coupled to the handle
//! by an outbound channel and a cancellation token.

use crate::{
    ConnectionId, ConnectionInfo, PropertyValue, Result, ServerContext, ServiceError,
};
use bytes::Bytes;
use gridlink_codec::encode_frame;
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

/// Close state, guarded by a single lock so that stop and send never race
struct CloseState {
    closed: bool,
    outbound: Option<mpsc::Sender<Bytes>>,
}

struct ConnectionInner {
    id: ConnectionId,
    peer_addr: SocketAddr,
    created_at: Instant,
    state: Mutex<CloseState>,
    shutdown: CancellationToken,
    properties: RwLock<HashMap<String, PropertyValue>>,
    context: Arc<ServerContext>,
}

/// A client connection
///
/// Cheap to clone; every clone refers to the same underlying connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        outbound: mpsc::Sender<Bytes>,
        context: Arc<ServerContext>,
    ) -> Self {
        let shutdown = context.shutdown_token().child_token();
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                peer_addr,
                created_at: Instant::now(),
                state: Mutex::new(CloseState {
                    closed: false,
                    outbound: Some(outbound),
                }),
                shutdown,
                properties: RwLock::new(HashMap::new()),
                context,
            }),
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer_addr
    }

    /// Get when the connection was created
    pub fn created_at(&self) -> Instant {
        self.inner.created_at
    }

    /// Check whether the connection has been stopped
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// The server context this connection belongs to
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.inner.context
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    /// Frame a message and hand it to the write loop
    ///
    /// Waits until the write loop has room for the frame, so a slow peer slows
    /// down whoever is sending to it. Fails with
    /// [`ServiceError::ConnectionClosed`] once the connection has been stopped,
    /// including when the stop happens while this call is waiting.
    #[instrument(skip(self, payload), fields(connection_id = %self.inner.id))]
    pub async fn send_msg(&self, type_id: u32, payload: impl AsRef<[u8]>) -> Result<()> {
        let frame = encode_frame(type_id, payload.as_ref())?;
        self.send_encoded(frame).await
    }

    /// Hand an already framed message to the write loop
    pub(crate) async fn send_encoded(&self, frame: Bytes) -> Result<()> {
        let outbound = {
            let state = self.state();
            if state.closed {
                return Err(ServiceError::ConnectionClosed);
            }
            state
                .outbound
                .clone()
                .ok_or(ServiceError::ConnectionClosed)?
        };

        trace!(bytes = frame.len(), "Queueing frame");
        tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => Err(ServiceError::ConnectionClosed),
            sent = outbound.send(frame) => sent.map_err(|_| ServiceError::ConnectionClosed),
        }
    }

    /// Stop the connection
    ///
    /// The first call runs the stop hook, signals both loops to exit, removes the
    /// connection from the registry and releases the outbound channel. Later
    /// calls, including concurrent ones, return immediately.
    #[instrument(skip(self), fields(connection_id = %self.inner.id))]
    pub async fn stop(&self) {
        let outbound = {
            let mut state = self.state();
            if state.closed {
                return;
            }
            state.closed = true;
            state.outbound.take()
        };

        info!(peer_addr = %self.inner.peer_addr, "Stopping connection");

        let context = &self.inner.context;
        context.hooks().on_connection_stop(self).await;

        self.inner.shutdown.cancel();
        context.connections().remove(self.inner.id);
        drop(outbound);

        context
            .metrics()
            .connection_closed(self.inner.created_at.elapsed());
        counter!("gridlink.connections.closed").increment(1);
        gauge!("gridlink.connections.active").decrement(1.0);
        debug!("Connection stopped");
    }

    /// Store a property on this connection
    ///
    /// # Example
    /// ```no_run
    /// # use gridlink_service::Connection;
    /// # fn example(conn: &Connection) {
    /// conn.set_property("playerId", 12345i64);
    /// conn.set_property("name", "player1");
    /// # }
    /// ```
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.inner
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Retrieve a property
    ///
    /// Fails with [`ServiceError::PropertyNotFound`] when the key is absent.
    pub fn get_property(&self, key: &str) -> Result<PropertyValue> {
        self.inner
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::PropertyNotFound(key.to_string()))
    }

    /// Retrieve a property as a concrete type
    ///
    /// # Example
    /// ```no_run
    /// # use gridlink_service::Connection;
    /// # fn example(conn: &Connection) -> gridlink_service::Result<()> {
    /// let player_id: i64 = conn.get_property_as("playerId")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_property_as<T>(&self, key: &str) -> Result<T>
    where
        T: TryFrom<PropertyValue, Error = PropertyValue>,
    {
        T::try_from(self.get_property(key)?).map_err(|_| ServiceError::PropertyType {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Remove a property, returning its previous value
    pub fn remove_property(&self, key: &str) -> Option<PropertyValue> {
        self.inner
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Check if a property exists
    pub fn has_property(&self, key: &str) -> bool {
        self.inner
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Get a snapshot of this connection
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.inner.id,
            peer_addr: self.inner.peer_addr,
            created_at: self.inner.created_at,
            closed: self.is_closed(),
            property_count: self
                .inner
                .properties
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }

    fn state(&self) -> MutexGuard<'_, CloseState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("peer_addr", &self.inner.peer_addr)
            .field("created_at", &self.inner.created_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}
