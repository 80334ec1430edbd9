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

//! Connection worker implementation
//!
//! The ConnectionWorker owns the socket of a single connection and runs:
//! - The write loop, draining the outbound channel onto the socket
//! - The start hook, once the write loop is up
//! - The read loop, decoding frames and handing them to the dispatcher
//! - Teardown, by stopping the connection when either loop fails

use crate::{Connection, ConnectionId, Request, Result, ServerContext};
use bytes::Bytes;
use futures_util::StreamExt;
use gridlink_codec::{FrameCodec, HEADER_LEN};
use metrics::{counter, gauge};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

/// Connection worker that runs a single connection's read and write loops
pub struct ConnectionWorker {
    connection: Connection,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    outbound: mpsc::Receiver<Bytes>,
    context: Arc<ServerContext>,
}

impl ConnectionWorker {
    /// Wrap an accepted socket
    pub fn new(
        socket: TcpStream,
        peer_addr: SocketAddr,
        id: ConnectionId,
        context: Arc<ServerContext>,
    ) -> Result<Self> {
        socket.set_nodelay(true)?;
        let (reader, writer) = socket.into_split();
        let (tx, outbound) = mpsc::channel(context.config().outbound_buffer.max(1));
        let connection = Connection::new(id, peer_addr, tx, context.clone());

        info!(connection_id = %id, peer_addr = %peer_addr, "Creating new connection");
        counter!("gridlink.connections.total").increment(1);
        gauge!("gridlink.connections.active").increment(1.0);

        Ok(Self {
            connection,
            reader,
            writer,
            outbound,
            context,
        })
    }

    /// The connection handle served by this worker
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Run the connection until it stops
    pub async fn run(self) {
        let Self {
            connection,
            reader,
            writer,
            outbound,
            context,
        } = self;
        let span = info_span!("connection", connection_id = %connection.id());

        async move {
            let write_task = tokio::spawn(
                write_loop(connection.clone(), writer, outbound, context.clone())
                    .in_current_span(),
            );

            if !connection.is_closed() {
                context.hooks().on_connection_start(&connection).await;
            }

            read_loop(&connection, reader, &context).await;
            connection.stop().await;

            if let Err(e) = write_task.await {
                error!(error = %e, "Write loop task failed");
            }
            debug!("Connection worker finished");
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for ConnectionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWorker")
            .field("connection", &self.connection)
            .finish()
    }
}

async fn read_loop(connection: &Connection, reader: OwnedReadHalf, context: &ServerContext) {
    let codec = FrameCodec::new().with_max_payload_size(context.config().frame_limit());
    let mut frames = FramedRead::new(reader, codec);
    let shutdown = connection.shutdown_token();

    loop {
        let next = select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                trace!(frame = %frame, "Frame received");
                context
                    .metrics()
                    .frame_received((HEADER_LEN + frame.len()) as u64);
                counter!("gridlink.frames.received").increment(1);

                let request = Request::new(connection.clone(), frame);
                let dispatched = select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    dispatched = context.dispatcher().dispatch(request) => dispatched,
                };
                if let Err(e) = dispatched {
                    warn!(error = %e, "Dispatcher rejected request");
                    break;
                }
            }
            Some(Err(e)) if e.is_io() => {
                debug!(error = %e, "Read failed");
                break;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Malformed frame, closing connection");
                context.metrics().protocol_error();
                counter!("gridlink.errors.protocol").increment(1);
                break;
            }
            None => {
                debug!("Peer closed connection");
                break;
            }
        }
    }
}

async fn write_loop(
    connection: Connection,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Bytes>,
    context: Arc<ServerContext>,
) {
    let shutdown = connection.shutdown_token().clone();
    let write_timeout = context.config().write_timeout;

    loop {
        let frame = select! {
            biased;
            _ = shutdown.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        // A peer that stopped reading must not hold the socket open past stop()
        let written = select! {
            biased;
            _ = shutdown.cancelled() => break,
            written = timeout(write_timeout, writer.write_all(&frame)) => written,
        };

        match written {
            Ok(Ok(())) => {
                context.metrics().frame_sent(frame.len() as u64);
                counter!("gridlink.frames.sent").increment(1);
            }
            Ok(Err(e)) => {
                error!(error = %e, "Write failed");
                connection.stop().await;
                break;
            }
            Err(_) => {
                warn!(timeout = ?write_timeout, "Write timed out, closing connection");
                counter!("gridlink.errors.write_timeout").increment(1);
                connection.stop().await;
                break;
            }
        }
    }

    // Release queued frames and any sender still waiting on the channel
    drop(outbound);
    if let Err(e) = writer.shutdown().await {
        trace!(error = %e, "Socket shutdown failed");
    }
    debug!("Write loop finished");
}
