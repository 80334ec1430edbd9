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

//! Dispatcher implementation
//!
//! The Dispatcher is responsible for:
//! - Owning a fixed pool of worker tasks, each fed by its own bounded queue
//! - Assigning requests to workers by connection id, so one connection's
//!   requests are always handled in arrival order
//! - Running requests on their own tasks when the pool is disabled
//! - Containing handler panics

use crate::{ConnectionId, Request, Result, Router, ServerMetrics, ServiceError};
use futures::FutureExt;
use metrics::{counter, histogram};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Worker pool configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of workers (0 = one task per request)
    pub pool_size: usize,
    /// Capacity of each worker's queue
    pub queue_capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 10,
            queue_capacity: 1024,
        }
    }
}

/// Routes requests to handlers through a pool of workers
pub struct Dispatcher {
    router: Arc<Router>,
    metrics: Arc<ServerMetrics>,
    queues: Vec<mpsc::Sender<Request>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Start the worker pool
    ///
    /// Must be called from within a Tokio runtime when `pool_size > 0`.
    pub fn start(router: Arc<Router>, config: WorkerPoolConfig, metrics: Arc<ServerMetrics>) -> Self {
        let shutdown = CancellationToken::new();
        let mut queues = Vec::with_capacity(config.pool_size);
        let mut workers = Vec::with_capacity(config.pool_size);

        for worker_id in 0..config.pool_size {
            let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
            queues.push(tx);
            workers.push(tokio::spawn(run_worker(
                worker_id,
                rx,
                router.clone(),
                metrics.clone(),
                shutdown.clone(),
            )));
        }

        info!(
            pool_size = config.pool_size,
            queue_capacity = config.queue_capacity,
            "Dispatcher started"
        );

        Self {
            router,
            metrics,
            queues,
            workers: Mutex::new(workers),
            shutdown,
        }
    }

    /// Number of workers (0 when every request gets its own task)
    pub fn pool_size(&self) -> usize {
        self.queues.len()
    }

    /// The route table
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Index of the worker that handles a connection's requests
    pub fn worker_for(&self, id: ConnectionId) -> Option<usize> {
        if self.queues.is_empty() {
            return None;
        }
        Some(id.as_u32() as usize % self.queues.len())
    }

    /// Hand a request to its worker
    ///
    /// Waits while the worker's queue is full, which holds up only the
    /// submitting connection. With no pool the request is spawned immediately.
    pub async fn dispatch(&self, request: Request) -> Result<()> {
        match self.worker_for(request.connection().id()) {
            Some(worker_id) => self.queues[worker_id]
                .send(request)
                .await
                .map_err(|_| ServiceError::ServerNotRunning),
            None => {
                tokio::spawn(process(
                    request,
                    self.router.clone(),
                    self.metrics.clone(),
                ));
                Ok(())
            }
        }
    }

    /// Stop all workers
    ///
    /// Requests still queued are dropped. Workers finish the request they are
    /// currently running.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let joined = tokio::time::timeout(
            Duration::from_secs(5),
            futures::future::join_all(workers),
        )
        .await;
        if joined.is_err() {
            error!("Timed out waiting for dispatcher workers to stop");
        }
        info!("Dispatcher stopped");
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool_size", &self.pool_size())
            .field("router", &self.router)
            .field("stopped", &self.shutdown.is_cancelled())
            .finish()
    }
}

async fn run_worker(
    worker_id: usize,
    mut queue: mpsc::Receiver<Request>,
    router: Arc<Router>,
    metrics: Arc<ServerMetrics>,
    shutdown: CancellationToken,
) {
    debug!(worker_id, "Worker started");
    loop {
        let request = select! {
            biased;
            _ = shutdown.cancelled() => break,
            request = queue.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };
        process(request, router.clone(), metrics.clone()).await;
    }
    debug!(worker_id, "Worker stopped");
}

async fn process(request: Request, router: Arc<Router>, metrics: Arc<ServerMetrics>) {
    let start = Instant::now();
    match AssertUnwindSafe(router.route(&request)).catch_unwind().await {
        Ok(true) => {
            histogram!("gridlink.handler.duration").record(start.elapsed().as_secs_f64());
        }
        Ok(false) => {
            metrics.routing_miss();
            counter!("gridlink.routing.misses").increment(1);
        }
        Err(_) => {
            metrics.handler_panic();
            counter!("gridlink.handler.panics").increment(1);
            error!(
                connection_id = %request.connection().id(),
                type_id = request.type_id(),
                "Handler panicked"
            );
        }
    }
}
