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

//! Request handlers and the route table

use crate::{Request, Result, ServiceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{instrument, trace, warn};

/// Request handler trait
///
/// Every routed request runs `pre_handle`, `handle` and `post_handle` in that
/// order on the same task. Implement only the stages you need; the rest default
/// to no-ops.
///
/// # Example
///
/// ```no_run
/// use gridlink_service::{Request, RequestHandler};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl RequestHandler for Echo {
///     async fn handle(&self, request: &Request) {
///         let _ = request
///             .connection()
///             .send_msg(request.type_id(), request.payload())
///             .await;
///     }
/// }
/// ```
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Called before [`handle`](RequestHandler::handle)
    async fn pre_handle(&self, _request: &Request) {}

    /// Main request processing
    async fn handle(&self, _request: &Request) {}

    /// Called after [`handle`](RequestHandler::handle)
    async fn post_handle(&self, _request: &Request) {}
}

/// Closure adapter for handlers that only need the `handle` stage
///
/// ```no_run
/// use gridlink_service::{FnHandler, Router};
///
/// let mut router = Router::new();
/// router
///     .add_route(1, FnHandler::new(|request| async move {
///         let _ = request.connection().send_msg(1, request.payload()).await;
///     }))
///     .unwrap();
/// ```
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Wrap a closure
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, request: &Request) {
        (self.f)(request.clone()).await
    }
}

/// Route table mapping message types to handlers
///
/// Built before the server starts and read-only afterwards.
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<u32, Arc<dyn RequestHandler>>,
}

impl Router {
    /// Create an empty route table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a message type
    ///
    /// Registering the same type twice is a configuration error.
    pub fn add_route(&mut self, type_id: u32, handler: impl RequestHandler) -> Result<()> {
        self.add_route_arc(type_id, Arc::new(handler))
    }

    /// Register a shared handler for a message type
    pub fn add_route_arc(&mut self, type_id: u32, handler: Arc<dyn RequestHandler>) -> Result<()> {
        if self.routes.contains_key(&type_id) {
            return Err(ServiceError::DuplicateRoute(type_id));
        }
        self.routes.insert(type_id, handler);
        tracing::info!(type_id, "Route registered");
        Ok(())
    }

    /// Check if a message type has a handler
    pub fn contains(&self, type_id: u32) -> bool {
        self.routes.contains_key(&type_id)
    }

    /// Registered message types, in no particular order
    pub fn type_ids(&self) -> Vec<u32> {
        self.routes.keys().copied().collect()
    }

    /// Number of routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run the handler stages for a request
    ///
    /// Returns `false` if no handler is registered; the request is dropped
    /// without a reply.
    #[instrument(skip(self, request), fields(connection_id = %request.connection().id(), type_id = request.type_id()))]
    pub async fn route(&self, request: &Request) -> bool {
        let Some(handler) = self.routes.get(&request.type_id()) else {
            warn!("No route for message type, dropping request");
            return false;
        };

        trace!("Routing request");
        handler.pre_handle(request).await;
        handler.handle(request).await;
        handler.post_handle(request).await;
        true
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut type_ids = self.type_ids();
        type_ids.sort_unstable();
        f.debug_struct("Router").field("routes", &type_ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingHandler, test_connection, test_context};
    use gridlink_codec::Frame;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct StageRecorder {
        stages: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl RequestHandler for Arc<StageRecorder> {
        async fn pre_handle(&self, _request: &Request) {
            self.stages.lock().unwrap().push("pre");
        }

        async fn handle(&self, _request: &Request) {
            self.stages.lock().unwrap().push("handle");
        }

        async fn post_handle(&self, _request: &Request) {
            self.stages.lock().unwrap().push("post");
        }
    }

    struct Nothing;

    #[async_trait]
    impl RequestHandler for Nothing {}

    #[test]
    fn test_duplicate_route_rejected() {
        let mut router = Router::new();
        router.add_route(1, Nothing).unwrap();
        let err = router.add_route(1, Nothing).unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateRoute(1)));
        assert!(err.is_configuration_error());
        assert_eq!(router.len(), 1);
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let context = test_context(Arc::new(RecordingHandler::default()));
        let (conn, _outbound) = test_connection(&context, 0);

        let recorder = Arc::new(StageRecorder::default());
        let mut router = Router::new();
        router.add_route(2, recorder.clone()).unwrap();

        assert!(router.route(&Request::new(conn, Frame::empty(2))).await);
        assert_eq!(*recorder.stages.lock().unwrap(), vec!["pre", "handle", "post"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unknown_type_is_dropped() {
        let context = test_context(Arc::new(RecordingHandler::default()));
        let (conn, _outbound) = test_connection(&context, 0);

        let router = Router::new();
        assert!(!router.route(&Request::new(conn, Frame::empty(99))).await);
        assert!(logs_contain("No route for message type"));
    }

    #[tokio::test]
    async fn test_fn_handler() {
        let context = test_context(Arc::new(RecordingHandler::default()));
        let (conn, mut outbound) = test_connection(&context, 0);

        let mut router = Router::new();
        router
            .add_route(
                5,
                FnHandler::new(|request: Request| async move {
                    let _ = request.connection().send_msg(6, request.payload()).await;
                }),
            )
            .unwrap();

        assert!(router.route(&Request::new(conn, Frame::new(5, "hi"))).await);
        let reply = outbound.recv().await.unwrap();
        assert_eq!(&reply[..], &[2, 0, 0, 0, 6, 0, 0, 0, b'h', b'i']);
    }
}
