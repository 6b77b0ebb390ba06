use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use axum::body::Bytes;
use axum::response::Response;

pub type RouteFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Type-erased procedure endpoint: request body in, HTTP response out.
pub type RouteHandler = Arc<dyn Fn(Bytes) -> RouteFuture + Send + Sync>;

/// Live handler table shared between the registering side and the router.
///
/// Readers clone the handler `Arc` and release the lock before awaiting it,
/// so slow handlers never block registration or other requests.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Arc<RwLock<HashMap<String, RouteHandler>>>,
}

impl RouteTable {
    pub fn get(&self, path: &str) -> Option<RouteHandler> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Install `handler` at `path`, returning whatever was there before.
    pub fn insert(&self, path: String, handler: RouteHandler) -> Option<RouteHandler> {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, handler)
    }

    pub fn remove(&self, path: &str) -> Option<RouteHandler> {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }

    /// Whether a handler is installed at `path`. Lets a provider check what
    /// the router serves after registering.
    pub fn contains(&self, path: &str) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    /// Number of installed handlers.
    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
