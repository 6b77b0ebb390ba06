//! Provider-side procedure registration and HTTP dispatch.
//!
//! A [`KindBuilder`] records each procedure's signature in its [`Kind`] and
//! registers a typed handler with a [`ServerManager`]. A [`ProviderBuilder`]
//! holds the configuration its kinds share and the procedures that belong to
//! no kind. [`HttpServerManager`] is the axum-backed manager; its router
//! decodes each request envelope, builds a [`ProceduralContext`] and awaits
//! the handler.
//!
//! [`Kind`]: procwire_core::Kind

pub mod builder;
pub mod context;
mod dispatch;
pub mod error;
pub mod extract;
pub mod provider;
pub mod routes;
pub mod server;
pub mod state;

pub use builder::KindBuilder;
pub use context::{ProceduralContext, ProviderConfig};
pub use error::{HandlerError, ProcedureError, ServerError};
pub use provider::ProviderBuilder;
pub use server::{HttpServerManager, ServerManager};
pub use state::{RouteFuture, RouteHandler};
