use std::future::Future;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use procwire_core::Entity;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::{ProceduralContext, SharedConfig};
use crate::error::{HandlerError, ProcedureError};
use crate::extract::{decode_call, decode_input};
use crate::state::{RouteFuture, RouteHandler};

/// Wrap a typed entity handler into the type-erased endpoint the router stores.
pub(crate) fn entity_adapter<I, F, Fut, E>(
    procedure: &str,
    config: SharedConfig,
    handler: F,
) -> RouteHandler
where
    I: DeserializeOwned + Send + 'static,
    F: Fn(ProceduralContext, Entity, Option<I>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Entity, E>> + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    let procedure: Arc<str> = Arc::from(procedure);
    let handler = Arc::new(handler);

    Arc::new(move |body: Bytes| -> RouteFuture {
        let procedure = procedure.clone();
        let config = config.clone();
        let handler = handler.clone();

        Box::pin(async move {
            respond(dispatch_entity::<I, F, Fut, E>(&procedure, &config, handler.as_ref(), &body).await)
        })
    })
}

/// Same as [`entity_adapter`] for kind and provider procedures, which take
/// only an input and answer with any serializable value.
pub(crate) fn input_adapter<I, O, F, Fut, E>(
    procedure: &str,
    config: SharedConfig,
    handler: F,
) -> RouteHandler
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(ProceduralContext, Option<I>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    let procedure: Arc<str> = Arc::from(procedure);
    let handler = Arc::new(handler);

    Arc::new(move |body: Bytes| -> RouteFuture {
        let procedure = procedure.clone();
        let config = config.clone();
        let handler = handler.clone();

        Box::pin(async move {
            respond(dispatch_input::<I, O, F, Fut, E>(&procedure, &config, handler.as_ref(), &body).await)
        })
    })
}

fn respond<T: Serialize>(result: Result<T, ProcedureError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn handler_failed<E: Into<HandlerError>>(procedure: &str) -> impl FnOnce(E) -> ProcedureError + '_ {
    move |err| ProcedureError::HandlerExecution {
        procedure: procedure.to_string(),
        source: err.into(),
    }
}

/// One request, one handler invocation. Returns the spec to send back.
async fn dispatch_entity<I, F, Fut, E>(
    procedure: &str,
    config: &SharedConfig,
    handler: &F,
    body: &[u8],
) -> Result<serde_json::Value, ProcedureError>
where
    I: DeserializeOwned,
    F: Fn(ProceduralContext, Entity, Option<I>) -> Fut,
    Fut: Future<Output = Result<Entity, E>>,
    E: Into<HandlerError>,
{
    let call = decode_call::<I>(body)?;
    let ctx = config.snapshot().context()?;

    // The returned entity is authoritative; the input entity is moved in and never re-read.
    let entity = handler(ctx, call.entity, call.input)
        .await
        .map_err(handler_failed(procedure))?;

    Ok(entity.spec)
}

async fn dispatch_input<I, O, F, Fut, E>(
    procedure: &str,
    config: &SharedConfig,
    handler: &F,
    body: &[u8],
) -> Result<O, ProcedureError>
where
    I: DeserializeOwned,
    F: Fn(ProceduralContext, Option<I>) -> Fut,
    Fut: Future<Output = Result<O, E>>,
    E: Into<HandlerError>,
{
    let input = decode_input::<I>(body)?;
    let ctx = config.snapshot().context()?;

    handler(ctx, input).await.map_err(handler_failed(procedure))
}
