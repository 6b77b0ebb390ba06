use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use procwire_core::error::ApiError;
use procwire_core::{Kind, ProceduralSignature};
use serde::{Deserialize, Serialize};

use crate::error::ProcedureError;

/// Published snapshots the discovery handlers read from.
#[derive(Clone)]
pub struct Published {
    kinds: Arc<HashMap<String, Kind>>,
    provider_procedures: Arc<Vec<ProceduralSignature>>,
}

/// Serve the procedure tables of published kinds and of the provider.
///
/// Takes snapshots from [`crate::KindBuilder::publish`] and
/// [`crate::ProviderBuilder::publish`]; later registrations on the builders
/// are not visible here until republished.
pub fn router(kinds: Vec<Kind>, provider_procedures: Vec<ProceduralSignature>) -> Router {
    let published = Published {
        kinds: Arc::new(
            kinds
                .into_iter()
                .map(|kind| (kind.name.clone(), kind))
                .collect(),
        ),
        provider_procedures: Arc::new(provider_procedures),
    };
    Router::new()
        .route("/kinds/{kind}/procedures", get(list_procedures))
        .route("/procedures", get(list_provider_procedures))
        .with_state(published)
}

/// Response for GET /kinds/{kind}/procedures
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProceduresResponse {
    pub kind: String,
    /// Entity procedures ordered by name
    pub procedures: Vec<ProceduralSignature>,
    /// Kind-level procedures ordered by name
    #[serde(default)]
    pub kind_procedures: Vec<ProceduralSignature>,
}

/// Response for GET /procedures
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProviderProceduresResponse {
    pub procedures: Vec<ProceduralSignature>,
}

/// List the procedures a kind advertises
#[utoipa::path(
    get,
    path = "/kinds/{kind}/procedures",
    params(("kind" = String, Path, description = "Kind name")),
    responses(
        (status = 200, description = "Procedure signatures of the kind", body = ProceduresResponse),
        (status = 404, description = "Kind is not published by this provider", body = ApiError)
    ),
    tag = "discovery"
)]
pub async fn list_procedures(
    State(published): State<Published>,
    Path(kind): Path<String>,
) -> Response {
    match published.kinds.get(&kind) {
        Some(found) => Json(ProceduresResponse {
            kind: found.name.clone(),
            procedures: found.sorted_procedures().into_iter().cloned().collect(),
            kind_procedures: found.sorted_kind_procedures().into_iter().cloned().collect(),
        })
        .into_response(),
        None => ProcedureError::NotFound {
            path: format!("/kinds/{kind}"),
        }
        .into_response(),
    }
}

/// List the procedures that belong to the provider rather than a kind
#[utoipa::path(
    get,
    path = "/procedures",
    responses(
        (status = 200, description = "Provider-level procedure signatures", body = ProviderProceduresResponse)
    ),
    tag = "discovery"
)]
pub async fn list_provider_procedures(
    State(published): State<Published>,
) -> Json<ProviderProceduresResponse> {
    Json(ProviderProceduresResponse {
        procedures: published.provider_procedures.as_ref().clone(),
    })
}
