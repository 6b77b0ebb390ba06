use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use procwire_sdk::routes;
use procwire_sdk::{HttpServerManager, ProviderBuilder};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

mod config;
mod location;
mod sum;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "procwire provider",
        version = "0.1.0",
        description = "Procedure callbacks and discovery for the location kind and its provider."
    ),
    paths(
        routes::health::health_check,
        routes::discovery::list_procedures,
        routes::discovery::list_provider_procedures,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::discovery::ProceduresResponse,
        routes::discovery::ProviderProceduresResponse,
        procwire_sdk::extract::RequestEnvelope,
        procwire_sdk::extract::InputEnvelope,
        procwire_core::error::ApiError,
        procwire_core::Entity,
        procwire_core::Metadata,
        procwire_core::Kind,
        procwire_core::ProceduralSignature,
        procwire_core::ExecutionStrategy,
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "procwire_provider=debug,procwire_sdk=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = config::Cli::parse();

    let server = Arc::new(HttpServerManager::new(Some(cli.public_url.clone())));
    let mut provider = ProviderBuilder::new(cli.entity_url.clone(), server.clone());
    match &cli.prefix {
        Some(prefix) => provider.set_prefix(prefix.clone()),
        None => tracing::warn!("PROVIDER_PREFIX is not set; procedure calls will fail until it is"),
    }
    provider.set_version(cli.version_tag.clone());

    // Registration is all-or-nothing per procedure; refuse to start on any failure.
    let mut location = provider.new_kind(location::KIND);
    if let Err(err) = location::declare(&mut location, reqwest::Client::new()) {
        tracing::error!(error = %err, "failed to declare location procedures");
        std::process::exit(1);
    }
    if let Err(err) = sum::declare(&mut provider) {
        tracing::error!(error = %err, "failed to declare provider procedures");
        std::process::exit(1);
    }
    let (kind, provider_procedures) = match (location.publish(), provider.publish()) {
        (Ok(kind), Ok(procedures)) => (kind, procedures),
        (Err(err), _) | (_, Err(err)) => {
            tracing::error!(error = %err, "refusing to advertise procedures");
            std::process::exit(1);
        }
    };
    tracing::info!(
        handlers = server.routes().len(),
        callback_base = %cli.public_url,
        "procedures registered"
    );

    let app = Router::new()
        .route("/api-doc/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(routes::health::router())
        .merge(routes::discovery::router(vec![kind], provider_procedures))
        .merge(server.router())
        .layer(TraceLayer::new_for_http());

    tracing::info!("procwire provider listening on {}", cli.bind);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .expect("Failed to bind provider listener");
    axum::serve(listener, app)
        .await
        .expect("Provider server exited with an error");
}
