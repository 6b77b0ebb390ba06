use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use url::Url;

use crate::error::{ProcedureError, ServerError};
use crate::state::{RouteHandler, RouteTable};

/// The router collaborator a [`crate::KindBuilder`] registers procedures with.
pub trait ServerManager: Send + Sync {
    /// Fully-qualified URL the orchestrator calls to reach `route`, a path
    /// relative to the public base URL (for example `moveX`).
    fn callback_url(&self, route: &str) -> Result<Url, ServerError>;

    /// Install `handler` at `path`, replacing any handler already there.
    fn register_handler(&self, path: &str, handler: RouteHandler) -> Result<(), ServerError>;

    /// Remove the handler at `path`.
    fn unregister_handler(&self, path: &str) -> Result<(), ServerError>;
}

/// Procedure and kind names become URL path segments.
pub fn is_valid_procedure_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Route of a procedure invoked on one entity.
pub fn entity_route(name: &str) -> String {
    name.to_string()
}

/// Route of a procedure invoked on a kind as a whole.
pub fn kind_route(kind: &str, name: &str) -> String {
    format!("{kind}/procedure/{name}")
}

/// Route of a provider-level procedure.
pub fn provider_route(name: &str) -> String {
    format!("procedure/{name}")
}

/// Handler table key for a route.
pub fn route_path(route: &str) -> String {
    format!("/{route}")
}

fn validate_path(path: &str) -> Result<(), ServerError> {
    match path.strip_prefix('/') {
        Some(route) if route.split('/').all(is_valid_procedure_name) => Ok(()),
        _ => Err(ServerError::InvalidPath(path.to_string())),
    }
}

/// [`ServerManager`] backed by an axum router with a live handler table.
///
/// The router can be built and served before any procedure is registered;
/// registrations and replacements take effect for the next request. When the
/// public URL carries a path (`http://host/location/`), procedures are served
/// under that path so every callback URL resolves to its handler.
#[derive(Clone, Default)]
pub struct HttpServerManager {
    public_url: Option<Url>,
    routes: RouteTable,
}

impl HttpServerManager {
    pub fn new(public_url: Option<Url>) -> Self {
        Self {
            public_url: public_url.map(with_trailing_slash),
            routes: RouteTable::default(),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Path prefix taken from the public URL, empty when it is the root.
    pub fn base_path(&self) -> &str {
        self.public_url
            .as_ref()
            .map(|url| url.path().trim_end_matches('/'))
            .unwrap_or_default()
    }

    /// `POST {base}/{route}` dispatching into the handler table.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&format!("{}/{{*route}}", self.base_path()), post(invoke))
            .with_state(self.routes.clone())
    }
}

// Url::join drops the last segment of a base without a trailing slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl ServerManager for HttpServerManager {
    fn callback_url(&self, route: &str) -> Result<Url, ServerError> {
        let base = self.public_url.as_ref().ok_or(ServerError::MissingPublicUrl)?;
        base.join(route).map_err(|source| ServerError::UrlJoin {
            procedure: route.to_string(),
            source,
        })
    }

    fn register_handler(&self, path: &str, handler: RouteHandler) -> Result<(), ServerError> {
        validate_path(path)?;
        if self.routes.insert(path.to_string(), handler).is_some() {
            tracing::debug!(%path, "replaced procedure handler");
        }
        Ok(())
    }

    fn unregister_handler(&self, path: &str) -> Result<(), ServerError> {
        self.routes
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ServerError::NotRegistered(path.to_string()))
    }
}

async fn invoke(
    State(routes): State<RouteTable>,
    Path(route): Path<String>,
    body: Bytes,
) -> Response {
    let path = route_path(&route);
    match routes.get(&path) {
        Some(handler) => handler(body).await,
        None => ProcedureError::NotFound { path }.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::state::RouteFuture;

    fn manager(url: &str) -> HttpServerManager {
        HttpServerManager::new(Some(Url::parse(url).expect("url should parse")))
    }

    fn echo_handler(tag: &'static str) -> RouteHandler {
        Arc::new(move |body: Bytes| -> RouteFuture {
            Box::pin(async move {
                (StatusCode::OK, format!("{tag}:{}", String::from_utf8_lossy(&body))).into_response()
            })
        })
    }

    async fn post_to(router: Router, uri: &str, body: &'static str) -> (StatusCode, String) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .body(Body::from(body))
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[test]
    fn callback_url_joins_procedure_onto_base() {
        let url = manager("http://127.0.0.1:9005")
            .callback_url("moveX")
            .expect("url should derive");
        assert_eq!(url.as_str(), "http://127.0.0.1:9005/moveX");
    }

    #[test]
    fn callback_url_keeps_base_path() {
        let url = manager("http://provider.local/location")
            .callback_url("moveX")
            .expect("url should derive");
        assert_eq!(url.as_str(), "http://provider.local/location/moveX");
    }

    #[test]
    fn callback_url_requires_public_url() {
        let err = HttpServerManager::new(None)
            .callback_url("moveX")
            .expect_err("no base url");
        assert!(matches!(err, ServerError::MissingPublicUrl));
    }

    #[test]
    fn rejects_paths_that_are_not_a_single_segment() {
        let server = manager("http://127.0.0.1:9005");
        for path in ["moveX", "/", "/a//b", "/a/", "/../x", "/a:b"] {
            assert!(
                matches!(
                    server.register_handler(path, echo_handler("x")),
                    Err(ServerError::InvalidPath(_))
                ),
                "{path} should be rejected"
            );
        }
        assert!(server.routes().is_empty());
    }

    #[test]
    fn accepts_kind_and_provider_routes() {
        let server = manager("http://127.0.0.1:9005");
        for route in [kind_route("location", "computeGeolocation"), provider_route("computeSum")] {
            server
                .register_handler(&route_path(&route), echo_handler("x"))
                .expect("multi-segment route should register");
        }
        assert_eq!(server.routes().len(), 2);
    }

    #[test]
    fn base_path_comes_from_public_url() {
        assert_eq!(manager("http://127.0.0.1:9005").base_path(), "");
        assert_eq!(manager("http://provider.local/location").base_path(), "/location");
        assert_eq!(manager("http://provider.local/a/b/").base_path(), "/a/b");
        assert_eq!(HttpServerManager::new(None).base_path(), "");
    }

    #[test]
    fn unregister_unknown_path_reports_not_registered() {
        let server = manager("http://127.0.0.1:9005");
        assert!(matches!(
            server.unregister_handler("/moveX"),
            Err(ServerError::NotRegistered(_))
        ));
    }

    #[tokio::test]
    async fn router_dispatches_to_registered_handler() {
        let server = manager("http://127.0.0.1:9005");
        let router = server.router();
        server
            .register_handler("/moveX", echo_handler("move"))
            .expect("register should succeed");

        let (status, body) = post_to(router, "/moveX", "5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "move:5");
    }

    #[tokio::test]
    async fn router_serves_callbacks_under_the_public_base_path() {
        let server = manager("http://provider.local/location");
        server
            .register_handler("/moveX", echo_handler("move"))
            .expect("register should succeed");
        let callback = server.callback_url("moveX").expect("url should derive");

        let (status, body) = post_to(server.router(), callback.path(), "5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "move:5");

        let (status, _) = post_to(server.router(), "/moveX", "5").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn router_dispatches_multi_segment_routes() {
        let server = manager("http://127.0.0.1:9005");
        let route = kind_route("location", "computeGeolocation");
        server
            .register_handler(&route_path(&route), echo_handler("geo"))
            .expect("register should succeed");
        let callback = server.callback_url(&route).expect("url should derive");
        assert_eq!(
            callback.as_str(),
            "http://127.0.0.1:9005/location/procedure/computeGeolocation"
        );

        let (status, body) = post_to(server.router(), callback.path(), "2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "geo:2");
    }

    #[tokio::test]
    async fn router_uses_latest_registration() {
        let server = manager("http://127.0.0.1:9005");
        server
            .register_handler("/moveX", echo_handler("old"))
            .expect("register should succeed");
        server
            .register_handler("/moveX", echo_handler("new"))
            .expect("re-register should succeed");

        assert_eq!(server.routes().len(), 1);
        let (_, body) = post_to(server.router(), "/moveX", "").await;
        assert_eq!(body, "new:");
    }

    #[tokio::test]
    async fn router_returns_not_found_after_unregister() {
        let server = manager("http://127.0.0.1:9005");
        server
            .register_handler("/moveX", echo_handler("move"))
            .expect("register should succeed");
        server
            .unregister_handler("/moveX")
            .expect("unregister should succeed");

        let (status, body) = post_to(server.router(), "/moveX", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: serde_json::Value = serde_json::from_str(&body).expect("json error body");
        assert_eq!(error["error"], "not_found");
    }
}
