use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use procwire_core::{Entity, ExecutionStrategy, Kind, ProceduralSignature};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::{ProceduralContext, ProviderConfig, SharedConfig};
use crate::dispatch::{entity_adapter, input_adapter};
use crate::error::{HandlerError, ProcedureError, ServerError};
use crate::server::{ServerManager, entity_route, is_valid_procedure_name, kind_route, route_path};
use crate::state::RouteHandler;

/// Declares the procedures of one kind and wires each to a live endpoint.
///
/// Every entry in the kind's procedure tables has exactly one handler
/// registered with the [`ServerManager`], and the entry's callback URL is the
/// one the manager derived for its route. Entity procedures are served at
/// `/{name}`, kind procedures at `/{kind}/procedure/{name}`. A failed
/// registration withdraws the procedure rather than leaving it half-wired.
pub struct KindBuilder {
    kind: Kind,
    registrar: Registrar,
}

impl KindBuilder {
    pub fn new(
        kind_name: impl Into<String>,
        entity_url: impl Into<String>,
        server: Arc<dyn ServerManager>,
    ) -> Self {
        let config = SharedConfig::new(ProviderConfig {
            entity_url: entity_url.into(),
            prefix: None,
            version: None,
        });
        Self::with_registrar(kind_name, Registrar::new(config, server))
    }

    pub(crate) fn with_registrar(kind_name: impl Into<String>, registrar: Registrar) -> Self {
        Self {
            kind: Kind::new(kind_name),
            registrar,
        }
    }

    /// Provider prefix. Handlers registered earlier see the new value on their next call.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.registrar.set_prefix(prefix.into());
    }

    pub fn set_version(&self, version: impl Into<String>) {
        self.registrar.set_version(version.into());
    }

    pub fn config(&self) -> ProviderConfig {
        self.registrar.config.snapshot()
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// True once a rollback failed; the kind must not be advertised.
    pub fn is_poisoned(&self) -> bool {
        self.registrar.is_poisoned()
    }

    /// Snapshot of the kind for discovery. Refused when the procedure table
    /// may no longer match the router.
    pub fn publish(&self) -> Result<Kind, ProcedureError> {
        self.registrar.ensure_consistent(&self.kind.name)?;
        Ok(self.kind.clone())
    }

    /// Declare procedure `name` and route `POST /{name}` to `handler`.
    ///
    /// Registering an existing name replaces both its signature and its
    /// handler. `rbac` is stored with the signature for the authorization
    /// layer and not interpreted here.
    pub fn procedure<I, F, Fut, E>(
        &mut self,
        name: &str,
        rbac: serde_json::Value,
        execution_strategy: ExecutionStrategy,
        input_schema: serde_json::Value,
        output_schema: serde_json::Value,
        handler: F,
    ) -> Result<(), ProcedureError>
    where
        I: DeserializeOwned + Send + 'static,
        F: Fn(ProceduralContext, Entity, Option<I>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Entity, E>> + Send + 'static,
        E: Into<HandlerError> + 'static,
    {
        let endpoint = entity_adapter(name, self.registrar.config.clone(), handler);
        self.registrar.register(
            &mut self.kind.procedures,
            &self.kind.name,
            Declaration {
                name,
                route: entity_route(name),
                rbac,
                execution_strategy,
                argument: input_schema,
                result: output_schema,
            },
            endpoint,
        )
    }

    /// Declare a procedure on the kind as a whole. The handler gets no
    /// entity and its return value is sent back as the response body.
    pub fn kind_procedure<I, O, F, Fut, E>(
        &mut self,
        name: &str,
        rbac: serde_json::Value,
        execution_strategy: ExecutionStrategy,
        input_schema: serde_json::Value,
        output_schema: serde_json::Value,
        handler: F,
    ) -> Result<(), ProcedureError>
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(ProceduralContext, Option<I>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        E: Into<HandlerError> + 'static,
    {
        if !is_valid_procedure_name(&self.kind.name) {
            return Err(ProcedureError::Configuration {
                procedure: name.to_string(),
                reason: format!("kind name '{}' cannot be used as a path segment", self.kind.name),
                source: None,
            });
        }

        let endpoint = input_adapter(name, self.registrar.config.clone(), handler);
        self.registrar.register(
            &mut self.kind.kind_procedures,
            &self.kind.name,
            Declaration {
                name,
                route: kind_route(&self.kind.name, name),
                rbac,
                execution_strategy,
                argument: input_schema,
                result: output_schema,
            },
            endpoint,
        )
    }
}

/// Everything about a procedure except its callback URL and handler.
pub(crate) struct Declaration<'a> {
    pub(crate) name: &'a str,
    /// Route relative to the public URL
    pub(crate) route: String,
    pub(crate) rbac: serde_json::Value,
    pub(crate) execution_strategy: ExecutionStrategy,
    pub(crate) argument: serde_json::Value,
    pub(crate) result: serde_json::Value,
}

/// Keeps one procedure table and the router in step.
pub(crate) struct Registrar {
    pub(crate) config: SharedConfig,
    pub(crate) server: Arc<dyn ServerManager>,
    poisoned: bool,
}

impl Registrar {
    pub(crate) fn new(config: SharedConfig, server: Arc<dyn ServerManager>) -> Self {
        Self {
            config,
            server,
            poisoned: false,
        }
    }

    pub(crate) fn set_prefix(&self, prefix: String) {
        self.config.update(|config| config.prefix = Some(prefix));
    }

    pub(crate) fn set_version(&self, version: String) {
        self.config.update(|config| config.version = Some(version));
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub(crate) fn ensure_consistent(&self, owner: &str) -> Result<(), ProcedureError> {
        if self.poisoned {
            return Err(ProcedureError::Poisoned {
                owner: owner.to_string(),
            });
        }
        Ok(())
    }

    /// Derive the callback, record the signature in `table`, then install
    /// `handler`. On failure the table and router are left without the
    /// procedure.
    pub(crate) fn register(
        &mut self,
        table: &mut HashMap<String, ProceduralSignature>,
        owner: &str,
        declaration: Declaration<'_>,
        handler: RouteHandler,
    ) -> Result<(), ProcedureError> {
        let Declaration {
            name,
            route,
            rbac,
            execution_strategy,
            argument,
            result,
        } = declaration;

        if !is_valid_procedure_name(name) {
            return Err(ProcedureError::Configuration {
                procedure: name.to_string(),
                reason: "name must be a non-empty path segment of [A-Za-z0-9_-]".to_string(),
                source: None,
            });
        }

        let procedure_callback =
            self.server
                .callback_url(&route)
                .map_err(|source| ProcedureError::Configuration {
                    procedure: name.to_string(),
                    reason: "cannot derive callback URL".to_string(),
                    source: Some(source),
                })?;

        let replaced = table.insert(
            name.to_string(),
            ProceduralSignature {
                name: name.to_string(),
                argument,
                result,
                execution_strategy,
                procedure_callback: procedure_callback.clone(),
                rbac,
            },
        );

        let path = route_path(&route);
        if let Err(source) = self.server.register_handler(&path, handler) {
            let rollback = self.withdraw(table, owner, name, &path, replaced.is_some());
            tracing::warn!(
                %owner,
                procedure = %name,
                error = %source,
                "handler registration failed; procedure withdrawn"
            );
            return Err(ProcedureError::RegistrationConsistency {
                procedure: name.to_string(),
                source,
                rollback,
            });
        }

        tracing::debug!(
            %owner,
            procedure = %name,
            callback = %procedure_callback,
            replaced = replaced.is_some(),
            "registered procedure"
        );
        Ok(())
    }

    /// Undo a half-finished registration: drop the signature and make sure no
    /// handler (new or previous) stays reachable at `path`. Only a previous
    /// registration can leave a live handler behind, so only then does a
    /// failed unregister poison the table.
    fn withdraw(
        &mut self,
        table: &mut HashMap<String, ProceduralSignature>,
        owner: &str,
        name: &str,
        path: &str,
        had_handler: bool,
    ) -> Option<ServerError> {
        table.remove(name);
        match self.server.unregister_handler(path) {
            Ok(()) | Err(ServerError::NotRegistered(_)) => None,
            Err(err) if !had_handler => {
                tracing::warn!(
                    %owner,
                    procedure = %name,
                    error = %err,
                    "unregister failed but no handler was ever installed"
                );
                None
            }
            Err(err) => {
                self.poisoned = true;
                tracing::error!(
                    %owner,
                    procedure = %name,
                    error = %err,
                    "rollback failed; procedures must not be advertised"
                );
                Some(err)
            }
        }
    }
}
