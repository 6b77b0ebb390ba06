use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use procwire_core::ExecutionStrategy;
use procwire_core::ProceduralSignature;
use procwire_core::kind::sorted_by_name;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::builder::{Declaration, KindBuilder, Registrar};
use crate::context::{ProceduralContext, ProviderConfig, SharedConfig};
use crate::dispatch::input_adapter;
use crate::error::{HandlerError, ProcedureError};
use crate::server::{ServerManager, provider_route};

const OWNER: &str = "provider";

/// One provider: its prefix/version, the kinds it serves and the procedures
/// that belong to no kind.
///
/// Kinds created with [`ProviderBuilder::new_kind`] share this provider's
/// configuration, so a prefix set here is seen by every kind's handlers.
/// Provider procedures are served at `/procedure/{name}`.
pub struct ProviderBuilder {
    procedures: HashMap<String, ProceduralSignature>,
    registrar: Registrar,
}

impl ProviderBuilder {
    pub fn new(entity_url: impl Into<String>, server: Arc<dyn ServerManager>) -> Self {
        let config = SharedConfig::new(ProviderConfig {
            entity_url: entity_url.into(),
            prefix: None,
            version: None,
        });
        Self {
            procedures: HashMap::new(),
            registrar: Registrar::new(config, server),
        }
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.registrar.set_prefix(prefix.into());
    }

    pub fn set_version(&self, version: impl Into<String>) {
        self.registrar.set_version(version.into());
    }

    pub fn config(&self) -> ProviderConfig {
        self.registrar.config.snapshot()
    }

    /// A builder for a kind served by this provider.
    pub fn new_kind(&self, name: impl Into<String>) -> KindBuilder {
        KindBuilder::with_registrar(
            name,
            Registrar::new(self.registrar.config.clone(), self.registrar.server.clone()),
        )
    }

    pub fn procedures(&self) -> &HashMap<String, ProceduralSignature> {
        &self.procedures
    }

    pub fn is_poisoned(&self) -> bool {
        self.registrar.is_poisoned()
    }

    /// Provider procedures ordered by name, refused after a failed rollback.
    pub fn publish(&self) -> Result<Vec<ProceduralSignature>, ProcedureError> {
        self.registrar.ensure_consistent(OWNER)?;
        Ok(sorted_by_name(&self.procedures).into_iter().cloned().collect())
    }

    /// Declare a provider-level procedure. Same registration and rollback
    /// rules as [`KindBuilder::procedure`]; the handler gets only the input.
    pub fn procedure<I, O, F, Fut, E>(
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
        let endpoint = input_adapter(name, self.registrar.config.clone(), handler);
        self.registrar.register(
            &mut self.procedures,
            OWNER,
            Declaration {
                name,
                route: provider_route(name),
                rbac,
                execution_strategy,
                argument: input_schema,
                result: output_schema,
            },
            endpoint,
        )
    }
}
