use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

/// How the orchestrator should treat the entity while a procedure runs.
/// Carried as metadata only; nothing in this workspace acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// The call completes before the response is returned
    Sync,
    /// The call is acknowledged and completes later
    Async,
    /// Intent resolution for the entity is halted while the procedure runs
    HaltIntentful,
}

/// Declared schema and routing metadata for one procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProceduralSignature {
    pub name: String,
    /// Schema of the procedure input (opaque)
    pub argument: serde_json::Value,
    /// Schema of the procedure result (opaque)
    pub result: serde_json::Value,
    pub execution_strategy: ExecutionStrategy,
    /// URL the orchestrator calls to invoke this procedure
    #[schema(value_type = String)]
    pub procedure_callback: Url,
    /// Access-control token for the authorization layer; never interpreted here
    #[serde(default)]
    pub rbac: serde_json::Value,
}

/// An entity kind and the procedures it advertises.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Kind {
    pub name: String,
    /// Procedures invoked on a single entity of this kind
    #[serde(default)]
    pub procedures: HashMap<String, ProceduralSignature>,
    /// Procedures invoked on the kind as a whole, without an entity
    #[serde(default)]
    pub kind_procedures: HashMap<String, ProceduralSignature>,
}

impl Kind {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            procedures: HashMap::new(),
            kind_procedures: HashMap::new(),
        }
    }

    /// Insert a signature under its name. Returns the signature it replaced.
    pub fn insert_procedure(&mut self, signature: ProceduralSignature) -> Option<ProceduralSignature> {
        self.procedures.insert(signature.name.clone(), signature)
    }

    pub fn remove_procedure(&mut self, name: &str) -> Option<ProceduralSignature> {
        self.procedures.remove(name)
    }

    pub fn procedure(&self, name: &str) -> Option<&ProceduralSignature> {
        self.procedures.get(name)
    }

    pub fn kind_procedure(&self, name: &str) -> Option<&ProceduralSignature> {
        self.kind_procedures.get(name)
    }

    /// Signatures ordered by name, for stable discovery output.
    pub fn sorted_procedures(&self) -> Vec<&ProceduralSignature> {
        sorted_by_name(&self.procedures)
    }

    pub fn sorted_kind_procedures(&self) -> Vec<&ProceduralSignature> {
        sorted_by_name(&self.kind_procedures)
    }
}

/// Values of a procedure table ordered by procedure name.
pub fn sorted_by_name(table: &HashMap<String, ProceduralSignature>) -> Vec<&ProceduralSignature> {
    let mut signatures: Vec<_> = table.values().collect();
    signatures.sort_by(|a, b| a.name.cmp(&b.name));
    signatures
}
