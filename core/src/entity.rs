use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Provider entity state as it travels through a procedure call.
///
/// `spec` and `status` are opaque here: their shape belongs to the kind's
/// schema, which the persistence layer validates. Only `metadata.kind` and
/// `metadata.uuid` are read, to build entity URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Entity {
    pub metadata: Metadata,
    /// Desired state, as declared by the entity owner
    #[serde(default)]
    pub spec: serde_json::Value,
    /// Observed state, as reported by the provider
    #[serde(default)]
    pub status: serde_json::Value,
}

/// Identity and versioning of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Metadata {
    pub uuid: Uuid,
    /// Name of the kind this entity belongs to
    pub kind: String,
    /// Monotonic spec version, bumped on every spec change
    #[serde(default)]
    pub spec_version: u64,
    /// Provider-defined metadata extension (owner, labels, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extension: HashMap<String, serde_json::Value>,
}

impl Entity {
    pub fn new(kind: impl Into<String>, spec: serde_json::Value) -> Self {
        Self {
            metadata: Metadata {
                uuid: Uuid::new_v4(),
                kind: kind.into(),
                spec_version: 0,
                extension: HashMap::new(),
            },
            spec,
            status: serde_json::Value::Null,
        }
    }

    /// Same entity with a replaced spec; the returned value carries the bumped version.
    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self.metadata.spec_version += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_and_extension_are_optional_on_the_wire() {
        let entity: Entity = serde_json::from_value(json!({
            "metadata": {
                "uuid": "0190f2a4-5f1e-7c4e-9a3b-1c2d3e4f5a6b",
                "kind": "location"
            },
            "spec": { "x": 10, "y": 11 }
        }))
        .expect("entity should deserialize");

        assert_eq!(entity.metadata.kind, "location");
        assert_eq!(entity.metadata.spec_version, 0);
        assert!(entity.metadata.extension.is_empty());
        assert_eq!(entity.status, serde_json::Value::Null);
    }

    #[test]
    fn missing_metadata_is_rejected() {
        let result = serde_json::from_value::<Entity>(json!({ "spec": {} }));
        assert!(result.is_err());
    }

    #[test]
    fn with_spec_bumps_version() {
        let entity = Entity::new("location", json!({ "x": 1 }));
        let uuid = entity.metadata.uuid;
        let moved = entity.with_spec(json!({ "x": 2 }));
        assert_eq!(moved.metadata.uuid, uuid);
        assert_eq!(moved.metadata.spec_version, 1);
        assert_eq!(moved.spec, json!({ "x": 2 }));
    }
}
