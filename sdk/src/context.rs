use std::sync::{Arc, PoisonError, RwLock};

use procwire_core::Entity;

use crate::error::ProcedureError;

/// Provider-level settings the dispatch adapter needs at request time.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Base URL of the entity API the provider's entities live under
    pub entity_url: String,
    pub prefix: Option<String>,
    pub version: Option<String>,
}

impl ProviderConfig {
    /// Build the per-request context. The prefix is a deployment precondition,
    /// checked lazily on the first call that needs it.
    pub fn context(&self) -> Result<ProceduralContext, ProcedureError> {
        let prefix = match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix.to_string(),
            _ => return Err(ProcedureError::UnconfiguredProvider),
        };
        Ok(ProceduralContext {
            entity_url: self.entity_url.clone(),
            prefix,
            version: self.version.clone(),
        })
    }
}

/// Config shared between a builder and the adapters it registered, so that
/// setting the prefix after registration is seen by live handlers.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedConfig(Arc<RwLock<ProviderConfig>>);

impl SharedConfig {
    pub(crate) fn new(config: ProviderConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    pub(crate) fn snapshot(&self) -> ProviderConfig {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut ProviderConfig)) {
        let mut config = self.0.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut config);
    }
}

/// What a handler gets to locate and act on entities. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProceduralContext {
    pub entity_url: String,
    pub prefix: String,
    pub version: Option<String>,
}

impl ProceduralContext {
    /// URL of `entity` in the entity API.
    pub fn url_for(&self, entity: &Entity) -> String {
        let base = self.entity_url.trim_end_matches('/');
        match &self.version {
            Some(version) => format!(
                "{base}/{}/{version}/{}/{}",
                self.prefix, entity.metadata.kind, entity.metadata.uuid
            ),
            None => format!(
                "{base}/{}/{}/{}",
                self.prefix, entity.metadata.kind, entity.metadata.uuid
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(prefix: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            entity_url: "http://127.0.0.1:3000/services/".to_string(),
            prefix: prefix.map(str::to_string),
            version: Some("0.1.0".to_string()),
        }
    }

    #[test]
    fn missing_prefix_is_unconfigured() {
        assert!(matches!(
            config(None).context(),
            Err(ProcedureError::UnconfiguredProvider)
        ));
    }

    #[test]
    fn empty_prefix_is_unconfigured() {
        assert!(matches!(
            config(Some("")).context(),
            Err(ProcedureError::UnconfiguredProvider)
        ));
    }

    #[test]
    fn url_for_includes_prefix_version_kind_and_uuid() {
        let ctx = config(Some("location_provider")).context().expect("context");
        let entity = Entity::new("Location", json!({ "x": 1 }));
        assert_eq!(
            ctx.url_for(&entity),
            format!(
                "http://127.0.0.1:3000/services/location_provider/0.1.0/Location/{}",
                entity.metadata.uuid
            )
        );
    }

    #[test]
    fn url_for_skips_unset_version() {
        let mut cfg = config(Some("location_provider"));
        cfg.version = None;
        let ctx = cfg.context().expect("context");
        let entity = Entity::new("Location", json!({}));
        assert_eq!(
            ctx.url_for(&entity),
            format!(
                "http://127.0.0.1:3000/services/location_provider/Location/{}",
                entity.metadata.uuid
            )
        );
    }

    #[test]
    fn updates_are_visible_to_clones() {
        let shared = SharedConfig::new(config(None));
        let seen_by_adapter = shared.clone();
        shared.update(|cfg| cfg.prefix = Some("late_prefix".to_string()));
        assert_eq!(
            seen_by_adapter.snapshot().prefix.as_deref(),
            Some("late_prefix")
        );
    }
}
