//! Provider-level procedures that belong to no kind.

use procwire_core::ExecutionStrategy;
use procwire_sdk::{HandlerError, ProceduralContext, ProcedureError, ProviderBuilder};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct Operands {
    pub a: i64,
    pub b: i64,
}

pub fn declare(provider: &mut ProviderBuilder) -> Result<(), ProcedureError> {
    provider.procedure(
        "computeSum",
        json!({}),
        ExecutionStrategy::HaltIntentful,
        json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": { "a": { "type": "integer" }, "b": { "type": "integer" } }
        }),
        json!({ "type": "integer" }),
        |_ctx: ProceduralContext, input: Option<Operands>| async move { compute_sum(input) },
    )
}

fn compute_sum(input: Option<Operands>) -> Result<i64, HandlerError> {
    let Operands { a, b } = input.ok_or("computeSum requires a and b")?;
    a.checked_add(b).ok_or_else(|| "sum overflows".into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use procwire_sdk::HttpServerManager;
    use url::Url;

    use super::*;

    #[test]
    fn adds_operands() {
        assert_eq!(compute_sum(Some(Operands { a: 5, b: 5 })).expect("sum"), 10);
        assert!(compute_sum(None).is_err());
        assert!(compute_sum(Some(Operands { a: i64::MAX, b: 1 })).is_err());
    }

    #[test]
    fn declare_registers_compute_sum() {
        let server = Arc::new(HttpServerManager::new(Some(
            Url::parse("http://127.0.0.1:9005").expect("url should parse"),
        )));
        let mut provider = ProviderBuilder::new("http://127.0.0.1:3000/services", server.clone());
        declare(&mut provider).expect("declare should succeed");

        let published = provider.publish().expect("provider should publish");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].name, "computeSum");
        assert!(server.routes().contains("/procedure/computeSum"));
    }
}
