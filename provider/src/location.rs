//! The `location` kind: entities with integer `x`/`y` coordinates and a name.

use procwire_core::{Entity, ExecutionStrategy};
use procwire_sdk::{HandlerError, KindBuilder, ProceduralContext, ProcedureError};
use serde_json::json;

pub const KIND: &str = "location";

/// Declare every location procedure on `builder`.
pub fn declare(builder: &mut KindBuilder, client: reqwest::Client) -> Result<(), ProcedureError> {
    builder.procedure(
        "moveX",
        json!({}),
        ExecutionStrategy::HaltIntentful,
        json!({ "type": "integer", "description": "Distance to move along x" }),
        location_schema(),
        move |ctx: ProceduralContext, entity: Entity, input: Option<i64>| {
            let client = client.clone();
            async move { move_x(&client, &ctx, entity, input).await }
        },
    )?;

    builder.procedure(
        "rename",
        json!({}),
        ExecutionStrategy::Sync,
        json!({ "type": "string" }),
        location_schema(),
        |_ctx: ProceduralContext, entity: Entity, input: Option<String>| async move {
            rename(entity, input)
        },
    )?;

    builder.kind_procedure(
        "computeGeolocation",
        json!({}),
        ExecutionStrategy::HaltIntentful,
        json!({ "type": "string", "description": "Cluster zone suffix" }),
        json!({ "type": "string" }),
        |_ctx: ProceduralContext, input: Option<String>| async move { geolocation(input) },
    )?;

    Ok(())
}

fn location_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["x", "y"],
        "properties": {
            "x": { "type": "integer" },
            "y": { "type": "integer" },
            "name": { "type": "string" }
        }
    })
}

/// Shift the entity along x and write the new spec back to the entity API.
async fn move_x(
    client: &reqwest::Client,
    ctx: &ProceduralContext,
    entity: Entity,
    input: Option<i64>,
) -> Result<Entity, HandlerError> {
    let delta = input.ok_or("moveX requires an integer input")?;
    let metadata = entity.metadata.clone();
    let moved = shift_x(entity, delta)?;

    // The entity API checks spec_version against the version we were invoked with.
    client
        .put(ctx.url_for(&moved))
        .json(&json!({ "spec": moved.spec, "metadata": metadata }))
        .send()
        .await?
        .error_for_status()?;

    tracing::info!(uuid = %moved.metadata.uuid, delta, "moved location");
    Ok(moved)
}

fn shift_x(entity: Entity, delta: i64) -> Result<Entity, HandlerError> {
    let x = entity
        .spec
        .get("x")
        .and_then(serde_json::Value::as_i64)
        .ok_or("location spec has no integer x")?;
    let x = x.checked_add(delta).ok_or("x overflows")?;

    let mut spec = entity.spec.clone();
    spec["x"] = json!(x);
    Ok(entity.with_spec(spec))
}

fn rename(entity: Entity, input: Option<String>) -> Result<Entity, HandlerError> {
    let name = input
        .filter(|name| !name.trim().is_empty())
        .ok_or("rename requires a non-empty name")?;

    let mut spec = entity.spec.clone();
    match spec.as_object_mut() {
        Some(fields) => {
            fields.insert("name".to_string(), json!(name));
        }
        None => return Err("location spec is not an object".into()),
    }
    Ok(entity.with_spec(spec))
}

fn geolocation(zone: Option<String>) -> Result<String, HandlerError> {
    let zone = zone.ok_or("computeGeolocation requires a zone")?;
    Ok(format!("us.west.{zone}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use procwire_sdk::{HttpServerManager, ProviderBuilder};
    use url::Url;

    use super::*;

    fn location(spec: serde_json::Value) -> Entity {
        Entity::new(KIND, spec)
    }

    #[test]
    fn shift_x_adds_delta_and_bumps_version() {
        let moved = shift_x(location(json!({ "x": 10, "y": 11 })), 5).expect("shift should succeed");
        assert_eq!(moved.spec, json!({ "x": 15, "y": 11 }));
        assert_eq!(moved.metadata.spec_version, 1);
    }

    #[test]
    fn shift_x_requires_integer_x() {
        assert!(shift_x(location(json!({ "x": "ten" })), 5).is_err());
        assert!(shift_x(location(json!({ "x": i64::MAX })), 1).is_err());
    }

    #[test]
    fn rename_sets_name() {
        let renamed = rename(location(json!({ "x": 1, "y": 2 })), Some("home".to_string()))
            .expect("rename should succeed");
        assert_eq!(renamed.spec["name"], "home");
        assert_eq!(renamed.spec["x"], 1);
    }

    #[test]
    fn rename_rejects_blank_or_missing_name() {
        assert!(rename(location(json!({})), None).is_err());
        assert!(rename(location(json!({})), Some("  ".to_string())).is_err());
        assert!(rename(location(json!([1, 2])), Some("home".to_string())).is_err());
    }

    #[test]
    fn geolocation_prefixes_the_zone() {
        assert_eq!(geolocation(Some("2".to_string())).expect("zone given"), "us.west.2");
        assert!(geolocation(None).is_err());
    }

    #[test]
    fn declare_registers_every_procedure() {
        let server = Arc::new(HttpServerManager::new(Some(
            Url::parse("http://127.0.0.1:9005").expect("url should parse"),
        )));
        let provider = ProviderBuilder::new("http://127.0.0.1:3000/services", server.clone());
        let mut builder = provider.new_kind(KIND);
        declare(&mut builder, reqwest::Client::new()).expect("declare should succeed");

        let kind = builder.publish().expect("kind should publish");
        let names: Vec<_> = kind
            .sorted_procedures()
            .into_iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, vec!["moveX".to_string(), "rename".to_string()]);
        assert!(server.routes().contains("/moveX"));
        assert!(server.routes().contains("/rename"));
        assert!(kind.kind_procedure("computeGeolocation").is_some());
        assert!(server.routes().contains("/location/procedure/computeGeolocation"));
    }
}
