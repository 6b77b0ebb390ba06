//! Decoding of inbound procedure requests.
//!
//! The wire shape (`RequestEnvelope`) is kept apart from the value handed to
//! the handler (`ProcedureCall<I>`): the envelope carries the input as raw JSON,
//! the call carries it decoded into the procedure's declared input type.
//! Kind and provider procedures have no entity and use `InputEnvelope`.

use procwire_core::Entity;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ProcedureError;

/// Body of `POST /{procedure}` as it arrives on the wire.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RequestEnvelope {
    /// Procedure argument; absent or `null` for procedures without input
    #[serde(default)]
    pub input: Option<serde_json::Value>,
    /// Entity the procedure is invoked on
    pub entity: Entity,
}

/// Body of a kind or provider procedure call.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct InputEnvelope {
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

/// A decoded invocation, ready for the handler.
#[derive(Debug)]
pub struct ProcedureCall<I> {
    pub entity: Entity,
    pub input: Option<I>,
}

impl<I: DeserializeOwned> TryFrom<RequestEnvelope> for ProcedureCall<I> {
    type Error = serde_json::Error;

    fn try_from(envelope: RequestEnvelope) -> Result<Self, Self::Error> {
        let input = envelope.input.map(serde_json::from_value).transpose()?;
        Ok(Self {
            entity: envelope.entity,
            input,
        })
    }
}

/// Parse a request body into a typed call. Both the envelope shape and the
/// input type are checked; either failing is a malformed request.
pub fn decode_call<I: DeserializeOwned>(body: &[u8]) -> Result<ProcedureCall<I>, ProcedureError> {
    let envelope: RequestEnvelope =
        serde_json::from_slice(body).map_err(ProcedureError::MalformedRequest)?;
    ProcedureCall::try_from(envelope).map_err(ProcedureError::MalformedRequest)
}

/// Parse the body of a call that carries only an input.
pub fn decode_input<I: DeserializeOwned>(body: &[u8]) -> Result<Option<I>, ProcedureError> {
    let envelope: InputEnvelope =
        serde_json::from_slice(body).map_err(ProcedureError::MalformedRequest)?;
    envelope
        .input
        .map(serde_json::from_value)
        .transpose()
        .map_err(ProcedureError::MalformedRequest)
}

/// Try to extract a field name from serde's error messages.
pub(crate) fn field_from_serde_message(msg: &str) -> Option<String> {
    // Pattern: "missing field `fieldname`"
    if let Some(start) = msg.find("missing field `") {
        let after = &msg[start + 15..];
        if let Some(end) = after.find('`') {
            return Some(after[..end].to_string());
        }
    }
    // Pattern: "unknown field `fieldname`"
    if let Some(start) = msg.find("unknown field `") {
        let after = &msg[start + 15..];
        if let Some(end) = after.find('`') {
            return Some(after[..end].to_string());
        }
    }
    None
}
