//! Wire format: inbound command decoding and outbound frame encoding.
//!
//! Inbound text is decoded once into [`Command`]. Registration frames look
//! like `{"commandId": 1, "parameters": [{"name": "...", "type": "..."}]}`
//! (`1` = remote, `2` = robot). Every other text frame, JSON or not, is a
//! data message and is relayed verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::Profile;
use crate::errors::RelayError;
use crate::history::HistoryEntry;

/// `commandId` that registers the sender as a remote.
pub const REGISTER_REMOTE: u64 = 1;
/// `commandId` that registers the sender as a robot.
pub const REGISTER_ROBOT: u64 = 2;

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Register the sender as a remote.
    RegisterRemote(Profile),
    /// Register the sender as a robot.
    RegisterRobot(Profile),
    /// Relay the raw text to the opposite role.
    Data(String),
}

impl Command {
    /// Decode an inbound text frame.
    ///
    /// Only a registration with a bad `parameters` list fails.
    pub fn decode(text: &str) -> Result<Self, RelayError> {
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            return Ok(Self::Data(text.to_owned()));
        };

        match value.get("commandId").and_then(command_number) {
            Some(REGISTER_REMOTE) => Ok(Self::RegisterRemote(registration_profile(&value)?)),
            Some(REGISTER_ROBOT) => Ok(Self::RegisterRobot(registration_profile(&value)?)),
            _ => Ok(Self::Data(text.to_owned())),
        }
    }
}

/// Accepts integral JSON numbers, including `1.0`.
fn command_number(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

fn registration_profile(value: &Value) -> Result<Profile, RelayError> {
    let first = value
        .get("parameters")
        .and_then(Value::as_array)
        .and_then(|params| params.first())
        .ok_or_else(|| {
            RelayError::MalformedPayload("registration requires a non-empty parameters array".into())
        })?;

    Profile::deserialize(first)
        .map_err(|e| RelayError::MalformedPayload(format!("invalid profile: {e}")))
}

/// Body of an `error` frame.
#[derive(Clone, Debug, Serialize)]
pub struct RejectionNotice {
    /// Stable error code, see [`RelayError::error_code`].
    pub code: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl From<&RelayError> for RejectionNotice {
    fn from(err: &RelayError) -> Self {
        Self {
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

/// A frame sent from the relay to a peer.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OutboundFrame<'a> {
    /// Replay of past messages, sent once after accept.
    History(&'a [HistoryEntry]),
    /// A single relayed message.
    Command(&'a HistoryEntry),
    /// Opt-in rejection notice.
    Error(RejectionNotice),
}

impl OutboundFrame<'_> {
    /// Serialize to the JSON text sent on the wire.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
