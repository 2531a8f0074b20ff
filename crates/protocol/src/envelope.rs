use serde::{Deserialize, Serialize};

use crate::constants::CommandName;

/// Error details carried by a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallError {
    pub code: i32,
    pub message: String,
}

/// Errors produced while decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing payload for {0}")]
    MissingPayload(CommandName),
}

/// Envelope for every call across the client-backend boundary.
///
/// The payload stays raw JSON until the receiver knows which type to decode,
/// so the envelope itself never depends on the command set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub command: CommandName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

impl Message {
    /// Creates a new message with the given command and payload.
    pub fn new<T: Serialize>(
        id: impl Into<String>,
        command: CommandName,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match payload {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            id: id.into(),
            command,
            payload: raw,
            error: None,
        })
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.payload {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Deserializes the payload, treating its absence as an error.
    pub fn require_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ProtocolError> {
        self.parse_payload()?
            .ok_or(ProtocolError::MissingPayload(self.command))
    }

    /// Creates an error message.
    pub fn error(id: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: CommandName::Error,
            payload: None,
            error: Some(CallError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Creates a result reply for this request.
    pub fn reply<T: Serialize>(&self, payload: Option<&T>) -> Result<Self, serde_json::Error> {
        Message::new(&self.id, CommandName::Result, payload)
    }

    /// Creates an error reply for this request.
    pub fn reply_error(&self, code: i32, message: impl Into<String>) -> Self {
        Message::error(&self.id, code, message)
    }

    /// Returns `true` if this message reports a failed call.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.command == CommandName::Error
    }
}
