//! Batched message envelope.
//!
//! A batch goes out as one JSON document:
//! `{"_type": "<message type>", "data": [<message>, ...]}`. Object keys are
//! emitted in sorted order and timestamps as ISO-8601 strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BusResult;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Label consumers dispatch on.
    #[serde(rename = "_type")]
    pub msg_type: String,
    pub data: Vec<Value>,
}

impl Envelope {
    pub fn new(msg_type: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            msg_type: msg_type.into(),
            data,
        }
    }

    pub fn to_bytes(&self) -> BusResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> BusResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
