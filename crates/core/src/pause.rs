use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::execution::Opcode;
use crate::types::{Identifier, Timestamp};

/// A suspended point in a run, waiting for a signal or a timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pause {
    pub id: Uuid,
    pub identifier: Identifier,
    /// Step that suspended the run.
    pub outgoing: String,
    /// Step to resume into.
    pub incoming: String,
    #[serde(default)]
    pub expires: Option<Timestamp>,
    /// Event name the pause waits for, when it is a wait-for-event pause.
    #[serde(default)]
    pub event: Option<String>,
    /// Why the run was suspended.
    #[serde(default)]
    pub opcode: Option<Opcode>,
}

impl Pause {
    /// Whether the run is suspended waiting on another function's result.
    pub fn is_invoke(&self) -> bool {
        self.opcode == Some(Opcode::InvokeFunction)
    }
}
