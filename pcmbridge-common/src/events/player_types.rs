//! Player identity and state types carried by events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque player handle
///
/// Issued by the registry in strictly increasing order and never reused
/// within a process, even after the player is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Raw integer value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(raw: u64) -> Self {
        PlayerId(raw)
    }
}

/// Player buffer state machine
///
/// `Active ⇄ Paused`, and either one moves to `Closed`, which is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Active,
    Paused,
    Closed,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Active => write!(f, "active"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Closed => write!(f, "closed"),
        }
    }
}
