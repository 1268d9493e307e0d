//! Identifier types for agents and connected viewers.
//!
//! Agents are named by short stable tokens (`P01`, `P02`, ...) that the
//! board client renders directly, so [`AgentId`] wraps a [`String`].
//! Viewer connections are anonymous and get a time-ordered UUID.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Stable identifier of an agent on the board.
///
/// Ordering is lexicographic, which for the zero-padded roster tokens
/// matches numeric order and defines the roster iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct AgentId(String);

impl AgentId {
    /// Create an identifier from any string-like token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Build the roster token for the `n`-th agent (`P01`, `P02`, ...).
    pub fn numbered(n: usize) -> Self {
        Self(format!("P{n:02}"))
    }

    /// Borrow the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

impl From<String> for AgentId {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Identifier of one live viewer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
