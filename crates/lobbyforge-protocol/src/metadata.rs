//! Lobby metadata: the key/value channel the host uses to signal peers.
//!
//! The lobby directory stores arbitrary string pairs alongside each lobby.
//! Lobbyforge uses one fixed schema on top of it, listed in [`keys`]. Every
//! value is a string; flags use `"0"`/`"1"` or `"true"`/`"false"` exactly as
//! written here, because other clients compare them textually.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata key names shared by every peer.
pub mod keys {
    /// Relay join code of the running session, or `"0"` when none.
    pub const SESSION_RELAY_CODE: &str = "SESSION_RELAY_CODE";
    /// `"1"` while a session runs, `"0"` otherwise.
    pub const SESSION_STARTED: &str = "SESSION_STARTED";
    /// `"true"` if the lobby is deleted once its session starts.
    pub const DESTROY_AFTER_SESSION: &str = "DESTROY_AFTER_SESSION";
    /// Decimal member count at session start.
    pub const PLAYER_COUNT: &str = "PLAYER_COUNT";
    /// Human-readable lobby name shown to members.
    pub const LOBBY_NAME: &str = "LOBBY_NAME";
}

/// Sentinel stored in `SESSION_RELAY_CODE` and `SESSION_STARTED` when no
/// session is running.
pub const NOT_STARTED: &str = "0";

/// Value stored in `SESSION_STARTED` while a session runs.
pub const STARTED: &str = "1";

/// Who can read a metadata entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum Visibility {
    /// Visible in lobby queries, before joining.
    Public,
    /// Visible to lobby members only.
    #[default]
    Member,
}

/// A single metadata value together with its visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub value: String,
    pub visibility: Visibility,
}

impl MetadataEntry {
    pub fn new(value: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            value: value.into(),
            visibility,
        }
    }

    pub fn public(value: impl Into<String>) -> Self {
        Self::new(value, Visibility::Public)
    }

    pub fn member(value: impl Into<String>) -> Self {
        Self::new(value, Visibility::Member)
    }
}

/// Lobby metadata. A `BTreeMap` keeps iteration order stable, which keeps
/// logs and test assertions deterministic.
pub type Metadata = BTreeMap<String, MetadataEntry>;

/// Renders a boolean the way `DESTROY_AFTER_SESSION` expects it.
pub fn bool_flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
