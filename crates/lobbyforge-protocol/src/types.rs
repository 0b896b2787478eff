//! Core lobby types: identities, players, and the lobby snapshot.
//!
//! Everything in this module describes what the remote lobby directory
//! returns. The client never edits these values field by field: a
//! [`LobbySnapshot`] is fetched, held, and eventually replaced by the next
//! one the service hands back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::{keys, Metadata, NOT_STARTED};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player, as issued by the authentication service.
///
/// This is a "newtype wrapper" around the service's opaque string id. The
/// wrapper keeps a `PlayerId` from being passed where a `LobbyId` is
/// expected, even though both are strings underneath.
///
/// `#[serde(transparent)]` serializes it as the bare string, not
/// `{ "0": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates a `PlayerId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique identifier for a lobby in the remote directory.
///
/// Not to be confused with the lobby *code*, which is the short string
/// players type to join a private lobby.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(pub String);

impl LobbyId {
    /// Creates a `LobbyId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A lobby member as listed by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub display_name: String,
}

impl LobbyPlayer {
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// LobbySnapshot
// ---------------------------------------------------------------------------

/// One immutable view of a lobby, as returned by create/join/get/update.
///
/// The host is whichever player `host_id` points at. The directory keeps
/// `host_id` pointing at a current member; if the local player's id is
/// missing from `players`, the local player has been removed (kicked).
///
/// Session signalling rides on [`metadata`](Self::metadata) rather than on
/// dedicated fields, so the helpers below are the only place that knows how
/// to read the keys in [`keys`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub id: LobbyId,
    /// Short join code for private lobbies.
    pub code: String,
    pub name: String,
    pub host_id: PlayerId,
    pub max_players: u32,
    pub is_private: bool,
    pub has_password: bool,
    /// Members in join order.
    pub players: Vec<LobbyPlayer>,
    pub metadata: Metadata,
}

impl LobbySnapshot {
    /// Returns `true` if `player` is the lobby host.
    pub fn is_host(&self, player: &PlayerId) -> bool {
        &self.host_id == player
    }

    /// Returns `true` if `player` is listed as a member.
    pub fn contains_player(&self, player: &PlayerId) -> bool {
        self.players.iter().any(|p| &p.id == player)
    }

    /// Looks up a member by id.
    pub fn player(&self, player: &PlayerId) -> Option<&LobbyPlayer> {
        self.players.iter().find(|p| &p.id == player)
    }

    /// Returns the host's player entry, if the host is still listed.
    pub fn host(&self) -> Option<&LobbyPlayer> {
        self.player(&self.host_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Free seats left. Saturates at zero if the directory ever reports
    /// more members than seats.
    pub fn available_slots(&self) -> u32 {
        let taken = u32::try_from(self.players.len()).unwrap_or(u32::MAX);
        self.max_players.saturating_sub(taken)
    }

    /// Reads a metadata value by key.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|entry| entry.value.as_str())
    }

    /// Returns the relay join code once the host has published one.
    ///
    /// `None` when the key is missing, empty, or holds the "not started"
    /// sentinel `"0"`.
    pub fn relay_code(&self) -> Option<&str> {
        self.metadata_value(keys::SESSION_RELAY_CODE)
            .filter(|code| !code.is_empty() && *code != NOT_STARTED)
    }

    /// Returns `true` if the host has flagged the session as started.
    pub fn session_started(&self) -> bool {
        self.metadata_value(keys::SESSION_STARTED) == Some("1")
    }

    /// Returns `true` if the lobby is torn down once its session starts.
    pub fn destroy_after_session(&self) -> bool {
        self.metadata_value(keys::DESTROY_AFTER_SESSION) == Some("true")
    }

    /// A lobby that is mid-session and will be destroyed afterwards can
    /// never be meaningfully joined: by the time the joiner is in, the
    /// session it would wait for is already running without it.
    pub fn is_closed_session(&self) -> bool {
        self.session_started() && self.destroy_after_session()
    }

    /// The `LOBBY_NAME` entry when present, falling back to `name`.
    pub fn display_name(&self) -> &str {
        self.metadata_value(keys::LOBBY_NAME).unwrap_or(&self.name)
    }
}
