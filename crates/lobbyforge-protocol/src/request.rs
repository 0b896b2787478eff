//! Request shapes sent to the lobby directory.

use serde::{Deserialize, Serialize};

use crate::metadata::{Metadata, MetadataEntry, Visibility};
use crate::{LobbyPlayer, PlayerId};

/// Everything the directory needs to create a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLobbyRequest {
    pub name: String,
    pub max_players: u32,
    pub is_private: bool,
    pub password: Option<String>,
    /// The creating player, who becomes the host.
    pub player: LobbyPlayer,
    pub metadata: Metadata,
}

/// Options for joining by code or by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLobbyRequest {
    pub password: Option<String>,
    pub player: LobbyPlayer,
}

/// A partial lobby update: a new host and/or metadata entries to upsert.
///
/// Built with chained methods:
///
/// ```rust
/// use lobbyforge_protocol::{keys, LobbyPatch, PlayerId};
///
/// let patch = LobbyPatch::new()
///     .host(PlayerId::new("bob"))
///     .member(keys::PLAYER_COUNT, "3");
/// assert!(!patch.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPatch {
    pub host_id: Option<PlayerId>,
    pub metadata: Metadata,
}

impl LobbyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands the host role to `player`.
    pub fn host(mut self, player: PlayerId) -> Self {
        self.host_id = Some(player);
        self
    }

    /// Upserts a metadata entry with explicit visibility.
    pub fn data(
        mut self,
        key: &str,
        value: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        self.metadata
            .insert(key.to_string(), MetadataEntry::new(value, visibility));
        self
    }

    pub fn public(self, key: &str, value: impl Into<String>) -> Self {
        self.data(key, value, Visibility::Public)
    }

    pub fn member(self, key: &str, value: impl Into<String>) -> Self {
        self.data(key, value, Visibility::Member)
    }

    /// Returns `true` if applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.host_id.is_none() && self.metadata.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A directory-side filter for lobby listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFilter {
    /// Only lobbies with more than `n` free seats.
    AvailableSlotsGreaterThan(u32),
}

/// Sort order for lobby listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOrder {
    CreatedAscending,
    CreatedDescending,
}

/// A lobby listing query. The default query asks for everything in the
/// directory's own order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyQuery {
    pub filters: Vec<QueryFilter>,
    pub order: Vec<QueryOrder>,
}
