//! Reconciler configuration, lobby creation options, and the local player.

use std::time::Duration;

use lobbyforge_protocol::{LobbyPlayer, PlayerId};
use serde::{Deserialize, Serialize};

/// Passwords shorter than this are never sent to the directory.
pub const MIN_PASSWORD_LEN: usize = 8;

// ---------------------------------------------------------------------------
// ReconcilerConfig
// ---------------------------------------------------------------------------

/// Timing and capacity settings for a [`LobbyReconciler`](crate::LobbyReconciler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// How often the host refreshes the lobby's keep-alive.
    pub heartbeat_interval: Duration,

    /// Lower bound of the poll period. Each period is drawn from
    /// `poll_interval_min..=poll_interval_max`.
    pub poll_interval_min: Duration,

    /// Upper bound of the poll period.
    pub poll_interval_max: Duration,

    /// Consecutive failed polls after which the lobby is considered gone.
    pub max_poll_failures: u32,

    /// How long leave, kick, and change-host wait for an in-flight poll.
    pub interaction_timeout: Duration,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            poll_interval_min: Duration::from_millis(1100),
            poll_interval_max: Duration::from_millis(1250),
            max_poll_failures: 3,
            interaction_timeout: Duration::from_secs(15),
            event_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// CreateLobbyConfig
// ---------------------------------------------------------------------------

/// Options for [`LobbyReconciler::create_lobby`](crate::LobbyReconciler::create_lobby).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLobbyConfig {
    /// Lobby name. Blank or missing becomes `"{player}'s Lobby"`.
    pub name: Option<String>,

    /// Seats, including the host. Zero is raised to one.
    pub max_players: u32,

    pub is_private: bool,

    /// Optional password. Blank is treated as no password.
    pub password: Option<String>,

    /// Keep the lobby listed after its session starts. When `false` the
    /// lobby is destroyed once the session is under way.
    pub keep_alive: bool,

    /// Delete the lobby when the host leaves instead of migrating the host.
    pub destroy_with_host: bool,

    /// Relay capacity to request instead of `max_players`.
    pub custom_connections: Option<u32>,
}

impl Default for CreateLobbyConfig {
    fn default() -> Self {
        Self {
            name: None,
            max_players: 4,
            is_private: false,
            password: None,
            keep_alive: false,
            destroy_with_host: false,
            custom_connections: None,
        }
    }
}

/// Host-side settings chosen at creation, kept for the lifetime of the
/// lobby. Members that joined get the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySettings {
    pub destroy_with_host: bool,
    pub destroy_after_session: bool,
    pub custom_connections: Option<u32>,
}

impl From<&CreateLobbyConfig> for LobbySettings {
    fn from(config: &CreateLobbyConfig) -> Self {
        Self {
            destroy_with_host: config.destroy_with_host,
            destroy_after_session: !config.keep_alive,
            custom_connections: config.custom_connections,
        }
    }
}

// ---------------------------------------------------------------------------
// LocalPlayer
// ---------------------------------------------------------------------------

/// The signed-in player on this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPlayer {
    pub id: PlayerId,
    pub display_name: String,
}

impl LocalPlayer {
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    pub fn to_lobby_player(&self) -> LobbyPlayer {
        LobbyPlayer::new(self.id.clone(), self.display_name.clone())
    }
}
