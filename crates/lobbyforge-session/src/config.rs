use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`SessionCoordinator`](crate::SessionCoordinator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long the host transport may take to report ready.
    pub host_start_timeout: Duration,

    /// How long a client may take to connect after starting.
    pub client_join_timeout: Duration,

    /// Automatic join attempts per published session before the member
    /// gives up and leaves the lobby.
    pub max_join_attempts: u32,

    /// Scene to return to when a session ends.
    pub return_target: String,

    /// Scene to load once a session is active, if the application wants
    /// one.
    pub game_target: Option<String>,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host_start_timeout: Duration::from_secs(35),
            client_join_timeout: Duration::from_secs(35),
            max_join_attempts: 1,
            return_target: "Lobby".to_string(),
            game_target: None,
            event_capacity: 64,
        }
    }
}
