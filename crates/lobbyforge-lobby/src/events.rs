//! Events published by the reconciler.

use std::sync::Arc;

use lobbyforge_protocol::{LobbySnapshot, PlayerId};

/// Outbound lobby notifications.
///
/// Each mutating operation publishes an "in progress" event followed by
/// exactly one outcome. Failure events carry a human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub enum LobbyEvent {
    Creating,
    Created(Arc<LobbySnapshot>),
    CreateFailed { reason: String },

    Joining,
    Joined(Arc<LobbySnapshot>),
    JoinFailed { reason: String },
    /// The lobby's session already started; the join was rolled back.
    UnableToJoin,

    Leaving,
    Left,
    LeaveFailed { reason: String },

    Destroying,
    Destroyed,
    DestroyFailed { reason: String },

    KickingPlayer { player_id: PlayerId },
    PlayerKicked { player_id: PlayerId },
    KickFailed { player_id: PlayerId, reason: String },
    /// The local player was removed from the lobby by the host.
    Kicked,

    ChangingHost { player_id: PlayerId },
    HostChanged { host_id: PlayerId },
    ChangeHostFailed { reason: String },

    Updating,
    Updated(Arc<LobbySnapshot>),
    UpdateFailed { reason: String },

    /// Polling failed too many times in a row; the lobby is gone.
    LobbyNotFound,
    HeartbeatFailed { reason: String },
    /// A poll replaced the cached snapshot.
    SnapshotSynced(Arc<LobbySnapshot>),
}

impl LobbyEvent {
    /// Returns `true` for the events that end an operation unsuccessfully.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed { .. }
                | Self::JoinFailed { .. }
                | Self::UnableToJoin
                | Self::LeaveFailed { .. }
                | Self::DestroyFailed { .. }
                | Self::KickFailed { .. }
                | Self::ChangeHostFailed { .. }
                | Self::UpdateFailed { .. }
                | Self::HeartbeatFailed { .. }
        )
    }
}
