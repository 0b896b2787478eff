//! Player-facing notifications derived from engine events.
//!
//! A UI sink opens a progress banner on [`NotificationKind::Progress`] and
//! replaces it with the matching `Done` or `Error` notification. Routine
//! events (polls, metadata updates) map to nothing.

use lobbyforge_lobby::LobbyEvent;
use lobbyforge_session::SessionEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Progress,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn progress(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Progress, title, message)
    }

    pub fn done(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Done, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, title, message)
    }

    fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Maps a lobby event to what the player should see, if anything.
    pub fn from_lobby(event: &LobbyEvent) -> Option<Self> {
        let notification = match event {
            LobbyEvent::Creating => Self::progress("Creating lobby", "Setting up your lobby..."),
            LobbyEvent::Created(lobby) => Self::done(
                "Lobby created",
                format!("{} is open. Share code {}.", lobby.display_name(), lobby.code),
            ),
            LobbyEvent::CreateFailed { reason } => Self::error("Could not create lobby", reason),

            LobbyEvent::Joining => Self::progress("Joining lobby", "Connecting to the lobby..."),
            LobbyEvent::Joined(lobby) => {
                Self::done("Joined lobby", format!("Welcome to {}.", lobby.display_name()))
            }
            LobbyEvent::JoinFailed { reason } => Self::error("Could not join lobby", reason),
            LobbyEvent::UnableToJoin => Self::error(
                "Unable to join",
                "The game in this lobby has already started.",
            ),

            LobbyEvent::Leaving => Self::progress("Leaving lobby", "Leaving the lobby..."),
            LobbyEvent::Left => Self::done("Left lobby", "You left the lobby."),
            LobbyEvent::LeaveFailed { reason } => Self::error("Could not leave lobby", reason),

            LobbyEvent::Destroying => Self::progress("Closing lobby", "Closing the lobby..."),
            LobbyEvent::Destroyed => Self::done("Lobby closed", "The lobby was closed."),
            LobbyEvent::DestroyFailed { reason } => Self::error("Could not close lobby", reason),

            LobbyEvent::KickingPlayer { player_id } => {
                Self::progress("Removing player", format!("Removing {player_id}..."))
            }
            LobbyEvent::PlayerKicked { player_id } => {
                Self::done("Player removed", format!("{player_id} was removed."))
            }
            LobbyEvent::KickFailed { reason, .. } => Self::error("Could not remove player", reason),
            LobbyEvent::Kicked => {
                Self::error("Removed from lobby", "The host removed you from the lobby.")
            }

            LobbyEvent::ChangingHost { player_id } => {
                Self::progress("Changing host", format!("Handing the lobby to {player_id}..."))
            }
            LobbyEvent::HostChanged { host_id } => {
                Self::done("Host changed", format!("{host_id} is now the host."))
            }
            LobbyEvent::ChangeHostFailed { reason } => Self::error("Could not change host", reason),

            LobbyEvent::UpdateFailed { reason } => Self::error("Could not update lobby", reason),
            LobbyEvent::LobbyNotFound => {
                Self::error("Lobby lost", "The lobby could no longer be reached.")
            }

            LobbyEvent::Updating
            | LobbyEvent::Updated(_)
            | LobbyEvent::HeartbeatFailed { .. }
            | LobbyEvent::SnapshotSynced(_) => return None,
        };
        Some(notification)
    }

    /// Maps a session event to what the player should see, if anything.
    pub fn from_session(event: &SessionEvent) -> Option<Self> {
        let notification = match event {
            SessionEvent::StartingGame => Self::progress("Starting game", "Preparing the game server..."),
            SessionEvent::JoiningGame => Self::progress("Joining game", "Connecting to the host..."),
            SessionEvent::GameStarted { .. } => Self::done("Game started", "The game is running."),
            SessionEvent::GameFailedToStart { reason } => Self::error("Game failed to start", reason),
            SessionEvent::SessionFailedToStart => {
                Self::error("Game failed to start", "The game server did not come up in time.")
            }
            SessionEvent::SessionFailedToJoin => {
                Self::error("Could not join game", "The host could not be reached.")
            }
            SessionEvent::SessionFailedToLeave { reason } => {
                Self::error("Could not end game", reason)
            }
            SessionEvent::LeavingSession => Self::progress("Leaving game", "Leaving the game..."),
            SessionEvent::SessionLeft { .. } => Self::done("Left game", "You left the game."),
        };
        Some(notification)
    }
}
