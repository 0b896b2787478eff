//! Error types for the session layer.

use lobbyforge_lobby::{ErrorClass, LobbyError};
use lobbyforge_remote::RemoteError;
use lobbyforge_tick::OperationKind;

use crate::SessionState;

/// Errors that can occur while starting, joining, or stopping a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Only the lobby host can start or own a session.
    #[error("only the host can start the game")]
    NotHost,

    #[error("not in a lobby")]
    NoLobby,

    #[error("{0} already in progress")]
    Busy(OperationKind),

    /// The session is in a state that doesn't allow this operation.
    #[error("cannot do that while the session is {0}")]
    InvalidState(SessionState),

    /// `stop_session` was called with no session running.
    #[error("no game session is running")]
    NotStarted,

    /// The transport refused to start.
    #[error("network transport failed to start")]
    TransportStartFailed,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotHost => ErrorClass::Authority,
            Self::Busy(_) => ErrorClass::Concurrency,
            Self::NoLobby | Self::InvalidState(_) | Self::NotStarted => ErrorClass::State,
            Self::TransportStartFailed | Self::Remote(_) => ErrorClass::Transient,
            Self::Lobby(e) => e.class(),
        }
    }
}
