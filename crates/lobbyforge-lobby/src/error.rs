//! Error types for the lobby layer.

use lobbyforge_protocol::PlayerId;
use lobbyforge_remote::RemoteError;
use lobbyforge_tick::OperationKind;

/// Broad failure categories shared by every Lobbyforge error.
///
/// Callers use this to decide how to react: a `Transient` failure is worth
/// retrying later, a `Concurrency` rejection is usually safe to ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A remote call failed. Nothing changed locally.
    Transient,
    /// The request was malformed and no remote call was made.
    Validation,
    /// An attempt of the same kind is already in flight.
    Concurrency,
    /// A bounded wait expired and compensation ran.
    Timeout,
    /// A host-only action was requested by a non-host.
    Authority,
    /// The operation makes no sense in the current state.
    State,
}

/// Errors that can occur during lobby operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("lobby code must not be blank")]
    InvalidCode,

    #[error("password must be at least {min} characters", min = crate::MIN_PASSWORD_LEN)]
    InvalidPassword,

    /// The target of a kick or host change is not a member.
    #[error("player {0} is not in the lobby")]
    UnknownPlayer(PlayerId),

    #[error("{0} already in progress")]
    Busy(OperationKind),

    #[error("only the host can do that")]
    NotHost,

    #[error("not in a lobby")]
    NoLobby,

    #[error("{0} timed out waiting for the lobby to settle")]
    Timeout(OperationKind),

    /// The lobby's session already started and the lobby will not outlive
    /// it.
    #[error("the lobby's game has already started")]
    UnableToJoin,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl LobbyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidCode | Self::InvalidPassword | Self::UnknownPlayer(_) => {
                ErrorClass::Validation
            }
            Self::Busy(_) => ErrorClass::Concurrency,
            Self::NotHost => ErrorClass::Authority,
            Self::NoLobby | Self::UnableToJoin => ErrorClass::State,
            Self::Timeout(_) => ErrorClass::Timeout,
            Self::Remote(_) => ErrorClass::Transient,
        }
    }
}
