//! Unified error type for the Lobbyforge engine.

use lobbyforge_lobby::{ErrorClass, LobbyError};
use lobbyforge_remote::RemoteError;
use lobbyforge_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `lobbyforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
#[derive(Debug, thiserror::Error)]
pub enum LobbyforgeError {
    /// A lobby operation failed (validation, authority, busy, remote).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// A session operation failed (relay, transport, state).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A remote call failed outside of a lobby or session operation.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl LobbyforgeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Lobby(e) => e.class(),
            Self::Session(e) => e.class(),
            Self::Remote(_) => ErrorClass::Transient,
        }
    }
}
