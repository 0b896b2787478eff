//! Lobby reconciliation for Lobbyforge.
//!
//! The [`LobbyReconciler`] owns the client's view of the lobby it is in. It
//! polls the remote directory, sends host heartbeats, detects being kicked,
//! and guards every mutation (create, join, leave, kick, destroy, host
//! change, update) with a single-flight latch.
//!
//! # Key types
//!
//! - [`LobbyReconciler`]: snapshot owner and lobby operations
//! - [`LobbyBrowser`]: public lobby listings
//! - [`LobbyEvent`]: what the reconciler publishes
//! - [`ReconcilerConfig`] / [`CreateLobbyConfig`]: settings
//!
//! # Driving it
//!
//! Nothing happens in the background on its own. The owner calls
//! [`LobbyReconciler::tick`] at a steady rate with the elapsed time, and the
//! reconciler decides whether a heartbeat or poll is due.

mod browser;
mod config;
mod error;
mod events;
mod reconciler;

pub use browser::{search, BrowseFilter, LobbyBrowser, LobbySummary};
pub use config::{
    CreateLobbyConfig, LobbySettings, LocalPlayer, ReconcilerConfig, MIN_PASSWORD_LEN,
};
pub use error::{ErrorClass, LobbyError};
pub use events::LobbyEvent;
pub use reconciler::LobbyReconciler;
