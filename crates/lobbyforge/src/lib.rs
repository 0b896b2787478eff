//! # Lobbyforge
//!
//! Lobby and relay session reconciliation engine for multiplayer games.
//!
//! Lobbyforge keeps a client's view of a hosted lobby in step with the
//! remote lobby directory, and turns a lobby into a running game session
//! over a relay: the host allocates and publishes a join code, members
//! pick it up and connect. Every remote call is single-flight, every
//! multi-step operation is bounded by a timeout with compensation, and
//! everything is reported as typed events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lobbyforge::prelude::*;
//!
//! # async fn demo() -> Result<(), LobbyforgeError> {
//! let lobbies = Arc::new(MemoryLobbyService::new());
//! let (transport, transport_events) = MemoryTransport::new(ClientId::new(1));
//! let client = LobbyClientBuilder::new(LocalPlayer::new(PlayerId::new("p1"), "Ada"))
//!     .build(lobbies, MemoryRelayService::default(), transport);
//!
//! client.create_lobby(CreateLobbyConfig::default()).await?;
//! client.start_game(None).await?;
//! client.run(transport_events, async { /* wait for ctrl-c */ }).await
//! # }
//! ```

mod client;
mod error;
mod notify;

pub use client::{LobbyClient, LobbyClientBuilder};
pub use error::LobbyforgeError;
pub use notify::{Notification, NotificationKind};

pub use lobbyforge_lobby as lobby;
pub use lobbyforge_protocol as protocol;
pub use lobbyforge_remote as remote;
pub use lobbyforge_session as session;
pub use lobbyforge_tick as tick;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::{
        LobbyClient, LobbyClientBuilder, LobbyforgeError, Notification,
        NotificationKind,
    };
    pub use lobbyforge_lobby::{
        search, BrowseFilter, CreateLobbyConfig, ErrorClass, LobbyBrowser,
        LobbyError, LobbyEvent, LobbyReconciler, LobbySummary, LocalPlayer,
        ReconcilerConfig,
    };
    pub use lobbyforge_protocol::{
        keys, LobbyId, LobbyPatch, LobbyPlayer, LobbySnapshot, PlayerId, Region,
    };
    #[cfg(feature = "memory")]
    pub use lobbyforge_remote::{MemoryLobbyService, MemoryRelayService, MemoryTransport};
    pub use lobbyforge_remote::{
        ClientId, LobbyService, RelayService, RemoteError, Transport, TransportEvent,
    };
    pub use lobbyforge_session::{
        SessionConfig, SessionCoordinator, SessionError, SessionEvent, SessionRole,
        SessionState,
    };
    pub use lobbyforge_tick::{TickConfig, TickScheduler};
}
