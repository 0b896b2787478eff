//! Remote collaborator contracts for Lobbyforge.
//!
//! Provides the [`LobbyService`], [`RelayService`], and [`Transport`] traits
//! that abstract over the hosted lobby directory, the relay allocator, and
//! the peer transport. The reconciliation engine only ever talks to these
//! traits; which vendor SDK sits behind them is the application's choice.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process implementations of all three traits,
//!   used by the demo and by end-to-end tests.

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::RemoteError;
#[cfg(feature = "memory")]
pub use memory::{MemoryLobbyService, MemoryRelayService, MemoryTransport};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use lobbyforge_protocol::{
    AllocationId, CreateLobbyRequest, JoinLobbyRequest, LobbyId, LobbyPatch,
    LobbyQuery, LobbySnapshot, PlayerId, RelayAllocation, RelayServerData,
    Region,
};

/// Transport-level identifier of a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Creates a new `ClientId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// The hosted lobby directory.
///
/// Every call is a potentially slow, rate-limited request that can fail at
/// any time. Implementations must not retry internally; the caller decides
/// whether the next poll is the retry.
///
/// Methods return `impl Future + Send` so callers can move the work onto a
/// spawned task. Implementations may simply write `async fn`.
pub trait LobbyService: Send + Sync + 'static {
    /// Creates a lobby with the requesting player as host.
    fn create_lobby(
        &self,
        request: CreateLobbyRequest,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send;

    /// Fetches the current state of a lobby.
    fn get_lobby(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send;

    /// Applies a host change and/or metadata upsert. Host only.
    fn update_lobby(
        &self,
        lobby_id: &LobbyId,
        patch: LobbyPatch,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send;

    /// Deletes a lobby. Host only.
    fn delete_lobby(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Joins a lobby using its short code.
    fn join_by_code(
        &self,
        code: &str,
        request: JoinLobbyRequest,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send;

    /// Joins a lobby using its id.
    fn join_by_id(
        &self,
        lobby_id: &LobbyId,
        request: JoinLobbyRequest,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send;

    /// Removes a member. Members may remove themselves; the host may remove
    /// anyone.
    fn remove_player(
        &self,
        lobby_id: &LobbyId,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Keeps a lobby from expiring. Host only.
    fn send_heartbeat(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Lists public lobbies.
    fn query_lobbies(
        &self,
        query: &LobbyQuery,
    ) -> impl Future<Output = Result<Vec<LobbySnapshot>, RemoteError>> + Send;
}

/// The relay allocator that lets peers reach the host without direct
/// connectivity.
pub trait RelayService: Send + Sync + 'static {
    /// Reserves relay capacity for `max_players` peers, optionally pinned
    /// to a region.
    fn create_allocation(
        &self,
        max_players: u32,
        region: Option<&str>,
    ) -> impl Future<Output = Result<RelayAllocation, RemoteError>> + Send;

    /// Issues the join code peers use to reach an allocation.
    fn join_code(
        &self,
        allocation_id: &AllocationId,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;

    /// Resolves a join code into connection parameters.
    fn join_allocation(
        &self,
        join_code: &str,
    ) -> impl Future<Output = Result<RelayServerData, RemoteError>> + Send;

    /// Lists the regions allocations can be pinned to.
    fn list_regions(
        &self,
    ) -> impl Future<Output = Result<Vec<Region>, RemoteError>> + Send;
}

/// Callbacks raised by the transport. The application forwards these to
/// the session coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// The local peer finished starting. `is_host` tells which side.
    ClientConnected { is_host: bool },
    /// A client dropped off.
    ClientDisconnected { client_id: ClientId },
    /// The local transport stopped after a shutdown.
    ClientStopped { was_host: bool },
}

/// The peer transport. Calls are synchronous requests; completion is
/// reported later through [`TransportEvent`]s.
pub trait Transport: Send + Sync + 'static {
    /// Points the transport at a relay server.
    fn configure_relay(&self, server: RelayServerData);

    /// Starts as host. Returns `false` if the transport refused to start.
    fn start_host(&self) -> bool;

    /// Starts as client. Returns `false` if the transport refused to start.
    fn start_client(&self) -> bool;

    /// Begins shutting down. Completion arrives as
    /// [`TransportEvent::ClientStopped`].
    fn shutdown(&self);

    /// `true` while a shutdown is under way, including one the remote host
    /// initiated by going away.
    fn is_shutdown_in_progress(&self) -> bool;

    /// This peer's own client id.
    fn local_client_id(&self) -> ClientId;
}

// ---------------------------------------------------------------------------
// Shared handles
// ---------------------------------------------------------------------------

// The engine takes its collaborators by value. These impls let a caller
// keep an `Arc` to the same service for its own use.

impl<T: LobbyService> LobbyService for Arc<T> {
    fn create_lobby(
        &self,
        request: CreateLobbyRequest,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send {
        (**self).create_lobby(request)
    }

    fn get_lobby(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send {
        (**self).get_lobby(lobby_id)
    }

    fn update_lobby(
        &self,
        lobby_id: &LobbyId,
        patch: LobbyPatch,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send {
        (**self).update_lobby(lobby_id, patch)
    }

    fn delete_lobby(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        (**self).delete_lobby(lobby_id)
    }

    fn join_by_code(
        &self,
        code: &str,
        request: JoinLobbyRequest,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send {
        (**self).join_by_code(code, request)
    }

    fn join_by_id(
        &self,
        lobby_id: &LobbyId,
        request: JoinLobbyRequest,
    ) -> impl Future<Output = Result<LobbySnapshot, RemoteError>> + Send {
        (**self).join_by_id(lobby_id, request)
    }

    fn remove_player(
        &self,
        lobby_id: &LobbyId,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        (**self).remove_player(lobby_id, player_id)
    }

    fn send_heartbeat(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        (**self).send_heartbeat(lobby_id)
    }

    fn query_lobbies(
        &self,
        query: &LobbyQuery,
    ) -> impl Future<Output = Result<Vec<LobbySnapshot>, RemoteError>> + Send {
        (**self).query_lobbies(query)
    }
}

impl<T: RelayService> RelayService for Arc<T> {
    fn create_allocation(
        &self,
        max_players: u32,
        region: Option<&str>,
    ) -> impl Future<Output = Result<RelayAllocation, RemoteError>> + Send {
        (**self).create_allocation(max_players, region)
    }

    fn join_code(
        &self,
        allocation_id: &AllocationId,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send {
        (**self).join_code(allocation_id)
    }

    fn join_allocation(
        &self,
        join_code: &str,
    ) -> impl Future<Output = Result<RelayServerData, RemoteError>> + Send {
        (**self).join_allocation(join_code)
    }

    fn list_regions(
        &self,
    ) -> impl Future<Output = Result<Vec<Region>, RemoteError>> + Send {
        (**self).list_regions()
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn configure_relay(&self, server: RelayServerData) {
        (**self).configure_relay(server)
    }

    fn start_host(&self) -> bool {
        (**self).start_host()
    }

    fn start_client(&self) -> bool {
        (**self).start_client()
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }

    fn is_shutdown_in_progress(&self) -> bool {
        (**self).is_shutdown_in_progress()
    }

    fn local_client_id(&self) -> ClientId {
        (**self).local_client_id()
    }
}
