//! In-process implementations of the remote contracts.
//!
//! These behave like the hosted services closely enough to run a full
//! host/client round trip inside one process: lobbies get ids and join
//! codes, passwords and seat limits are enforced, the host role migrates
//! when the host leaves, and member-only metadata is hidden from listings.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lobbyforge_protocol::{
    AllocationId, CreateLobbyRequest, JoinLobbyRequest, LobbyId, LobbyPatch,
    LobbyQuery, LobbySnapshot, PlayerId, QueryFilter, QueryOrder,
    RelayAllocation, RelayServerData, Region, Visibility,
};
use rand::Rng;
use tokio::sync::mpsc;

use crate::{
    ClientId, LobbyService, RelayService, RemoteError, Transport,
    TransportEvent,
};

/// Characters used for lobby and relay join codes. No 0/O or 1/I, which
/// players mistype.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Locks a mutex, recovering the data if a previous holder panicked. The
/// guarded maps are always left consistent between statements.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Lobby directory
// ---------------------------------------------------------------------------

struct StoredLobby {
    snapshot: LobbySnapshot,
    password: Option<String>,
    /// Creation order, used for `QueryOrder`.
    created: u64,
    heartbeats: u64,
}

#[derive(Default)]
struct Directory {
    lobbies: BTreeMap<LobbyId, StoredLobby>,
    next_id: u64,
}

impl Directory {
    fn get_mut(&mut self, lobby_id: &LobbyId) -> Result<&mut StoredLobby, RemoteError> {
        self.lobbies
            .get_mut(lobby_id)
            .ok_or_else(|| RemoteError::LobbyNotFound(lobby_id.to_string()))
    }

    fn find_by_code(&self, code: &str) -> Option<LobbyId> {
        self.lobbies
            .values()
            .find(|l| l.snapshot.code.eq_ignore_ascii_case(code))
            .map(|l| l.snapshot.id.clone())
    }

    fn join(
        &mut self,
        lobby_id: &LobbyId,
        request: JoinLobbyRequest,
    ) -> Result<LobbySnapshot, RemoteError> {
        let lobby = self.get_mut(lobby_id)?;
        if let Some(expected) = &lobby.password {
            if request.password.as_deref() != Some(expected.as_str()) {
                return Err(RemoteError::Rejected("incorrect password".into()));
            }
        }
        if lobby.snapshot.contains_player(&request.player.id) {
            return Ok(lobby.snapshot.clone());
        }
        if lobby.snapshot.available_slots() == 0 {
            return Err(RemoteError::Rejected("lobby is full".into()));
        }
        lobby.snapshot.players.push(request.player);
        Ok(lobby.snapshot.clone())
    }
}

/// An in-memory lobby directory.
#[derive(Default)]
pub struct MemoryLobbyService {
    directory: Mutex<Directory>,
}

impl MemoryLobbyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lobbies currently stored.
    pub fn lobby_count(&self) -> usize {
        lock(&self.directory).lobbies.len()
    }

    /// Heartbeats received for a lobby so far.
    pub fn heartbeats(&self, lobby_id: &LobbyId) -> u64 {
        lock(&self.directory)
            .lobbies
            .get(lobby_id)
            .map_or(0, |l| l.heartbeats)
    }
}

impl LobbyService for MemoryLobbyService {
    async fn create_lobby(
        &self,
        request: CreateLobbyRequest,
    ) -> Result<LobbySnapshot, RemoteError> {
        if request.max_players == 0 {
            return Err(RemoteError::Rejected(
                "max players must be at least 1".into(),
            ));
        }
        if request.name.trim().is_empty() {
            return Err(RemoteError::Rejected("lobby name is required".into()));
        }

        let mut dir = lock(&self.directory);
        dir.next_id += 1;
        let created = dir.next_id;
        let id = LobbyId::new(format!("lobby-{created}"));
        let snapshot = LobbySnapshot {
            id: id.clone(),
            code: generate_code(),
            name: request.name,
            host_id: request.player.id.clone(),
            max_players: request.max_players,
            is_private: request.is_private,
            has_password: request.password.is_some(),
            players: vec![request.player],
            metadata: request.metadata,
        };
        dir.lobbies.insert(
            id.clone(),
            StoredLobby {
                snapshot: snapshot.clone(),
                password: request.password,
                created,
                heartbeats: 0,
            },
        );
        tracing::debug!(lobby_id = %id, "memory directory: lobby created");
        Ok(snapshot)
    }

    async fn get_lobby(
        &self,
        lobby_id: &LobbyId,
    ) -> Result<LobbySnapshot, RemoteError> {
        let mut dir = lock(&self.directory);
        Ok(dir.get_mut(lobby_id)?.snapshot.clone())
    }

    async fn update_lobby(
        &self,
        lobby_id: &LobbyId,
        patch: LobbyPatch,
    ) -> Result<LobbySnapshot, RemoteError> {
        let mut dir = lock(&self.directory);
        let lobby = dir.get_mut(lobby_id)?;
        if let Some(host) = patch.host_id {
            if !lobby.snapshot.contains_player(&host) {
                return Err(RemoteError::Rejected(format!(
                    "player {host} is not a member"
                )));
            }
            lobby.snapshot.host_id = host;
        }
        lobby.snapshot.metadata.extend(patch.metadata);
        Ok(lobby.snapshot.clone())
    }

    async fn delete_lobby(&self, lobby_id: &LobbyId) -> Result<(), RemoteError> {
        let mut dir = lock(&self.directory);
        dir.lobbies
            .remove(lobby_id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::LobbyNotFound(lobby_id.to_string()))
    }

    async fn join_by_code(
        &self,
        code: &str,
        request: JoinLobbyRequest,
    ) -> Result<LobbySnapshot, RemoteError> {
        let mut dir = lock(&self.directory);
        let lobby_id = dir
            .find_by_code(code)
            .ok_or_else(|| RemoteError::LobbyNotFound(code.to_string()))?;
        dir.join(&lobby_id, request)
    }

    async fn join_by_id(
        &self,
        lobby_id: &LobbyId,
        request: JoinLobbyRequest,
    ) -> Result<LobbySnapshot, RemoteError> {
        lock(&self.directory).join(lobby_id, request)
    }

    async fn remove_player(
        &self,
        lobby_id: &LobbyId,
        player_id: &PlayerId,
    ) -> Result<(), RemoteError> {
        let mut dir = lock(&self.directory);
        let lobby = dir.get_mut(lobby_id)?;
        let before = lobby.snapshot.players.len();
        lobby.snapshot.players.retain(|p| &p.id != player_id);
        if lobby.snapshot.players.len() == before {
            return Err(RemoteError::Rejected(format!(
                "player {player_id} is not a member"
            )));
        }

        // The directory migrates the host role to the longest-standing
        // member, and drops the lobby when the last member leaves.
        let successor = lobby.snapshot.players.first().map(|p| p.id.clone());
        let host_left = lobby.snapshot.host_id == *player_id;
        if let (Some(next), true) = (&successor, host_left) {
            lobby.snapshot.host_id = next.clone();
        }
        if successor.is_none() {
            dir.lobbies.remove(lobby_id);
        }
        Ok(())
    }

    async fn send_heartbeat(&self, lobby_id: &LobbyId) -> Result<(), RemoteError> {
        let mut dir = lock(&self.directory);
        dir.get_mut(lobby_id)?.heartbeats += 1;
        Ok(())
    }

    async fn query_lobbies(
        &self,
        query: &LobbyQuery,
    ) -> Result<Vec<LobbySnapshot>, RemoteError> {
        let dir = lock(&self.directory);
        let mut rows: Vec<&StoredLobby> = dir
            .lobbies
            .values()
            .filter(|l| !l.snapshot.is_private)
            .filter(|l| {
                query.filters.iter().all(|filter| match filter {
                    QueryFilter::AvailableSlotsGreaterThan(n) => {
                        l.snapshot.available_slots() > *n
                    }
                })
            })
            .collect();

        for order in &query.order {
            match order {
                QueryOrder::CreatedAscending => rows.sort_by_key(|l| l.created),
                QueryOrder::CreatedDescending => {
                    rows.sort_by_key(|l| std::cmp::Reverse(l.created))
                }
            }
        }

        // Listings only carry public metadata; members-only entries stay
        // hidden until the player joins.
        Ok(rows
            .into_iter()
            .map(|l| {
                let mut snapshot = l.snapshot.clone();
                snapshot
                    .metadata
                    .retain(|_, entry| entry.visibility == Visibility::Public);
                snapshot
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// An in-memory relay allocator.
pub struct MemoryRelayService {
    regions: Vec<Region>,
    /// Join code → server data of the allocation it points at.
    codes: Mutex<HashMap<String, RelayServerData>>,
    allocations: Mutex<HashMap<AllocationId, RelayServerData>>,
    next_allocation: AtomicU64,
}

impl MemoryRelayService {
    pub fn new(regions: Vec<Region>) -> Self {
        Self {
            regions,
            codes: Mutex::new(HashMap::new()),
            allocations: Mutex::new(HashMap::new()),
            next_allocation: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryRelayService {
    fn default() -> Self {
        Self::new(vec![Region {
            id: "local".into(),
            description: "In-process relay".into(),
        }])
    }
}

impl RelayService for MemoryRelayService {
    async fn create_allocation(
        &self,
        max_players: u32,
        region: Option<&str>,
    ) -> Result<RelayAllocation, RemoteError> {
        if max_players == 0 {
            return Err(RemoteError::Relay("allocation needs at least one seat".into()));
        }
        if let Some(region) = region {
            if !self.regions.iter().any(|r| r.id == region) {
                return Err(RemoteError::Relay(format!("unknown region {region}")));
            }
        }

        let n = self.next_allocation.fetch_add(1, Ordering::Relaxed);
        let allocation_id = AllocationId(format!("alloc-{n}"));
        let server = RelayServerData {
            allocation_id: allocation_id.clone(),
            endpoint: format!("relay.local:{}", 7000 + n),
            connection_data: Vec::new(),
            key: Vec::new(),
            protocol: "dtls".into(),
        };
        lock(&self.allocations).insert(allocation_id.clone(), server.clone());
        Ok(RelayAllocation {
            allocation_id,
            server,
        })
    }

    async fn join_code(
        &self,
        allocation_id: &AllocationId,
    ) -> Result<String, RemoteError> {
        let server = lock(&self.allocations)
            .get(allocation_id)
            .cloned()
            .ok_or_else(|| {
                RemoteError::Relay(format!("unknown allocation {allocation_id}"))
            })?;
        let code = generate_code();
        lock(&self.codes).insert(code.clone(), server);
        Ok(code)
    }

    async fn join_allocation(
        &self,
        join_code: &str,
    ) -> Result<RelayServerData, RemoteError> {
        lock(&self.codes)
            .get(join_code)
            .cloned()
            .ok_or_else(|| RemoteError::Relay(format!("join code {join_code} not found")))
    }

    async fn list_regions(&self) -> Result<Vec<Region>, RemoteError> {
        Ok(self.regions.clone())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A transport that "connects" instantly and reports through a channel.
///
/// `start_host`/`start_client` emit [`TransportEvent::ClientConnected`]
/// right away, and `shutdown` emits [`TransportEvent::ClientStopped`].
pub struct MemoryTransport {
    client_id: ClientId,
    relay: Mutex<Option<RelayServerData>>,
    running: AtomicBool,
    is_host: AtomicBool,
    shutting_down: AtomicBool,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MemoryTransport {
    /// Creates a transport and the receiver its callbacks arrive on.
    pub fn new(
        client_id: ClientId,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            client_id,
            relay: Mutex::new(None),
            running: AtomicBool::new(false),
            is_host: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            events: tx,
        };
        (transport, rx)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Simulates the remote host vanishing: the transport starts tearing
    /// itself down without a local shutdown request.
    pub fn drop_remote_host(&self) {
        if self.is_running() {
            self.shutting_down.store(true, Ordering::Release);
        }
    }

    fn start(&self, as_host: bool) -> bool {
        if lock(&self.relay).is_none() {
            tracing::warn!("memory transport: start requested without relay data");
            return false;
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.is_host.store(as_host, Ordering::Release);
        let _ = self
            .events
            .send(TransportEvent::ClientConnected { is_host: as_host });
        true
    }
}

impl Transport for MemoryTransport {
    fn configure_relay(&self, server: RelayServerData) {
        *lock(&self.relay) = Some(server);
    }

    fn start_host(&self) -> bool {
        self.start(true)
    }

    fn start_client(&self) -> bool {
        self.start(false)
    }

    fn shutdown(&self) {
        self.shutting_down.store(false, Ordering::Release);
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let was_host = self.is_host.swap(false, Ordering::AcqRel);
        let _ = self.events.send(TransportEvent::ClientStopped { was_host });
    }

    fn is_shutdown_in_progress(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    fn local_client_id(&self) -> ClientId {
        self.client_id
    }
}
