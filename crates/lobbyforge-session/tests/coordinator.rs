//! Session coordinator tests against the in-memory lobby directory, a
//! scripted relay, and a recording transport.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lobbyforge_lobby::{CreateLobbyConfig, LobbyReconciler, LocalPlayer, ReconcilerConfig};
use lobbyforge_protocol::{
    keys, AllocationId, CreateLobbyRequest, JoinLobbyRequest, LobbyId, LobbyPatch,
    LobbyQuery, LobbySnapshot, PlayerId, RelayAllocation, RelayServerData, Region,
};
use lobbyforge_remote::{
    ClientId, LobbyService, MemoryLobbyService, RelayService, RemoteError,
    Transport, TransportEvent,
};
use lobbyforge_session::{
    SessionConfig, SessionCoordinator, SessionError, SessionEvent, SessionRole,
    SessionState,
};
use lobbyforge_tick::OperationKind;
use tokio::sync::{broadcast, Notify};

// =========================================================================
// Mocks
// =========================================================================

const RELAY_CODE: &str = "ABC123";
const LOCAL_CLIENT: u64 = 7;

#[derive(Default)]
struct ScriptedRelay {
    fail: AtomicBool,
    allocations: AtomicUsize,
    capacities: Mutex<Vec<u32>>,
    regions_requested: Mutex<Vec<Option<String>>>,
    joins: Mutex<Vec<String>>,
}

fn server_data() -> RelayServerData {
    RelayServerData {
        allocation_id: AllocationId("alloc-1".into()),
        endpoint: "relay.test:7000".into(),
        connection_data: Vec::new(),
        key: Vec::new(),
        protocol: "dtls".into(),
    }
}

impl RelayService for ScriptedRelay {
    async fn create_allocation(
        &self,
        max_players: u32,
        region: Option<&str>,
    ) -> Result<RelayAllocation, RemoteError> {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.capacities.lock().unwrap().push(max_players);
        self.regions_requested
            .lock()
            .unwrap()
            .push(region.map(str::to_string));
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::Relay("allocation refused".into()));
        }
        Ok(RelayAllocation {
            allocation_id: AllocationId("alloc-1".into()),
            server: server_data(),
        })
    }

    async fn join_code(&self, _allocation_id: &AllocationId) -> Result<String, RemoteError> {
        Ok(RELAY_CODE.into())
    }

    async fn join_allocation(&self, join_code: &str) -> Result<RelayServerData, RemoteError> {
        self.joins.lock().unwrap().push(join_code.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::Relay("join code not found".into()));
        }
        Ok(server_data())
    }

    async fn list_regions(&self) -> Result<Vec<Region>, RemoteError> {
        Ok(vec![Region {
            id: "eu".into(),
            description: "Europe".into(),
        }])
    }
}

struct RecordingTransport {
    start_ok: AtomicBool,
    starts: AtomicUsize,
    shutdowns: AtomicUsize,
    shutting_down: AtomicBool,
}

impl RecordingTransport {
    fn new() -> Self {
        Self {
            start_ok: AtomicBool::new(true),
            starts: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn start(&self) -> bool {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.start_ok.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn configure_relay(&self, _server: RelayServerData) {}

    fn start_host(&self) -> bool {
        self.start()
    }

    fn start_client(&self) -> bool {
        self.start()
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn is_shutdown_in_progress(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    fn local_client_id(&self) -> ClientId {
        ClientId::new(LOCAL_CLIENT)
    }
}

/// The in-memory directory, except that the next `update_lobby` can be
/// held open until released.
#[derive(Default)]
struct HeldUpdates {
    inner: MemoryLobbyService,
    hold: Mutex<Option<Arc<Notify>>>,
    updates: AtomicUsize,
}

impl HeldUpdates {
    fn hold_next_update(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }
}

impl LobbyService for HeldUpdates {
    async fn create_lobby(&self, request: CreateLobbyRequest) -> Result<LobbySnapshot, RemoteError> {
        self.inner.create_lobby(request).await
    }

    async fn get_lobby(&self, lobby_id: &LobbyId) -> Result<LobbySnapshot, RemoteError> {
        self.inner.get_lobby(lobby_id).await
    }

    async fn update_lobby(
        &self,
        lobby_id: &LobbyId,
        patch: LobbyPatch,
    ) -> Result<LobbySnapshot, RemoteError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().unwrap().take();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        self.inner.update_lobby(lobby_id, patch).await
    }

    async fn delete_lobby(&self, lobby_id: &LobbyId) -> Result<(), RemoteError> {
        self.inner.delete_lobby(lobby_id).await
    }

    async fn join_by_code(
        &self,
        code: &str,
        request: JoinLobbyRequest,
    ) -> Result<LobbySnapshot, RemoteError> {
        self.inner.join_by_code(code, request).await
    }

    async fn join_by_id(
        &self,
        lobby_id: &LobbyId,
        request: JoinLobbyRequest,
    ) -> Result<LobbySnapshot, RemoteError> {
        self.inner.join_by_id(lobby_id, request).await
    }

    async fn remove_player(&self, lobby_id: &LobbyId, player_id: &PlayerId) -> Result<(), RemoteError> {
        self.inner.remove_player(lobby_id, player_id).await
    }

    async fn send_heartbeat(&self, lobby_id: &LobbyId) -> Result<(), RemoteError> {
        self.inner.send_heartbeat(lobby_id).await
    }

    async fn query_lobbies(&self, query: &LobbyQuery) -> Result<Vec<LobbySnapshot>, RemoteError> {
        self.inner.query_lobbies(query).await
    }
}

// =========================================================================
// Fixtures
// =========================================================================

type Lobby = LobbyReconciler<Arc<MemoryLobbyService>>;
type Coordinator =
    SessionCoordinator<Arc<MemoryLobbyService>, Arc<ScriptedRelay>, Arc<RecordingTransport>>;

struct Peer {
    lobby: Arc<Lobby>,
    relay: Arc<ScriptedRelay>,
    transport: Arc<RecordingTransport>,
    session: Coordinator,
    events: broadcast::Receiver<SessionEvent>,
}

fn peer(svc: &Arc<MemoryLobbyService>, name: &str) -> Peer {
    let lobby = Arc::new(LobbyReconciler::new(
        Arc::clone(svc),
        LocalPlayer::new(PlayerId::new(name), name),
        ReconcilerConfig::default(),
    ));
    let relay = Arc::new(ScriptedRelay::default());
    let transport = Arc::new(RecordingTransport::new());
    let session = SessionCoordinator::new(
        Arc::clone(&lobby),
        Arc::clone(&relay),
        Arc::clone(&transport),
        SessionConfig::default(),
    );
    let events = session.subscribe();
    Peer {
        lobby,
        relay,
        transport,
        session,
        events,
    }
}

async fn host_with(svc: &Arc<MemoryLobbyService>, config: CreateLobbyConfig) -> Peer {
    let host = peer(svc, "alice");
    host.lobby.create_lobby(config).await.unwrap();
    host
}

async fn member_of(svc: &Arc<MemoryLobbyService>, host: &Peer) -> Peer {
    let member = peer(svc, "bob");
    let code = host.lobby.snapshot().unwrap().code.clone();
    member.lobby.join_by_code(&code, None).await.unwrap();
    member
}

async fn active_client(svc: &Arc<MemoryLobbyService>) -> (Peer, Peer) {
    let host = host_with(svc, CreateLobbyConfig::default()).await;
    let member = member_of(svc, &host).await;
    member.session.join_as_client(RELAY_CODE).await.unwrap();
    member
        .session
        .handle_transport_event(TransportEvent::ClientConnected { is_host: false })
        .await;
    (host, member)
}

async fn remote(svc: &Arc<MemoryLobbyService>, peer: &Peer) -> LobbySnapshot {
    let id = peer.lobby.lobby_id().unwrap();
    svc.get_lobby(&id).await.unwrap()
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn count(events: &[SessionEvent], wanted: &SessionEvent) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

// =========================================================================
// Host start
// =========================================================================

#[tokio::test]
async fn test_start_as_host_non_host_rejected_without_relay_call() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    let mut member = member_of(&svc, &host).await;

    let err = member.session.start_as_host(None).await.unwrap_err();

    assert!(matches!(err, SessionError::NotHost));
    assert_eq!(member.relay.allocations.load(Ordering::SeqCst), 0);
    assert_eq!(member.session.state(), SessionState::Idle);
    assert!(drain(&mut member.events).is_empty());
}

#[tokio::test]
async fn test_start_as_host_without_lobby_returns_no_lobby() {
    let svc = Arc::new(MemoryLobbyService::new());
    let loner = peer(&svc, "alice");

    let err = loner.session.start_as_host(None).await.unwrap_err();

    assert!(matches!(err, SessionError::NoLobby));
}

#[tokio::test]
async fn test_start_as_host_ready_publishes_session_metadata() {
    let svc = Arc::new(MemoryLobbyService::new());
    let mut host = host_with(&svc, CreateLobbyConfig::default()).await;

    host.session.start_as_host(None).await.unwrap();
    assert_eq!(host.session.state(), SessionState::Starting);
    host.session
        .handle_transport_event(TransportEvent::ClientConnected { is_host: true })
        .await;

    assert_eq!(host.session.state(), SessionState::Active(SessionRole::Host));
    assert_eq!(host.session.relay_code().as_deref(), Some(RELAY_CODE));
    let published = remote(&svc, &host).await;
    assert_eq!(published.relay_code(), Some(RELAY_CODE));
    assert!(published.session_started());
    assert_eq!(published.metadata_value(keys::PLAYER_COUNT), Some("1"));
    assert_eq!(
        drain(&mut host.events),
        vec![
            SessionEvent::StartingGame,
            SessionEvent::GameStarted {
                role: SessionRole::Host,
                target: None,
            },
        ]
    );
}

#[tokio::test]
async fn test_start_as_host_timeout_closes_transport_once() {
    let svc = Arc::new(MemoryLobbyService::new());
    let mut host = host_with(&svc, CreateLobbyConfig::default()).await;
    host.session.start_as_host(None).await.unwrap();

    host.session.tick(Duration::from_secs(34)).await;
    assert_eq!(host.session.state(), SessionState::Starting);
    host.session.tick(Duration::from_secs(2)).await;
    host.session.tick(Duration::from_secs(60)).await;

    assert_eq!(host.session.state(), SessionState::Idle);
    assert!(host.session.server_timed_out());
    assert_eq!(host.transport.shutdowns(), 1);
    let events = drain(&mut host.events);
    assert_eq!(count(&events, &SessionEvent::SessionFailedToStart), 1);
    assert!(!remote(&svc, &host).await.session_started());

    host.session
        .handle_transport_event(TransportEvent::ClientStopped { was_host: true })
        .await;
    assert_eq!(
        drain(&mut host.events),
        vec![SessionEvent::SessionLeft {
            should_change_scene: false,
            target: None,
        }]
    );
}

#[tokio::test]
async fn test_start_as_host_timeout_releases_lock_for_retry() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    host.session.start_as_host(None).await.unwrap();
    host.session.tick(Duration::from_secs(35)).await;
    host.session
        .handle_transport_event(TransportEvent::ClientStopped { was_host: true })
        .await;

    host.session.start_as_host(None).await.unwrap();

    assert_eq!(host.session.state(), SessionState::Starting);
    assert!(!host.session.server_timed_out());
    assert_eq!(host.relay.allocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_start_as_host_transport_refusal_fails_immediately() {
    let svc = Arc::new(MemoryLobbyService::new());
    let mut host = host_with(&svc, CreateLobbyConfig::default()).await;
    host.transport.start_ok.store(false, Ordering::SeqCst);

    let err = host.session.start_as_host(None).await.unwrap_err();
    host.session.tick(Duration::from_secs(60)).await;

    assert!(matches!(err, SessionError::TransportStartFailed));
    assert_eq!(host.session.state(), SessionState::Idle);
    assert_eq!(host.transport.shutdowns(), 0);
    let events = drain(&mut host.events);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], SessionEvent::StartingGame);
    assert!(matches!(events[1], SessionEvent::GameFailedToStart { .. }));

    host.transport.start_ok.store(true, Ordering::SeqCst);
    host.session.start_as_host(None).await.unwrap();
}

#[tokio::test]
async fn test_start_as_host_relay_failure_never_starts_transport() {
    let svc = Arc::new(MemoryLobbyService::new());
    let mut host = host_with(&svc, CreateLobbyConfig::default()).await;
    host.relay.fail.store(true, Ordering::SeqCst);

    let err = host.session.start_as_host(None).await.unwrap_err();

    assert!(matches!(err, SessionError::Remote(RemoteError::Relay(_))));
    assert_eq!(host.transport.starts(), 0);
    assert!(host.session.relay_code().is_none());
    assert!(drain(&mut host.events)
        .iter()
        .any(|e| matches!(e, SessionEvent::GameFailedToStart { .. })));
}

#[tokio::test]
async fn test_start_as_host_second_call_while_starting_is_busy() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    host.session.start_as_host(None).await.unwrap();

    let err = host.session.start_as_host(None).await.unwrap_err();

    assert!(matches!(err, SessionError::Busy(_)));
    assert_eq!(host.relay.allocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_start_as_host_sizes_allocation_from_custom_connections() {
    let svc = Arc::new(MemoryLobbyService::new());
    let plain = host_with(&svc, CreateLobbyConfig::default()).await;
    let custom = peer(&svc, "carol");
    custom
        .lobby
        .create_lobby(CreateLobbyConfig {
            custom_connections: Some(8),
            ..CreateLobbyConfig::default()
        })
        .await
        .unwrap();

    plain.session.start_as_host(None).await.unwrap();
    custom.session.start_as_host(None).await.unwrap();

    assert_eq!(*plain.relay.capacities.lock().unwrap(), vec![4]);
    assert_eq!(*custom.relay.capacities.lock().unwrap(), vec![8]);
}

#[tokio::test]
async fn test_start_as_host_unknown_region_falls_back_to_automatic() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;

    host.session.start_as_host(Some("mars")).await.unwrap();
    host.session.tick(Duration::from_secs(35)).await;
    host.session
        .handle_transport_event(TransportEvent::ClientStopped { was_host: true })
        .await;
    host.session.start_as_host(Some("eu")).await.unwrap();

    assert_eq!(
        *host.relay.regions_requested.lock().unwrap(),
        vec![None, Some("eu".to_string())]
    );
}

#[tokio::test]
async fn test_host_ready_publish_failure_shuts_transport_down() {
    let svc = Arc::new(MemoryLobbyService::new());
    let mut host = host_with(&svc, CreateLobbyConfig::default()).await;
    host.session.start_as_host(None).await.unwrap();
    let id = host.lobby.lobby_id().unwrap();
    svc.delete_lobby(&id).await.unwrap();

    host.session
        .handle_transport_event(TransportEvent::ClientConnected { is_host: true })
        .await;

    assert_eq!(host.session.state(), SessionState::Idle);
    assert_eq!(host.transport.shutdowns(), 1);
    assert!(drain(&mut host.events)
        .iter()
        .any(|e| matches!(e, SessionEvent::GameFailedToStart { .. })));
}

type HeldHost = (
    Arc<HeldUpdates>,
    Arc<LobbyReconciler<Arc<HeldUpdates>>>,
    Arc<RecordingTransport>,
    SessionCoordinator<Arc<HeldUpdates>, Arc<ScriptedRelay>, Arc<RecordingTransport>>,
);

/// Alice hosting a lobby on a directory whose updates can be held open.
async fn held_host(config: CreateLobbyConfig) -> HeldHost {
    let svc = Arc::new(HeldUpdates::default());
    let lobby = Arc::new(LobbyReconciler::new(
        Arc::clone(&svc),
        LocalPlayer::new(PlayerId::new("alice"), "alice"),
        ReconcilerConfig::default(),
    ));
    lobby.create_lobby(config).await.unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let session = SessionCoordinator::new(
        Arc::clone(&lobby),
        Arc::new(ScriptedRelay::default()),
        Arc::clone(&transport),
        SessionConfig::default(),
    );
    (svc, lobby, transport, session)
}

#[tokio::test]
async fn test_host_ready_during_lobby_update_waits_then_publishes() {
    let (svc, lobby, transport, session) = held_host(CreateLobbyConfig::default()).await;
    let mut events = session.subscribe();
    session.start_as_host(None).await.unwrap();
    let release = svc.hold_next_update();

    let (renamed, (), ()) = tokio::join!(
        lobby.update_lobby(LobbyPatch::new().member(keys::LOBBY_NAME, "Renamed")),
        session.handle_transport_event(TransportEvent::ClientConnected { is_host: true }),
        async {
            tokio::task::yield_now().await;
            release.notify_one();
        }
    );

    assert!(renamed.is_ok());
    assert_eq!(session.state(), SessionState::Active(SessionRole::Host));
    assert_eq!(transport.shutdowns(), 0);
    assert_eq!(
        drain(&mut events),
        vec![
            SessionEvent::StartingGame,
            SessionEvent::GameStarted {
                role: SessionRole::Host,
                target: None,
            },
        ]
    );
    let published = svc.get_lobby(&lobby.lobby_id().unwrap()).await.unwrap();
    assert!(published.session_started());
    assert_eq!(published.metadata_value(keys::LOBBY_NAME), Some("Renamed"));
}

// =========================================================================
// Client join
// =========================================================================

#[tokio::test]
async fn test_join_as_client_connected_in_time_cancels_timer() {
    let svc = Arc::new(MemoryLobbyService::new());
    let (_host, mut member) = active_client(&svc).await;

    member.session.tick(Duration::from_secs(60)).await;

    assert_eq!(
        member.session.state(),
        SessionState::Active(SessionRole::Client)
    );
    assert!(!member.session.client_timed_out());
    let events = drain(&mut member.events);
    assert_eq!(count(&events, &SessionEvent::SessionFailedToJoin), 0);
    assert_eq!(
        events,
        vec![
            SessionEvent::JoiningGame,
            SessionEvent::GameStarted {
                role: SessionRole::Client,
                target: None,
            },
        ]
    );
}

#[tokio::test]
async fn test_join_as_client_timeout_leaves_lobby() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    let mut member = member_of(&svc, &host).await;
    member.session.join_as_client(RELAY_CODE).await.unwrap();

    member.session.tick(Duration::from_secs(36)).await;

    assert_eq!(member.session.state(), SessionState::Idle);
    assert!(member.session.client_timed_out());
    assert_eq!(member.transport.shutdowns(), 1);
    assert!(member.lobby.snapshot().is_none());
    assert_eq!(remote(&svc, &host).await.player_count(), 1);
    let events = drain(&mut member.events);
    assert_eq!(count(&events, &SessionEvent::SessionFailedToJoin), 1);
}

#[tokio::test]
async fn test_join_as_client_relay_failure_reports_and_unlocks() {
    let svc = Arc::new(MemoryLobbyService::new());
    let mut member = peer(&svc, "bob");
    member.relay.fail.store(true, Ordering::SeqCst);

    let err = member.session.join_as_client(RELAY_CODE).await.unwrap_err();
    member.relay.fail.store(false, Ordering::SeqCst);
    member.session.join_as_client(RELAY_CODE).await.unwrap();

    assert!(matches!(err, SessionError::Remote(_)));
    assert_eq!(member.session.state(), SessionState::Joining);
    let events = drain(&mut member.events);
    assert!(matches!(events[1], SessionEvent::GameFailedToStart { .. }));
}

#[tokio::test]
async fn test_join_as_client_while_joining_is_busy() {
    let svc = Arc::new(MemoryLobbyService::new());
    let member = peer(&svc, "bob");
    member.session.join_as_client(RELAY_CODE).await.unwrap();

    let err = member.session.join_as_client(RELAY_CODE).await.unwrap_err();

    assert!(matches!(err, SessionError::Busy(_)));
    assert_eq!(member.relay.joins.lock().unwrap().len(), 1);
}

// =========================================================================
// Automatic join on sync
// =========================================================================

async fn publish_session(host: &Peer) {
    host.lobby
        .update_lobby(
            LobbyPatch::new()
                .member(keys::SESSION_RELAY_CODE, RELAY_CODE)
                .public(keys::SESSION_STARTED, "1"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_on_lobby_synced_joins_published_session() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    let member = member_of(&svc, &host).await;
    publish_session(&host).await;

    let snapshot = remote(&svc, &member).await;
    member.session.on_lobby_synced(&snapshot).await;

    assert_eq!(member.session.state(), SessionState::Joining);
    assert_eq!(member.session.join_attempts(), 1);
    assert_eq!(*member.relay.joins.lock().unwrap(), vec![RELAY_CODE.to_string()]);
}

#[tokio::test]
async fn test_on_lobby_synced_self_destructing_lobby_forgotten_after_join() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    let member = member_of(&svc, &host).await;
    publish_session(&host).await;

    member
        .session
        .on_lobby_synced(&remote(&svc, &member).await)
        .await;

    assert_eq!(member.session.state(), SessionState::Joining);
    assert!(member.lobby.snapshot().is_none());
    assert_eq!(remote(&svc, &host).await.player_count(), 2);
}

#[tokio::test]
async fn test_on_lobby_synced_keep_alive_lobby_kept_after_join() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(
        &svc,
        CreateLobbyConfig {
            keep_alive: true,
            ..CreateLobbyConfig::default()
        },
    )
    .await;
    let member = member_of(&svc, &host).await;
    publish_session(&host).await;

    member
        .session
        .on_lobby_synced(&remote(&svc, &member).await)
        .await;

    assert_eq!(member.session.state(), SessionState::Joining);
    assert!(member.lobby.snapshot().is_some());
}

#[tokio::test]
async fn test_on_lobby_synced_over_attempt_cap_leaves_lobby() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    let mut member = member_of(&svc, &host).await;
    member.transport.start_ok.store(false, Ordering::SeqCst);
    publish_session(&host).await;
    let snapshot = remote(&svc, &member).await;

    member.session.on_lobby_synced(&snapshot).await;
    assert_eq!(member.session.join_attempts(), 1);
    assert!(member.lobby.snapshot().is_some());
    member.session.on_lobby_synced(&snapshot).await;

    assert_eq!(member.session.join_attempts(), 0);
    assert!(member.lobby.snapshot().is_none());
    assert_eq!(member.transport.starts(), 1);
    let events = drain(&mut member.events);
    assert_eq!(count(&events, &SessionEvent::SessionFailedToJoin), 1);
}

#[tokio::test]
async fn test_on_lobby_synced_not_started_resets_attempts() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    let member = member_of(&svc, &host).await;
    member.transport.start_ok.store(false, Ordering::SeqCst);
    publish_session(&host).await;
    member
        .session
        .on_lobby_synced(&remote(&svc, &member).await)
        .await;
    assert_eq!(member.session.join_attempts(), 1);

    host.lobby
        .update_lobby(LobbyPatch::new().public(keys::SESSION_STARTED, "0"))
        .await
        .unwrap();
    member
        .session
        .on_lobby_synced(&remote(&svc, &member).await)
        .await;

    assert_eq!(member.session.join_attempts(), 0);
}

#[tokio::test]
async fn test_on_lobby_synced_ignored_by_host() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;
    publish_session(&host).await;

    host.session.on_lobby_synced(&remote(&svc, &host).await).await;

    assert_eq!(host.session.state(), SessionState::Idle);
    assert!(host.relay.joins.lock().unwrap().is_empty());
}

// =========================================================================
// Stop / leave
// =========================================================================

async fn active_host(svc: &Arc<MemoryLobbyService>, keep_alive: bool) -> Peer {
    let host = host_with(
        svc,
        CreateLobbyConfig {
            keep_alive,
            ..CreateLobbyConfig::default()
        },
    )
    .await;
    host.session.start_as_host(None).await.unwrap();
    host.session
        .handle_transport_event(TransportEvent::ClientConnected { is_host: true })
        .await;
    host
}

#[tokio::test]
async fn test_stop_session_never_started_returns_not_started() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = host_with(&svc, CreateLobbyConfig::default()).await;

    let err = host.session.stop_session().await.unwrap_err();

    assert!(matches!(err, SessionError::NotStarted));
    assert_eq!(svc.lobby_count(), 1);
}

#[tokio::test]
async fn test_stop_session_host_destroys_self_destructing_lobby() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = active_host(&svc, false).await;

    host.session.stop_session().await.unwrap();

    assert_eq!(host.session.state(), SessionState::Idle);
    assert_eq!(svc.lobby_count(), 0);
    assert!(host.lobby.snapshot().is_none());
}

#[tokio::test]
async fn test_stop_session_host_keep_alive_clears_published_session() {
    let svc = Arc::new(MemoryLobbyService::new());
    let host = active_host(&svc, true).await;

    host.session.stop_session().await.unwrap();

    let lobby = remote(&svc, &host).await;
    assert!(!lobby.session_started());
    assert_eq!(lobby.relay_code(), None);
    assert_eq!(lobby.metadata_value(keys::SESSION_RELAY_CODE), Some("0"));
    assert!(host.session.relay_code().is_none());
}

#[tokio::test]
async fn test_stop_session_client_only_resets_local_state() {
    let svc = Arc::new(MemoryLobbyService::new());
    let (host, member) = active_client(&svc).await;

    member.session.stop_session().await.unwrap();

    assert_eq!(member.session.state(), SessionState::Idle);
    assert!(member.lobby.snapshot().is_some());
    assert_eq!(remote(&svc, &host).await.player_count(), 2);
}

#[tokio::test]
async fn test_client_stopped_while_active_stops_and_reports_return() {
    let svc = Arc::new(MemoryLobbyService::new());
    let (_host, mut member) = active_client(&svc).await;
    drain(&mut member.events);

    member
        .session
        .handle_transport_event(TransportEvent::ClientStopped { was_host: false })
        .await;

    assert_eq!(member.session.state(), SessionState::Idle);
    assert_eq!(
        drain(&mut member.events),
        vec![
            SessionEvent::LeavingSession,
            SessionEvent::SessionLeft {
                should_change_scene: true,
                target: Some("Lobby".into()),
            },
        ]
    );
}

#[tokio::test]
async fn test_local_client_disconnect_closes_transport() {
    let svc = Arc::new(MemoryLobbyService::new());
    let (_host, member) = active_client(&svc).await;

    member
        .session
        .handle_transport_event(TransportEvent::ClientDisconnected {
            client_id: ClientId::new(9),
        })
        .await;
    assert_eq!(member.transport.shutdowns(), 0);
    member
        .session
        .handle_transport_event(TransportEvent::ClientDisconnected {
            client_id: ClientId::new(LOCAL_CLIENT),
        })
        .await;
    member
        .session
        .handle_transport_event(TransportEvent::ClientDisconnected {
            client_id: ClientId::new(LOCAL_CLIENT),
        })
        .await;

    assert_eq!(member.transport.shutdowns(), 1);
}

#[tokio::test]
async fn test_tick_host_crash_detected_once() {
    let svc = Arc::new(MemoryLobbyService::new());
    let (_host, mut member) = active_client(&svc).await;
    member.transport.shutting_down.store(true, Ordering::SeqCst);

    member.session.tick(Duration::from_millis(50)).await;
    member.session.tick(Duration::from_millis(50)).await;
    assert_eq!(member.transport.shutdowns(), 1);

    drain(&mut member.events);
    member
        .session
        .handle_transport_event(TransportEvent::ClientStopped { was_host: false })
        .await;
    let events = drain(&mut member.events);
    assert_eq!(
        events.last(),
        Some(&SessionEvent::SessionLeft {
            should_change_scene: true,
            target: Some("Lobby".into()),
        })
    );
}

#[tokio::test]
async fn test_leave_session_client_leaves_lobby_then_closes() {
    let svc = Arc::new(MemoryLobbyService::new());
    let (host, mut member) = active_client(&svc).await;
    drain(&mut member.events);

    member.session.leave_session().await;
    member
        .session
        .handle_transport_event(TransportEvent::ClientStopped { was_host: false })
        .await;

    assert_eq!(member.session.state(), SessionState::Idle);
    assert!(member.lobby.snapshot().is_none());
    assert_eq!(remote(&svc, &host).await.player_count(), 1);
    assert_eq!(member.transport.shutdowns(), 1);
    let events = drain(&mut member.events);
    assert_eq!(count(&events, &SessionEvent::LeavingSession), 1);
    assert_eq!(
        events.last(),
        Some(&SessionEvent::SessionLeft {
            should_change_scene: true,
            target: Some("Lobby".into()),
        })
    );
}

#[tokio::test]
async fn test_close_transport_never_started_reports_left_directly() {
    let svc = Arc::new(MemoryLobbyService::new());
    let mut loner = peer(&svc, "alice");

    loner.session.close_transport(false, None);
    loner.session.close_transport(true, Some("Menu".into()));

    assert_eq!(loner.transport.shutdowns(), 0);
    assert_eq!(
        drain(&mut loner.events),
        vec![SessionEvent::SessionLeft {
            should_change_scene: true,
            target: Some("Menu".into()),
        }]
    );
}

#[tokio::test]
async fn test_regions_forwards_relay_listing() {
    let svc = Arc::new(MemoryLobbyService::new());
    let loner = peer(&svc, "alice");

    let regions = loner.session.regions().await.unwrap();

    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].id, "eu");
}

#[tokio::test]
async fn test_stop_session_twice_in_flight_single_unpublish() {
    let (svc, _lobby, _transport, session) = held_host(CreateLobbyConfig {
        keep_alive: true,
        ..CreateLobbyConfig::default()
    })
    .await;
    session.start_as_host(None).await.unwrap();
    session
        .handle_transport_event(TransportEvent::ClientConnected { is_host: true })
        .await;
    let updates_before = svc.updates.load(Ordering::SeqCst);
    let mut events = session.subscribe();
    let release = svc.hold_next_update();

    let (first, second) = tokio::join!(session.stop_session(), async {
        let second = session.stop_session().await;
        release.notify_one();
        second
    });

    assert!(first.is_ok());
    assert!(matches!(
        second,
        Err(SessionError::Busy(OperationKind::SessionStop))
    ));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(svc.updates.load(Ordering::SeqCst), updates_before + 1);
    assert!(drain(&mut events)
        .iter()
        .all(|e| !matches!(e, SessionEvent::SessionFailedToLeave { .. })));
}
