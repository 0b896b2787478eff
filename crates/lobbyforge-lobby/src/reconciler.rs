//! The lobby reconciler: owns the cached snapshot and every lobby mutation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lobbyforge_protocol::{
    bool_flag, keys, CreateLobbyRequest, JoinLobbyRequest, LobbyId,
    LobbyPatch, LobbySnapshot, Metadata, MetadataEntry, PlayerId, NOT_STARTED,
};
use lobbyforge_remote::{LobbyService, RemoteError};
use lobbyforge_tick::{Cadence, OperationKind, OperationLock, ReadinessGate};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::{
    CreateLobbyConfig, LobbyError, LobbyEvent, LobbySettings, LocalPlayer,
    ReconcilerConfig, MIN_PASSWORD_LEN,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One latch per guarded operation kind.
struct Locks {
    create: OperationLock,
    join: OperationLock,
    leave: OperationLock,
    kick: OperationLock,
    destroy: OperationLock,
    change_host: OperationLock,
    update: OperationLock,
    heartbeat: OperationLock,
    poll: OperationLock,
    exit: OperationLock,
}

impl Locks {
    fn new() -> Self {
        Self {
            create: OperationLock::new(OperationKind::Create),
            join: OperationLock::new(OperationKind::Join),
            leave: OperationLock::new(OperationKind::Leave),
            kick: OperationLock::new(OperationKind::Kick),
            destroy: OperationLock::new(OperationKind::Destroy),
            change_host: OperationLock::new(OperationKind::ChangeHost),
            update: OperationLock::new(OperationKind::Update),
            heartbeat: OperationLock::new(OperationKind::Heartbeat),
            poll: OperationLock::new(OperationKind::Poll),
            exit: OperationLock::new(OperationKind::Exit),
        }
    }
}

/// Acquires `$lock` or returns [`LobbyError::Busy`] from the enclosing
/// function. Collapsed calls publish nothing.
macro_rules! acquire {
    ($lock:expr) => {{
        let op: &OperationLock = &$lock;
        match op.try_acquire() {
            Some(guard) => guard,
            None => {
                let kind = op.kind();
                debug!(operation = %kind, "operation already in flight, dropping call");
                return Err(LobbyError::Busy(kind));
            }
        }
    }};
}

/// Keeps the locally cached lobby consistent with the remote directory.
///
/// All methods take `&self`; share the reconciler behind an `Arc` and call
/// it from as many tasks as needed. Each mutating operation is
/// single-flight per kind: a second call while the first is in flight
/// returns [`LobbyError::Busy`] without touching the service.
///
/// The snapshot is replaced wholesale, never edited. It becomes `None` on
/// leave, destroy, kick detection, or after `max_poll_failures` failed
/// polls in a row.
pub struct LobbyReconciler<L: LobbyService> {
    service: L,
    player: LocalPlayer,
    config: ReconcilerConfig,
    snapshot: Mutex<Option<Arc<LobbySnapshot>>>,
    settings: Mutex<LobbySettings>,
    poll_failures: AtomicU32,
    heartbeat: Mutex<Cadence>,
    poll: Mutex<Cadence>,
    locks: Locks,
    gate: ReadinessGate,
    events: broadcast::Sender<LobbyEvent>,
}

impl<L: LobbyService> LobbyReconciler<L> {
    pub fn new(service: L, player: LocalPlayer, config: ReconcilerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            service,
            player,
            heartbeat: Mutex::new(Cadence::fixed(config.heartbeat_interval)),
            poll: Mutex::new(Cadence::jittered(
                config.poll_interval_min,
                config.poll_interval_max,
            )),
            config,
            snapshot: Mutex::new(None),
            settings: Mutex::new(LobbySettings::default()),
            poll_failures: AtomicU32::new(0),
            locks: Locks::new(),
            gate: ReadinessGate::default(),
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<LobbyEvent> {
        self.events.subscribe()
    }

    /// The cached lobby, if the local player is in one.
    pub fn snapshot(&self) -> Option<Arc<LobbySnapshot>> {
        lock(&self.snapshot).clone()
    }

    pub fn lobby_id(&self) -> Option<LobbyId> {
        lock(&self.snapshot).as_ref().map(|s| s.id.clone())
    }

    /// Returns `true` if the cached snapshot names the local player as host.
    pub fn is_host(&self) -> bool {
        lock(&self.snapshot)
            .as_ref()
            .is_some_and(|s| s.is_host(&self.player.id))
    }

    pub fn settings(&self) -> LobbySettings {
        *lock(&self.settings)
    }

    pub fn local_player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// `false` while a poll is in flight.
    pub fn can_interact(&self) -> bool {
        self.gate.is_open()
    }

    /// Consecutive failed polls so far.
    pub fn poll_failures(&self) -> u32 {
        self.poll_failures.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Create / join
    // -----------------------------------------------------------------------

    /// Creates a lobby with the local player as host.
    pub async fn create_lobby(
        &self,
        config: CreateLobbyConfig,
    ) -> Result<Arc<LobbySnapshot>, LobbyError> {
        let _guard = acquire!(self.locks.create);

        let password = match normalize_password(config.password.as_deref()) {
            Ok(password) => password,
            Err(e) => {
                self.emit(LobbyEvent::CreateFailed { reason: e.to_string() });
                return Err(e);
            }
        };
        let name = config
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}'s Lobby", self.player.display_name));
        let settings = LobbySettings::from(&config);

        let mut metadata = Metadata::new();
        metadata.insert(keys::LOBBY_NAME.into(), MetadataEntry::member(name.as_str()));
        metadata.insert(
            keys::DESTROY_AFTER_SESSION.into(),
            MetadataEntry::public(bool_flag(settings.destroy_after_session)),
        );
        metadata.insert(keys::SESSION_RELAY_CODE.into(), MetadataEntry::member(NOT_STARTED));
        metadata.insert(keys::SESSION_STARTED.into(), MetadataEntry::public(NOT_STARTED));
        metadata.insert(keys::PLAYER_COUNT.into(), MetadataEntry::member("0"));

        let request = CreateLobbyRequest {
            name,
            max_players: config.max_players.max(1),
            is_private: config.is_private,
            password,
            player: self.player.to_lobby_player(),
            metadata,
        };

        self.emit(LobbyEvent::Creating);
        match self.service.create_lobby(request).await {
            Ok(snapshot) => {
                *lock(&self.settings) = settings;
                let snapshot = self.install(snapshot);
                lock(&self.heartbeat).trigger();
                info!(lobby_id = %snapshot.id, code = %snapshot.code, "lobby created");
                self.emit(LobbyEvent::Created(Arc::clone(&snapshot)));
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "lobby creation failed");
                self.emit(LobbyEvent::CreateFailed { reason: e.to_string() });
                Err(e.into())
            }
        }
    }

    /// Joins a lobby by its short code.
    pub async fn join_by_code(
        &self,
        code: &str,
        password: Option<&str>,
    ) -> Result<Arc<LobbySnapshot>, LobbyError> {
        let _guard = acquire!(self.locks.join);

        let code = code.trim();
        if code.is_empty() {
            let e = LobbyError::InvalidCode;
            self.emit(LobbyEvent::JoinFailed { reason: e.to_string() });
            return Err(e);
        }

        self.emit(LobbyEvent::Joining);
        let result = self
            .service
            .join_by_code(code, self.join_request(password))
            .await;
        self.finish_join(result).await
    }

    /// Joins a lobby by id, as picked from a lobby listing.
    pub async fn join_by_id(
        &self,
        lobby_id: &LobbyId,
        password: Option<&str>,
    ) -> Result<Arc<LobbySnapshot>, LobbyError> {
        let _guard = acquire!(self.locks.join);

        self.emit(LobbyEvent::Joining);
        let result = self
            .service
            .join_by_id(lobby_id, self.join_request(password))
            .await;
        self.finish_join(result).await
    }

    fn join_request(&self, password: Option<&str>) -> JoinLobbyRequest {
        JoinLobbyRequest {
            password: password
                .filter(|p| p.len() >= MIN_PASSWORD_LEN)
                .map(str::to_string),
            player: self.player.to_lobby_player(),
        }
    }

    async fn finish_join(
        &self,
        result: Result<LobbySnapshot, RemoteError>,
    ) -> Result<Arc<LobbySnapshot>, LobbyError> {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "join failed");
                self.emit(LobbyEvent::JoinFailed { reason: e.to_string() });
                return Err(e.into());
            }
        };

        if snapshot.is_closed_session() {
            info!(lobby_id = %snapshot.id, "lobby session already running, rolling back join");
            if let Err(e) = self
                .service
                .remove_player(&snapshot.id, &self.player.id)
                .await
            {
                warn!(lobby_id = %snapshot.id, error = %e, "failed to leave after rejected join");
            }
            self.emit(LobbyEvent::UnableToJoin);
            return Err(LobbyError::UnableToJoin);
        }

        *lock(&self.settings) = LobbySettings::default();
        let snapshot = self.install(snapshot);
        info!(lobby_id = %snapshot.id, players = snapshot.player_count(), "joined lobby");
        self.emit(LobbyEvent::Joined(Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    // -----------------------------------------------------------------------
    // Leave / kick / destroy
    // -----------------------------------------------------------------------

    /// Leaves the current lobby.
    ///
    /// A host that created the lobby with `destroy_with_host` deletes it
    /// instead. Leaving with no lobby succeeds immediately.
    pub async fn leave(&self) -> Result<(), LobbyError> {
        let _guard = acquire!(self.locks.leave);

        self.emit(LobbyEvent::Leaving);
        if !self.wait_ready().await {
            let e = LobbyError::Timeout(OperationKind::Leave);
            warn!("leave timed out waiting for poll");
            self.emit(LobbyEvent::LeaveFailed { reason: e.to_string() });
            return Err(e);
        }

        let Some(snapshot) = self.snapshot() else {
            self.emit(LobbyEvent::Left);
            return Ok(());
        };

        let result = if snapshot.is_host(&self.player.id) && self.settings().destroy_with_host {
            self.destroy_lobby().await
        } else {
            self.service
                .remove_player(&snapshot.id, &self.player.id)
                .await
                .map(|()| {
                    self.clear_if_current(&snapshot.id);
                })
                .map_err(LobbyError::from)
        };

        match result {
            Ok(()) => {
                info!(lobby_id = %snapshot.id, "left lobby");
                self.emit(LobbyEvent::Left);
                Ok(())
            }
            Err(e) => {
                warn!(lobby_id = %snapshot.id, error = %e, "leave failed");
                self.emit(LobbyEvent::LeaveFailed { reason: e.to_string() });
                Err(e)
            }
        }
    }

    /// Removes another member. Host only.
    pub async fn kick(&self, player_id: &PlayerId) -> Result<(), LobbyError> {
        let snapshot = match self.require_host() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.emit(LobbyEvent::KickFailed {
                    player_id: player_id.clone(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        if !snapshot.contains_player(player_id) {
            let e = LobbyError::UnknownPlayer(player_id.clone());
            self.emit(LobbyEvent::KickFailed {
                player_id: player_id.clone(),
                reason: e.to_string(),
            });
            return Err(e);
        }

        let _guard = acquire!(self.locks.kick);

        self.emit(LobbyEvent::KickingPlayer { player_id: player_id.clone() });
        if !self.wait_ready().await {
            let e = LobbyError::Timeout(OperationKind::Kick);
            warn!(%player_id, "kick timed out waiting for poll");
            self.emit(LobbyEvent::KickFailed {
                player_id: player_id.clone(),
                reason: e.to_string(),
            });
            return Err(e);
        }

        match self.service.remove_player(&snapshot.id, player_id).await {
            Ok(()) => {
                info!(lobby_id = %snapshot.id, %player_id, "player kicked");
                self.emit(LobbyEvent::PlayerKicked { player_id: player_id.clone() });
                Ok(())
            }
            Err(e) => {
                warn!(lobby_id = %snapshot.id, %player_id, error = %e, "kick failed");
                self.emit(LobbyEvent::KickFailed {
                    player_id: player_id.clone(),
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Destroys the lobby.
    ///
    /// Only the host can delete the remote lobby. For anyone else, and when
    /// there is no lobby, this just forgets the cached snapshot.
    pub async fn destroy_lobby(&self) -> Result<(), LobbyError> {
        let _guard = acquire!(self.locks.destroy);

        let snapshot = match self.snapshot() {
            Some(snapshot) if snapshot.is_host(&self.player.id) => snapshot,
            _ => {
                self.abandon();
                self.emit(LobbyEvent::Destroyed);
                return Ok(());
            }
        };

        self.emit(LobbyEvent::Destroying);
        match self.service.delete_lobby(&snapshot.id).await {
            Ok(()) => {
                self.clear_if_current(&snapshot.id);
                info!(lobby_id = %snapshot.id, "lobby destroyed");
                self.emit(LobbyEvent::Destroyed);
                Ok(())
            }
            Err(e) => {
                warn!(lobby_id = %snapshot.id, error = %e, "lobby destroy failed");
                self.emit(LobbyEvent::DestroyFailed { reason: e.to_string() });
                Err(e.into())
            }
        }
    }

    /// Drops the cached lobby without telling the directory. Returns `true`
    /// if there was one.
    pub fn abandon(&self) -> bool {
        let had_lobby = lock(&self.snapshot).take().is_some();
        *lock(&self.settings) = LobbySettings::default();
        self.poll_failures.store(0, Ordering::Release);
        had_lobby
    }

    /// Best-effort cleanup on application exit: the host deletes the lobby,
    /// a member removes itself. Publishes no events.
    pub async fn leave_on_exit(&self) -> Result<(), LobbyError> {
        let _guard = acquire!(self.locks.exit);

        let Some(snapshot) = self.snapshot() else {
            return Ok(());
        };
        let result = if snapshot.is_host(&self.player.id) {
            self.service.delete_lobby(&snapshot.id).await
        } else {
            self.service
                .remove_player(&snapshot.id, &self.player.id)
                .await
        };
        self.abandon();
        result.map_err(|e| {
            warn!(lobby_id = %snapshot.id, error = %e, "exit cleanup failed");
            e.into()
        })
    }

    // -----------------------------------------------------------------------
    // Host updates
    // -----------------------------------------------------------------------

    /// Applies a host change and/or metadata upsert. Host only.
    ///
    /// Single-flight like every intent: a second call while one is in
    /// flight returns [`LobbyError::Busy`].
    pub async fn update_lobby(
        &self,
        patch: LobbyPatch,
    ) -> Result<Arc<LobbySnapshot>, LobbyError> {
        let snapshot = match self.require_host() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.emit(LobbyEvent::UpdateFailed { reason: e.to_string() });
                return Err(e);
            }
        };
        let _guard = acquire!(self.locks.update);
        self.apply_update(&snapshot, patch).await
    }

    /// Applies `patch` once any update already in flight has finished.
    ///
    /// Used for writes the engine itself must not lose: session metadata
    /// and host hand-over. Gives up with [`LobbyError::Timeout`] after
    /// `interaction_timeout`.
    pub async fn publish(&self, patch: LobbyPatch) -> Result<Arc<LobbySnapshot>, LobbyError> {
        let queued = tokio::time::timeout(
            self.config.interaction_timeout,
            self.locks.update.acquire(),
        )
        .await;
        let Ok(_guard) = queued else {
            let e = LobbyError::Timeout(OperationKind::Update);
            warn!("publish timed out behind another update");
            self.emit(LobbyEvent::UpdateFailed { reason: e.to_string() });
            return Err(e);
        };
        let snapshot = match self.require_host() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.emit(LobbyEvent::UpdateFailed { reason: e.to_string() });
                return Err(e);
            }
        };
        self.apply_update(&snapshot, patch).await
    }

    async fn apply_update(
        &self,
        snapshot: &LobbySnapshot,
        patch: LobbyPatch,
    ) -> Result<Arc<LobbySnapshot>, LobbyError> {
        self.emit(LobbyEvent::Updating);
        match self.service.update_lobby(&snapshot.id, patch).await {
            Ok(updated) => {
                let updated = self.store_if_current(updated);
                debug!(lobby_id = %updated.id, "lobby updated");
                self.emit(LobbyEvent::Updated(Arc::clone(&updated)));
                Ok(updated)
            }
            Err(e) => {
                warn!(lobby_id = %snapshot.id, error = %e, "lobby update failed");
                self.emit(LobbyEvent::UpdateFailed { reason: e.to_string() });
                Err(e.into())
            }
        }
    }

    /// Hands the host role to another member. Host only.
    pub async fn change_host(&self, new_host: &PlayerId) -> Result<(), LobbyError> {
        if let Err(e) = self.require_host() {
            self.emit(LobbyEvent::ChangeHostFailed { reason: e.to_string() });
            return Err(e);
        }
        let _guard = acquire!(self.locks.change_host);

        self.emit(LobbyEvent::ChangingHost { player_id: new_host.clone() });
        if !self.wait_ready().await {
            let e = LobbyError::Timeout(OperationKind::ChangeHost);
            warn!(%new_host, "host change timed out waiting for poll");
            self.emit(LobbyEvent::ChangeHostFailed { reason: e.to_string() });
            return Err(e);
        }

        // The poll we waited on may have changed the member list.
        let is_member = self
            .snapshot()
            .is_some_and(|s| s.contains_player(new_host));
        if !is_member {
            let e = LobbyError::UnknownPlayer(new_host.clone());
            self.emit(LobbyEvent::ChangeHostFailed { reason: e.to_string() });
            return Err(e);
        }

        match self.publish(LobbyPatch::new().host(new_host.clone())).await {
            Ok(_) => {
                info!(%new_host, "host changed");
                self.emit(LobbyEvent::HostChanged { host_id: new_host.clone() });
                Ok(())
            }
            Err(e) => {
                self.emit(LobbyEvent::ChangeHostFailed { reason: e.to_string() });
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Background tick
    // -----------------------------------------------------------------------

    /// Advances the heartbeat and poll cadences, running whichever is due.
    ///
    /// Returns the fresh snapshot if a poll synced one.
    pub async fn tick(&self, dt: Duration) -> Option<Arc<LobbySnapshot>> {
        let ((), synced) = tokio::join!(self.heartbeat_tick(dt), self.poll_tick(dt));
        synced
    }

    /// Sends the host keep-alive when due. Failures are reported and
    /// otherwise ignored; the lobby stays cached.
    pub async fn heartbeat_tick(&self, dt: Duration) {
        let due = lock(&self.heartbeat).tick(dt);
        if !due {
            return;
        }
        let Some(snapshot) = self.snapshot() else {
            return;
        };
        if !snapshot.is_host(&self.player.id) {
            return;
        }
        let Some(_guard) = self.locks.heartbeat.try_acquire() else {
            return;
        };

        match self.service.send_heartbeat(&snapshot.id).await {
            Ok(()) => trace!(lobby_id = %snapshot.id, "heartbeat sent"),
            Err(e) => {
                warn!(lobby_id = %snapshot.id, error = %e, "heartbeat failed");
                self.emit(LobbyEvent::HeartbeatFailed { reason: e.to_string() });
            }
        }
    }

    /// Refreshes the cached snapshot when due.
    ///
    /// Detects kicks, escalates repeated failures to
    /// [`LobbyEvent::LobbyNotFound`], and drops results for a lobby the
    /// player left while the poll was in flight.
    pub async fn poll_tick(&self, dt: Duration) -> Option<Arc<LobbySnapshot>> {
        let due = lock(&self.poll).tick(dt);
        if !due {
            return None;
        }
        let snapshot = self.snapshot()?;
        if !snapshot.contains_player(&self.player.id) {
            self.handle_kicked(&snapshot.id);
            return None;
        }
        let Some(_guard) = self.locks.poll.try_acquire() else {
            debug!("poll already in flight");
            return None;
        };

        let hold = self.gate.hold();
        let result = self.service.get_lobby(&snapshot.id).await;
        drop(hold);

        match result {
            Ok(fresh) => {
                self.poll_failures.store(0, Ordering::Release);
                if self.lobby_id().as_ref() != Some(&snapshot.id) {
                    debug!(lobby_id = %snapshot.id, "discarding poll for a lobby no longer held");
                    return None;
                }
                if !fresh.contains_player(&self.player.id) {
                    self.handle_kicked(&snapshot.id);
                    return None;
                }
                let fresh = self.store_if_current(fresh);
                trace!(lobby_id = %fresh.id, players = fresh.player_count(), "lobby synced");
                self.emit(LobbyEvent::SnapshotSynced(Arc::clone(&fresh)));
                Some(fresh)
            }
            Err(e) => {
                let failures = self.poll_failures.fetch_add(1, Ordering::AcqRel) + 1;
                warn!(lobby_id = %snapshot.id, failures, error = %e, "lobby poll failed");
                if failures >= self.config.max_poll_failures && self.clear_if_current(&snapshot.id) {
                    warn!(lobby_id = %snapshot.id, "lobby unreachable, dropping it");
                    self.emit(LobbyEvent::LobbyNotFound);
                }
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn emit(&self, event: LobbyEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn wait_ready(&self) -> bool {
        self.gate.wait_ready(self.config.interaction_timeout).await
    }

    fn require_host(&self) -> Result<Arc<LobbySnapshot>, LobbyError> {
        let snapshot = self.snapshot().ok_or(LobbyError::NoLobby)?;
        if !snapshot.is_host(&self.player.id) {
            return Err(LobbyError::NotHost);
        }
        Ok(snapshot)
    }

    /// Installs the snapshot of a freshly created or joined lobby.
    fn install(&self, snapshot: LobbySnapshot) -> Arc<LobbySnapshot> {
        let snapshot = Arc::new(snapshot);
        *lock(&self.snapshot) = Some(Arc::clone(&snapshot));
        self.poll_failures.store(0, Ordering::Release);
        lock(&self.poll).trigger();
        self.gate.open();
        snapshot
    }

    /// Replaces the cached snapshot only if it still refers to the same
    /// lobby.
    fn store_if_current(&self, snapshot: LobbySnapshot) -> Arc<LobbySnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut current = lock(&self.snapshot);
        if current.as_ref().is_some_and(|c| c.id == snapshot.id) {
            *current = Some(Arc::clone(&snapshot));
        }
        snapshot
    }

    /// Clears the cached snapshot if it refers to `lobby_id`. Returns `true`
    /// if it did.
    fn clear_if_current(&self, lobby_id: &LobbyId) -> bool {
        let mut current = lock(&self.snapshot);
        if current.as_ref().is_some_and(|c| &c.id == lobby_id) {
            *current = None;
            drop(current);
            *lock(&self.settings) = LobbySettings::default();
            self.poll_failures.store(0, Ordering::Release);
            return true;
        }
        false
    }

    fn handle_kicked(&self, lobby_id: &LobbyId) {
        if self.clear_if_current(lobby_id) {
            info!(%lobby_id, "removed from lobby by host");
            self.emit(LobbyEvent::Kicked);
        }
    }
}

/// Blank passwords mean "no password"; anything else must meet the minimum.
fn normalize_password(password: Option<&str>) -> Result<Option<String>, LobbyError> {
    match password.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) if p.len() < MIN_PASSWORD_LEN => Err(LobbyError::InvalidPassword),
        Some(p) => Ok(Some(p.to_string())),
    }
}
