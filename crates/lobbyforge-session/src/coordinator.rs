//! The session coordinator: relay allocation, transport lifecycle, and the
//! lobby metadata that advertises a running game.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lobbyforge_lobby::LobbyReconciler;
use lobbyforge_protocol::{
    keys, LobbyPatch, LobbySnapshot, Region, NOT_STARTED, STARTED,
};
use lobbyforge_remote::{LobbyService, RelayService, Transport, TransportEvent};
use lobbyforge_tick::{OperationKind, OperationLock, TimeoutTimer};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{SessionConfig, SessionError, SessionEvent, SessionRole, SessionState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a pending transport shutdown should be reported once the transport
/// confirms it stopped.
#[derive(Debug, Clone)]
struct PendingClose {
    should_change_scene: bool,
    target: Option<String>,
}

/// Bookkeeping shared between the intents, the tick, and transport
/// callbacks.
struct Inner {
    host_timer: TimeoutTimer,
    client_timer: TimeoutTimer,
    transport_started: bool,
    server_timed_out: bool,
    client_timed_out: bool,
    relay_code: Option<String>,
    join_attempts: u32,
    closing: bool,
    pending_close: Option<PendingClose>,
    crash_handled: bool,
}

struct Locks {
    start: OperationLock,
    join: OperationLock,
    stop: OperationLock,
}

/// Drives a game session on top of a [`LobbyReconciler`].
///
/// The host allocates relay capacity, starts the transport, and publishes
/// the relay join code into lobby metadata once the transport is ready.
/// Members pick that code up from [`on_lobby_synced`](Self::on_lobby_synced)
/// and connect as clients.
///
/// Start and join are multi-step: they begin in an intent call and finish
/// in a transport callback or a timeout, so their locks span ticks. Feed
/// the coordinator with [`tick`](Self::tick) and
/// [`handle_transport_event`](Self::handle_transport_event).
pub struct SessionCoordinator<L: LobbyService, R: RelayService, T: Transport> {
    lobby: Arc<LobbyReconciler<L>>,
    relay: R,
    transport: T,
    config: SessionConfig,
    state: Mutex<SessionState>,
    inner: Mutex<Inner>,
    locks: Locks,
    events: broadcast::Sender<SessionEvent>,
}

impl<L, R, T> SessionCoordinator<L, R, T>
where
    L: LobbyService,
    R: RelayService,
    T: Transport,
{
    pub fn new(
        lobby: Arc<LobbyReconciler<L>>,
        relay: R,
        transport: T,
        config: SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let inner = Inner {
            host_timer: TimeoutTimer::new(config.host_start_timeout),
            client_timer: TimeoutTimer::new(config.client_join_timeout),
            transport_started: false,
            server_timed_out: false,
            client_timed_out: false,
            relay_code: None,
            join_attempts: 0,
            closing: false,
            pending_close: None,
            crash_handled: false,
        };
        Self {
            lobby,
            relay,
            transport,
            config,
            state: Mutex::new(SessionState::Idle),
            inner: Mutex::new(inner),
            locks: Locks {
                start: OperationLock::new(OperationKind::SessionStart),
                join: OperationLock::new(OperationKind::SessionJoin),
                stop: OperationLock::new(OperationKind::SessionStop),
            },
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn lobby(&self) -> &Arc<LobbyReconciler<L>> {
        &self.lobby
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The relay join code of the current session, if any.
    pub fn relay_code(&self) -> Option<String> {
        lock(&self.inner).relay_code.clone()
    }

    /// `true` if the last host start ran out of time.
    pub fn server_timed_out(&self) -> bool {
        lock(&self.inner).server_timed_out
    }

    /// `true` if the last client join ran out of time.
    pub fn client_timed_out(&self) -> bool {
        lock(&self.inner).client_timed_out
    }

    pub fn join_attempts(&self) -> u32 {
        lock(&self.inner).join_attempts
    }

    /// Lists the regions a host can pin its relay allocation to.
    pub async fn regions(&self) -> Result<Vec<Region>, SessionError> {
        Ok(self.relay.list_regions().await?)
    }

    // -----------------------------------------------------------------------
    // Host start
    // -----------------------------------------------------------------------

    /// Starts a session with the local player as host.
    ///
    /// Returns once the transport is starting. The session becomes active
    /// when the transport reports ready and the relay code is published,
    /// or fails after `host_start_timeout`.
    pub async fn start_as_host(&self, region: Option<&str>) -> Result<(), SessionError> {
        let snapshot = self.lobby.snapshot().ok_or(SessionError::NoLobby)?;
        if !snapshot.is_host(&self.lobby.local_player().id) {
            debug!(lobby_id = %snapshot.id, "only the host can start the game");
            return Err(SessionError::NotHost);
        }
        if !self.locks.start.try_begin() {
            debug!("session start already in flight, dropping call");
            return Err(SessionError::Busy(OperationKind::SessionStart));
        }
        let current = self.state();
        if !current.can_transition_to(SessionState::Starting) {
            self.locks.start.release();
            return Err(SessionError::InvalidState(current));
        }

        self.set_state(SessionState::Starting);
        {
            let mut inner = lock(&self.inner);
            inner.server_timed_out = false;
            inner.crash_handled = false;
        }
        self.emit(SessionEvent::StartingGame);

        match self.allocate_and_host(&snapshot, region).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(lobby_id = %snapshot.id, error = %e, "game failed to start");
                self.emit(SessionEvent::GameFailedToStart { reason: e.to_string() });
                {
                    let mut inner = lock(&self.inner);
                    inner.host_timer.reset();
                    inner.relay_code = None;
                }
                self.set_state(SessionState::Idle);
                self.locks.start.release();
                Err(e)
            }
        }
    }

    async fn allocate_and_host(
        &self,
        snapshot: &LobbySnapshot,
        region: Option<&str>,
    ) -> Result<(), SessionError> {
        let region = self.resolve_region(region).await;
        let capacity = self
            .lobby
            .settings()
            .custom_connections
            .unwrap_or(snapshot.max_players);

        let allocation = self
            .relay
            .create_allocation(capacity, region.as_deref())
            .await?;
        let code = self.relay.join_code(&allocation.allocation_id).await?;
        self.transport.configure_relay(allocation.server);

        {
            let mut inner = lock(&self.inner);
            inner.relay_code = Some(code);
            inner.host_timer.start();
        }
        if !self.transport.start_host() {
            return Err(SessionError::TransportStartFailed);
        }
        lock(&self.inner).transport_started = true;
        info!(lobby_id = %snapshot.id, capacity, "host transport starting");
        Ok(())
    }

    /// Keeps a region hint only if the relay actually offers it.
    async fn resolve_region(&self, hint: Option<&str>) -> Option<String> {
        let hint = hint?;
        match self.relay.list_regions().await {
            Ok(regions) if regions.iter().any(|r| r.id == hint) => Some(hint.to_string()),
            Ok(_) => {
                debug!(region = hint, "unknown region, using automatic selection");
                None
            }
            Err(e) => {
                warn!(region = hint, error = %e, "region listing failed, using automatic selection");
                None
            }
        }
    }

    async fn on_host_ready(&self) {
        if self.state() != SessionState::Starting {
            debug!(state = %self.state(), "host ready outside of a start, ignoring");
            return;
        }
        let code = {
            let mut inner = lock(&self.inner);
            inner.host_timer.reset();
            inner.relay_code.clone()
        };
        let Some(code) = code else {
            self.abort_host_start("no relay code to publish".to_string());
            return;
        };
        let player_count = self.lobby.snapshot().map_or(0, |s| s.player_count());

        let patch = LobbyPatch::new()
            .member(keys::SESSION_RELAY_CODE, code)
            .public(keys::SESSION_STARTED, STARTED)
            .member(keys::PLAYER_COUNT, player_count.to_string());

        match self.lobby.publish(patch).await {
            Ok(snapshot) => {
                self.set_state(SessionState::Active(SessionRole::Host));
                self.locks.start.release();
                info!(lobby_id = %snapshot.id, "game session started as host");
                self.emit(SessionEvent::GameStarted {
                    role: SessionRole::Host,
                    target: self.config.game_target.clone(),
                });
            }
            Err(e) => {
                warn!(error = %e, "failed to publish session, shutting down");
                self.abort_host_start(e.to_string());
            }
        }
    }

    /// Undoes a host start whose transport is already up.
    fn abort_host_start(&self, reason: String) {
        self.close_transport(false, None);
        lock(&self.inner).relay_code = None;
        self.emit(SessionEvent::GameFailedToStart { reason });
        self.set_state(SessionState::Idle);
        self.locks.start.release();
    }

    // -----------------------------------------------------------------------
    // Client join
    // -----------------------------------------------------------------------

    /// Connects to a running session using its relay join code.
    ///
    /// Returns once the client transport is starting. The session becomes
    /// active when the transport reports connected, or the attempt is
    /// abandoned after `client_join_timeout` and the lobby is left.
    pub async fn join_as_client(&self, relay_code: &str) -> Result<(), SessionError> {
        if !self.locks.join.try_begin() {
            debug!("session join already in flight, dropping call");
            return Err(SessionError::Busy(OperationKind::SessionJoin));
        }
        let current = self.state();
        if !current.can_transition_to(SessionState::Joining) {
            self.locks.join.release();
            return Err(SessionError::InvalidState(current));
        }

        self.set_state(SessionState::Joining);
        {
            let mut inner = lock(&self.inner);
            inner.client_timed_out = false;
            inner.crash_handled = false;
        }
        self.emit(SessionEvent::JoiningGame);

        match self.connect_client(relay_code).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(relay_code, error = %e, "failed to join game");
                self.emit(SessionEvent::GameFailedToStart { reason: e.to_string() });
                {
                    let mut inner = lock(&self.inner);
                    inner.client_timer.reset();
                    inner.relay_code = None;
                }
                self.set_state(SessionState::Idle);
                self.locks.join.release();
                Err(e)
            }
        }
    }

    async fn connect_client(&self, relay_code: &str) -> Result<(), SessionError> {
        let server = self.relay.join_allocation(relay_code).await?;
        self.transport.configure_relay(server);
        {
            let mut inner = lock(&self.inner);
            inner.relay_code = Some(relay_code.to_string());
            inner.client_timer.start();
        }
        if !self.transport.start_client() {
            return Err(SessionError::TransportStartFailed);
        }
        lock(&self.inner).transport_started = true;
        info!(relay_code, "client transport starting");
        Ok(())
    }

    fn on_client_connected(&self) {
        if self.state() != SessionState::Joining {
            debug!(state = %self.state(), "client connected outside of a join, ignoring");
            return;
        }
        {
            let mut inner = lock(&self.inner);
            inner.client_timer.reset();
            inner.join_attempts = 0;
        }
        self.set_state(SessionState::Active(SessionRole::Client));
        self.locks.join.release();
        info!("joined game session");
        self.emit(SessionEvent::GameStarted {
            role: SessionRole::Client,
            target: self.config.game_target.clone(),
        });
    }

    /// Reacts to a freshly polled lobby. Members join a session the host
    /// has published, up to `max_join_attempts` times; past that they give
    /// up and leave the lobby. A member that starts joining a lobby which
    /// is destroyed after its session drops the lobby locally.
    pub async fn on_lobby_synced(&self, snapshot: &LobbySnapshot) {
        if snapshot.is_host(&self.lobby.local_player().id) {
            return;
        }
        if !snapshot.session_started() {
            lock(&self.inner).join_attempts = 0;
            return;
        }
        let Some(code) = snapshot.relay_code() else {
            return;
        };
        if !self.state().is_idle() || self.locks.join.is_held() {
            return;
        }

        let exhausted = {
            let mut inner = lock(&self.inner);
            if inner.join_attempts >= self.config.max_join_attempts {
                true
            } else {
                inner.join_attempts += 1;
                false
            }
        };
        if exhausted {
            self.leave_and_end_session().await;
            return;
        }
        match self.join_as_client(code).await {
            // The host destroys this lobby when the session ends; polling it
            // past that point would only report it missing.
            Ok(()) if snapshot.destroy_after_session() => {
                if self.lobby.abandon() {
                    debug!(lobby_id = %snapshot.id, "lobby ends with the session, forgetting it");
                }
            }
            Ok(()) => {}
            Err(e) => debug!(error = %e, "automatic join attempt failed"),
        }
    }

    async fn leave_and_end_session(&self) {
        info!(max_attempts = self.config.max_join_attempts, "out of join attempts, leaving lobby");
        self.close_transport(false, None);
        self.emit(SessionEvent::SessionFailedToJoin);
        lock(&self.inner).join_attempts = 0;
        if let Err(e) = self.lobby.leave().await {
            warn!(error = %e, "failed to leave lobby after giving up on the session");
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advances the start and join timeouts by `dt` and watches for a host
    /// that went away mid-session.
    pub async fn tick(&self, dt: Duration) {
        let (host_expired, client_expired) = {
            let mut inner = lock(&self.inner);
            (inner.host_timer.advance(dt), inner.client_timer.advance(dt))
        };
        if host_expired {
            self.on_host_timeout();
        }
        if client_expired {
            self.on_client_timeout().await;
        }
        self.detect_host_crash();
    }

    fn on_host_timeout(&self) {
        warn!(timeout = ?self.config.host_start_timeout, "host transport never became ready");
        {
            let mut inner = lock(&self.inner);
            inner.server_timed_out = true;
            inner.relay_code = None;
        }
        self.emit(SessionEvent::SessionFailedToStart);
        self.close_transport(false, None);
        self.set_state(SessionState::Idle);
        self.locks.start.release();
    }

    async fn on_client_timeout(&self) {
        warn!(timeout = ?self.config.client_join_timeout, "client never connected");
        {
            let mut inner = lock(&self.inner);
            inner.client_timed_out = true;
            inner.relay_code = None;
        }
        self.emit(SessionEvent::SessionFailedToJoin);
        self.close_transport(false, None);
        self.set_state(SessionState::Idle);
        self.locks.join.release();
        if let Err(e) = self.lobby.leave().await {
            warn!(error = %e, "failed to leave lobby after join timeout");
        }
    }

    /// A client whose transport starts shutting down on its own has lost
    /// the host. Handled once per session.
    fn detect_host_crash(&self) {
        if self.state() != SessionState::Active(SessionRole::Client) || self.lobby.is_host() {
            return;
        }
        if !self.transport.is_shutdown_in_progress() {
            return;
        }
        {
            let mut inner = lock(&self.inner);
            if inner.crash_handled {
                return;
            }
            inner.crash_handled = true;
        }
        warn!("host left the session, disconnecting");
        self.close_transport(true, Some(self.config.return_target.clone()));
    }

    // -----------------------------------------------------------------------
    // Stop / leave
    // -----------------------------------------------------------------------

    /// Ends the running session.
    ///
    /// A member only resets its local state. The host either destroys the
    /// lobby, if it was created to self-destruct after a session, or clears
    /// the published session so the lobby can start another one.
    pub async fn stop_session(&self) -> Result<(), SessionError> {
        let Some(_guard) = self.locks.stop.try_acquire() else {
            debug!("session stop already in flight, dropping call");
            return Err(SessionError::Busy(OperationKind::SessionStop));
        };
        let Some(role) = self.state().role() else {
            debug!(state = %self.state(), "no session to stop");
            return Err(SessionError::NotStarted);
        };

        self.set_state(SessionState::Stopping);
        let result = match role {
            SessionRole::Client => Ok(()),
            SessionRole::Host => self.unpublish().await,
        };
        lock(&self.inner).relay_code = None;
        self.set_state(SessionState::Idle);
        info!(?role, "game session stopped");
        result
    }

    async fn unpublish(&self) -> Result<(), SessionError> {
        if self.lobby.settings().destroy_after_session {
            if let Err(e) = self.lobby.destroy_lobby().await {
                warn!(error = %e, "post-session destroy failed, dropping lobby locally");
                self.lobby.abandon();
            }
            return Ok(());
        }

        let patch = LobbyPatch::new()
            .member(keys::SESSION_RELAY_CODE, NOT_STARTED)
            .public(keys::SESSION_STARTED, NOT_STARTED);
        match self.lobby.publish(patch).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "failed to clear published session");
                self.emit(SessionEvent::SessionFailedToLeave { reason: e.to_string() });
                self.close_transport(true, Some(self.config.return_target.clone()));
                Err(e.into())
            }
        }
    }

    /// Leaves the game and heads back to the return target. The host stops
    /// the session first; a member leaves the lobby first.
    pub async fn leave_session(&self) {
        self.emit(SessionEvent::LeavingSession);
        if !self.lobby.is_host() {
            if let Err(e) = self.lobby.leave().await {
                warn!(error = %e, "failed to leave lobby while leaving session");
            }
        }
        if self.state().is_active() {
            if let Err(e) = self.stop_session().await {
                warn!(error = %e, "failed to stop session while leaving");
            }
        }
        self.close_transport(true, Some(self.config.return_target.clone()));
    }

    /// Shuts the transport down once. The outcome is reported as
    /// [`SessionEvent::SessionLeft`] when the transport confirms it stopped.
    pub fn close_transport(&self, should_change_scene: bool, target: Option<String>) {
        let mut inner = lock(&self.inner);
        if !inner.transport_started {
            drop(inner);
            if should_change_scene {
                self.emit(SessionEvent::SessionLeft { should_change_scene, target });
            }
            return;
        }
        if inner.closing {
            return;
        }
        inner.closing = true;
        inner.pending_close = Some(PendingClose { should_change_scene, target });
        drop(inner);

        info!("shutting down transport");
        self.transport.shutdown();
    }

    // -----------------------------------------------------------------------
    // Transport callbacks
    // -----------------------------------------------------------------------

    /// Feeds a transport callback into the state machine.
    pub async fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::ClientConnected { is_host: true } => self.on_host_ready().await,
            TransportEvent::ClientConnected { is_host: false } => self.on_client_connected(),
            TransportEvent::ClientDisconnected { client_id } => {
                if client_id == self.transport.local_client_id() {
                    info!(%client_id, "local client disconnected");
                    self.close_transport(true, Some(self.config.return_target.clone()));
                } else {
                    debug!(%client_id, "peer disconnected");
                }
            }
            TransportEvent::ClientStopped { was_host } => self.on_transport_stopped(was_host).await,
        }
    }

    async fn on_transport_stopped(&self, was_host: bool) {
        let state = self.state();
        if state.is_active() {
            self.emit(SessionEvent::LeavingSession);
            if let Err(e) = self.stop_session().await {
                warn!(error = %e, "failed to stop session after transport stopped");
            }
        } else if !state.is_idle() {
            {
                let mut inner = lock(&self.inner);
                inner.host_timer.reset();
                inner.client_timer.reset();
                inner.relay_code = None;
            }
            self.set_state(SessionState::Idle);
            self.locks.start.release();
            self.locks.join.release();
        }

        let pending = {
            let mut inner = lock(&self.inner);
            inner.closing = false;
            inner.transport_started = false;
            inner.pending_close.take()
        };
        let PendingClose { should_change_scene, target } = pending.unwrap_or_else(|| PendingClose {
            should_change_scene: true,
            target: Some(self.config.return_target.clone()),
        });
        info!(was_host, should_change_scene, "transport stopped");
        self.emit(SessionEvent::SessionLeft { should_change_scene, target });
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn set_state(&self, next: SessionState) {
        let mut state = lock(&self.state);
        if *state == next {
            return;
        }
        if !state.can_transition_to(next) {
            debug!(from = %*state, to = %next, "unexpected session transition");
        }
        *state = next;
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
