//! `LobbyClient` builder and driver loop.
//!
//! This is the entry point for an application using Lobbyforge. It ties
//! together the layers: lobby reconciliation → session coordination, and
//! drives both from one fixed-rate tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lobbyforge_lobby::{
    BrowseFilter, CreateLobbyConfig, LobbyBrowser, LobbyEvent, LobbyReconciler,
    LobbySummary, LocalPlayer, ReconcilerConfig,
};
use lobbyforge_protocol::{LobbyId, LobbyPatch, LobbySnapshot, PlayerId, Region};
use lobbyforge_remote::{LobbyService, RelayService, Transport, TransportEvent};
use lobbyforge_session::{SessionConfig, SessionCoordinator, SessionEvent};
use lobbyforge_tick::{TickConfig, TickScheduler};
use tokio::sync::{broadcast, mpsc};

use crate::LobbyforgeError;

/// Builder for configuring a [`LobbyClient`].
///
/// The builder is not generic; the remote collaborators, and with them the
/// client's type parameters, are only fixed by [`build`](Self::build).
///
/// # Example
///
/// ```rust,ignore
/// use lobbyforge::prelude::*;
///
/// let client = LobbyClientBuilder::new(LocalPlayer::new(PlayerId::new("p1"), "Ada"))
///     .tick_rate(20)
///     .build(lobby_service, relay_service, transport);
/// ```
pub struct LobbyClientBuilder {
    player: LocalPlayer,
    reconciler_config: ReconcilerConfig,
    session_config: SessionConfig,
    tick_config: TickConfig,
}

impl LobbyClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new(player: LocalPlayer) -> Self {
        Self {
            player,
            reconciler_config: ReconcilerConfig::default(),
            session_config: SessionConfig::default(),
            tick_config: TickConfig::default(),
        }
    }

    /// Sets the lobby reconciler configuration.
    pub fn reconciler_config(mut self, config: ReconcilerConfig) -> Self {
        self.reconciler_config = config;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the tick configuration.
    pub fn tick_config(mut self, config: TickConfig) -> Self {
        self.tick_config = config;
        self
    }

    /// Sets the tick rate, keeping the rest of the tick configuration.
    pub fn tick_rate(mut self, rate_hz: u32) -> Self {
        self.tick_config.rate_hz = rate_hz;
        self
    }

    /// Wires the layers together around the given remote collaborators.
    ///
    /// The lobby service handle is shared between the reconciler and the
    /// browser, so it must be cheap to clone (an `Arc`, typically).
    pub fn build<L, R, T>(self, lobby_service: L, relay: R, transport: T) -> LobbyClient<L, R, T>
    where
        L: LobbyService + Clone,
        R: RelayService,
        T: Transport,
    {
        let browser = LobbyBrowser::new(lobby_service.clone());
        let lobby = Arc::new(LobbyReconciler::new(
            lobby_service,
            self.player,
            self.reconciler_config,
        ));
        let session = SessionCoordinator::new(
            Arc::clone(&lobby),
            relay,
            transport,
            self.session_config,
        );
        LobbyClient {
            lobby,
            session,
            browser,
            tick_config: self.tick_config.validated(),
        }
    }
}

/// One player's view of lobbies and game sessions.
///
/// Exposes the player's intents (create, join, start, leave, ...) and
/// drives the background work through [`tick`](Self::tick) or the
/// [`run`](Self::run) loop. Share it behind an `Arc` to issue intents from
/// other tasks while `run` is going.
pub struct LobbyClient<L: LobbyService, R: RelayService, T: Transport> {
    lobby: Arc<LobbyReconciler<L>>,
    session: SessionCoordinator<L, R, T>,
    browser: LobbyBrowser<L>,
    tick_config: TickConfig,
}

impl<L, R, T> LobbyClient<L, R, T>
where
    L: LobbyService + Clone,
    R: RelayService,
    T: Transport,
{
    pub fn lobby(&self) -> &Arc<LobbyReconciler<L>> {
        &self.lobby
    }

    pub fn session(&self) -> &SessionCoordinator<L, R, T> {
        &self.session
    }

    pub fn snapshot(&self) -> Option<Arc<LobbySnapshot>> {
        self.lobby.snapshot()
    }

    pub fn lobby_events(&self) -> broadcast::Receiver<LobbyEvent> {
        self.lobby.subscribe()
    }

    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    // -----------------------------------------------------------------------
    // Lobby intents
    // -----------------------------------------------------------------------

    pub async fn create_lobby(
        &self,
        config: CreateLobbyConfig,
    ) -> Result<Arc<LobbySnapshot>, LobbyforgeError> {
        Ok(self.lobby.create_lobby(config).await?)
    }

    pub async fn join_by_code(
        &self,
        code: &str,
        password: Option<&str>,
    ) -> Result<Arc<LobbySnapshot>, LobbyforgeError> {
        Ok(self.lobby.join_by_code(code, password).await?)
    }

    pub async fn join_by_id(
        &self,
        lobby_id: &LobbyId,
        password: Option<&str>,
    ) -> Result<Arc<LobbySnapshot>, LobbyforgeError> {
        Ok(self.lobby.join_by_id(lobby_id, password).await?)
    }

    pub async fn leave_lobby(&self) -> Result<(), LobbyforgeError> {
        Ok(self.lobby.leave().await?)
    }

    pub async fn kick(&self, player_id: &PlayerId) -> Result<(), LobbyforgeError> {
        Ok(self.lobby.kick(player_id).await?)
    }

    pub async fn change_host(&self, player_id: &PlayerId) -> Result<(), LobbyforgeError> {
        Ok(self.lobby.change_host(player_id).await?)
    }

    pub async fn destroy_lobby(&self) -> Result<(), LobbyforgeError> {
        Ok(self.lobby.destroy_lobby().await?)
    }

    pub async fn update_lobby(
        &self,
        patch: LobbyPatch,
    ) -> Result<Arc<LobbySnapshot>, LobbyforgeError> {
        Ok(self.lobby.update_lobby(patch).await?)
    }

    /// Lists joinable public lobbies.
    pub async fn browse(&self, filter: BrowseFilter) -> Result<Vec<LobbySummary>, LobbyforgeError> {
        Ok(self.browser.browse(filter).await?)
    }

    // -----------------------------------------------------------------------
    // Session intents
    // -----------------------------------------------------------------------

    pub async fn regions(&self) -> Result<Vec<Region>, LobbyforgeError> {
        Ok(self.session.regions().await?)
    }

    /// Starts a game with the local player as host.
    pub async fn start_game(&self, region: Option<&str>) -> Result<(), LobbyforgeError> {
        Ok(self.session.start_as_host(region).await?)
    }

    /// Ends the running game.
    pub async fn stop_game(&self) -> Result<(), LobbyforgeError> {
        Ok(self.session.stop_session().await?)
    }

    /// Leaves the running game and heads back to the lobby.
    pub async fn leave_game(&self) {
        self.session.leave_session().await;
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Runs one tick of background work.
    ///
    /// Lobby polls are skipped while a session is active; the host keeps
    /// sending heartbeats so the lobby doesn't expire mid-game.
    pub async fn tick(&self, dt: Duration) {
        if self.session.state().is_active() {
            self.lobby.heartbeat_tick(dt).await;
        } else if let Some(snapshot) = self.lobby.tick(dt).await {
            self.session.on_lobby_synced(&snapshot).await;
        }
        self.session.tick(dt).await;
    }

    /// Forwards a transport callback to the session.
    pub async fn handle_transport_event(&self, event: TransportEvent) {
        self.session.handle_transport_event(event).await;
    }

    /// Runs the tick loop until `shutdown` resolves, then cleans up the
    /// lobby the way an application exit should.
    pub async fn run(
        &self,
        mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), LobbyforgeError> {
        let mut scheduler = TickScheduler::new(self.tick_config.clone());
        tokio::pin!(shutdown);
        tracing::info!(
            player_id = %self.lobby.local_player().id,
            rate_hz = self.tick_config.rate_hz,
            "lobby client running"
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("lobby client shutting down");
                    break;
                }
                Some(event) = transport_events.recv() => {
                    self.session.handle_transport_event(event).await;
                }
                tick = scheduler.next_tick() => {
                    self.tick(tick.dt).await;
                }
            }
        }

        self.lobby.leave_on_exit().await?;
        Ok(())
    }
}
