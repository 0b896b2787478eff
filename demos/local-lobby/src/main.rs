//! A host and a member playing one session against the in-memory services.
//!
//! Run with `RUST_LOG=debug cargo run -p local-lobby` to see every poll.

use std::sync::Arc;
use std::time::Duration;

use lobbyforge::prelude::*;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

type Client = LobbyClient<Arc<MemoryLobbyService>, Arc<MemoryRelayService>, MemoryTransport>;

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn player(
    lobbies: &Arc<MemoryLobbyService>,
    relay: &Arc<MemoryRelayService>,
    id: u64,
    name: &'static str,
) -> (Client, Inbox, mpsc::UnboundedReceiver<TransportEvent>) {
    let (transport, transport_events) = MemoryTransport::new(ClientId::new(id));
    let client = LobbyClientBuilder::new(LocalPlayer::new(PlayerId::new(name), name))
        .tick_rate(30)
        .build(Arc::clone(lobbies), Arc::clone(relay), transport);
    let inbox = Inbox {
        name,
        lobby_events: client.lobby_events(),
        session_events: client.session_events(),
    };
    (client, inbox, transport_events)
}

/// Events a player has not looked at yet.
struct Inbox {
    name: &'static str,
    lobby_events: broadcast::Receiver<LobbyEvent>,
    session_events: broadcast::Receiver<SessionEvent>,
}

impl Inbox {
    /// Prints whatever the player would have seen since the last call.
    fn show(&mut self) {
        let mut shown = Vec::new();
        while let Ok(event) = self.lobby_events.try_recv() {
            shown.extend(Notification::from_lobby(&event));
        }
        while let Ok(event) = self.session_events.try_recv() {
            shown.extend(Notification::from_session(&event));
        }
        for n in shown {
            let json = serde_json::to_string(&n).unwrap_or_default();
            info!(player = self.name, notification = %json);
        }
    }
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

async fn play(
    host: &Client,
    host_inbox: &mut Inbox,
    member: &Client,
    member_inbox: &mut Inbox,
) -> Result<(), LobbyforgeError> {
    let lobby = host
        .create_lobby(CreateLobbyConfig {
            name: Some("Friday Night".into()),
            keep_alive: true,
            ..CreateLobbyConfig::default()
        })
        .await?;
    host_inbox.show();

    let rows = member.browse(BrowseFilter::Newest).await?;
    info!(lobbies = rows.len(), "browsed public lobbies");
    member.join_by_code(&lobby.code, None).await?;
    member_inbox.show();

    host.start_game(Some("local")).await?;
    wait_until(|| member.session().state().is_active()).await;
    host_inbox.show();
    member_inbox.show();

    tokio::time::sleep(Duration::from_secs(1)).await;
    member.leave_game().await;
    host.stop_game().await?;
    wait_until(|| !member.session().transport().is_running()).await;
    host_inbox.show();
    member_inbox.show();

    if let Some(lobby) = host.snapshot() {
        info!(
            lobby = %lobby.display_name(),
            players = lobby.player_count(),
            session_started = lobby.session_started(),
            "lobby ready for another round"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let lobbies = Arc::new(MemoryLobbyService::new());
    let relay = Arc::new(MemoryRelayService::default());
    let (host, mut host_inbox, host_rx) = player(&lobbies, &relay, 1, "Ada");
    let (member, mut member_inbox, member_rx) = player(&lobbies, &relay, 2, "Brook");
    let (stop_tx, stop_rx) = watch::channel(false);

    let script = async {
        let result = play(&host, &mut host_inbox, &member, &mut member_inbox).await;
        let _ = stop_tx.send(true);
        result
    };
    let (host_run, member_run, script) = tokio::join!(
        host.run(host_rx, stopped(stop_rx.clone())),
        member.run(member_rx, stopped(stop_rx)),
        script,
    );
    script?;
    host_run?;
    member_run?;
    info!(remaining = lobbies.lobby_count(), "done");
    Ok(())
}
