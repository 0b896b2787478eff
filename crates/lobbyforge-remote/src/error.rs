/// Errors returned by the remote lobby and relay services.
///
/// All of these are transient from the client's point of view: the call
/// failed, nothing was changed locally, and the next natural poll or
/// heartbeat will try again. The `Display` text is what ends up in the
/// failure events shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The lobby no longer exists (deleted, or expired without heartbeats).
    #[error("lobby not found: {0}")]
    LobbyNotFound(String),

    /// The service refused the request: wrong password, lobby full,
    /// player not a member, and similar.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Too many requests in the current window.
    #[error("rate limited, try again shortly")]
    RateLimited,

    /// Network failure or service outage.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The relay service failed to allocate or join.
    #[error("relay error: {0}")]
    Relay(String),
}
