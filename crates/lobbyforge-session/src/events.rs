use crate::SessionRole;

/// Outbound session notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The host began allocating relay capacity and starting the transport.
    StartingGame,
    /// A member began connecting to the host's session.
    JoiningGame,
    /// The session is running. `target` is the configured game scene.
    GameStarted {
        role: SessionRole,
        target: Option<String>,
    },
    /// Starting failed before the transport was up.
    GameFailedToStart { reason: String },
    /// The host transport never reported ready in time.
    SessionFailedToStart,
    /// The client never connected in time, or ran out of join attempts.
    SessionFailedToJoin,
    /// Publishing the end of the session failed.
    SessionFailedToLeave { reason: String },
    LeavingSession,
    /// The transport stopped.
    SessionLeft {
        should_change_scene: bool,
        target: Option<String>,
    },
}
