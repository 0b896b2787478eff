//! Session state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of the transport this peer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionRole {
    Host,
    Client,
}

/// The local lifecycle state of a game session.
///
/// ```text
/// Idle ──start_as_host──→ Starting ──host ready──→ Active(Host) ──stop──→ Stopping ──→ Idle
/// Idle ──join_as_client─→ Joining ──connected───→ Active(Client) ──stop──→ Stopping ──→ Idle
/// ```
///
/// Any non-idle state may fall back to `Idle` directly: a timeout, a failed
/// relay call, or the transport stopping underneath the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    /// Host transport started, waiting for it to report ready.
    Starting,
    /// Client transport started, waiting to connect.
    Joining,
    Active(SessionRole),
    Stopping,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// The role once the session is active.
    pub fn role(&self) -> Option<SessionRole> {
        match self {
            Self::Active(role) => Some(*role),
            _ => None,
        }
    }

    /// Returns `true` if moving to `target` is a valid transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Idle, Self::Starting | Self::Joining) => true,
            (Self::Starting, Self::Active(SessionRole::Host)) => true,
            (Self::Joining, Self::Active(SessionRole::Client)) => true,
            (Self::Active(_), Self::Stopping) => true,
            (Self::Idle, Self::Idle) => false,
            (_, Self::Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Starting => write!(f, "Starting"),
            Self::Joining => write!(f, "Joining"),
            Self::Active(SessionRole::Host) => write!(f, "Active(Host)"),
            Self::Active(SessionRole::Client) => write!(f, "Active(Client)"),
            Self::Stopping => write!(f, "Stopping"),
        }
    }
}
