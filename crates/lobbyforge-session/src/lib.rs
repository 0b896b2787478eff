//! Game session coordination for Lobbyforge.
//!
//! Once players have gathered in a lobby, the host starts a game session:
//! it reserves relay capacity, starts the transport as host, and publishes
//! the relay join code through lobby metadata. Members pick the code up on
//! their next poll and connect as clients.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client driver (above)  ← forwards ticks and transport callbacks
//!     ↕
//! Session layer (this crate)  ← relay, transport, timeouts, session metadata
//!     ↕
//! Lobby layer (below)  ← snapshot, metadata updates, leave/destroy
//! ```
//!
//! Every start and join is bounded by a [`TimeoutTimer`](lobbyforge_tick::TimeoutTimer)
//! advanced from [`SessionCoordinator::tick`]; expiry runs compensation
//! (close the transport, leave the lobby) exactly once.

mod config;
mod coordinator;
mod error;
mod events;
mod state;

pub use config::SessionConfig;
pub use coordinator::SessionCoordinator;
pub use error::SessionError;
pub use events::SessionEvent;
pub use state::{SessionRole, SessionState};
