//! Timing and single-flight primitives for Lobbyforge.
//!
//! Everything the reconciliation engine needs to stay well-behaved while it
//! talks to slow remote services:
//!
//! - [`TickScheduler`]: the fixed-rate loop that drives polling, heartbeats,
//!   and session timers.
//! - [`TimeoutTimer`] and [`Cadence`]: countdowns advanced by the tick's
//!   delta time instead of by wall-clock sleeps, so tests can step them.
//! - [`OperationLock`]: a per-kind latch that collapses re-entrant calls.
//! - [`ReadinessGate`]: closed while a poll is in flight; mutating calls
//!   wait on it with a bound.
//!
//! # Integration
//!
//! The scheduler sits inside the client driver's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(event) = transport_rx.recv() => { /* forward callback */ }
//!         tick = scheduler.next_tick() => {
//!             client.tick(tick.dt).await;
//!         }
//!     }
//! }
//! ```

mod gate;
mod lock;
mod scheduler;
mod timer;

pub use gate::{GateHold, ReadinessGate};
pub use lock::{OperationGuard, OperationKind, OperationLock};
pub use scheduler::{Tick, TickConfig, TickScheduler};
pub use timer::{Cadence, TimeoutTimer};
