//! Readiness gate for lobby interactions.

use std::time::Duration;

use tokio::sync::watch;

/// A shared open/closed flag that tasks can wait on.
///
/// The reconciler closes the gate while a poll is in flight. Operations
/// that must not race a poll (leave, kick, change host) call
/// [`wait_ready`](Self::wait_ready) with a bound before proceeding.
#[derive(Debug)]
pub struct ReadinessGate {
    tx: watch::Sender<bool>,
}

impl ReadinessGate {
    /// Creates a gate in the given state.
    pub fn new(open: bool) -> Self {
        let (tx, _rx) = watch::channel(open);
        Self { tx }
    }

    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    pub fn close(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Closes the gate until the returned hold is dropped.
    pub fn hold(&self) -> GateHold<'_> {
        self.close();
        GateHold { gate: self }
    }

    /// Waits until the gate is open. Returns `false` if `timeout` elapsed
    /// first.
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|open| *open))
            .await
            .is_ok_and(|res| res.is_ok())
    }
}

/// Reopens its [`ReadinessGate`] when dropped, including when the task
/// holding it is cancelled mid-poll.
#[must_use = "the gate reopens as soon as the hold is dropped"]
#[derive(Debug)]
pub struct GateHold<'a> {
    gate: &'a ReadinessGate,
}

impl Drop for GateHold<'_> {
    fn drop(&mut self) {
        self.gate.open();
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(true)
    }
}
