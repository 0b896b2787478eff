//! Single-flight operation latches.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Every externally visible operation that is guarded against re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    Join,
    Leave,
    Kick,
    Destroy,
    ChangeHost,
    Update,
    Heartbeat,
    Poll,
    Query,
    Exit,
    SessionStart,
    SessionJoin,
    SessionStop,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Kick => "kick",
            Self::Destroy => "destroy",
            Self::ChangeHost => "change host",
            Self::Update => "update",
            Self::Heartbeat => "heartbeat",
            Self::Poll => "poll",
            Self::Query => "query",
            Self::Exit => "exit",
            Self::SessionStart => "session start",
            Self::SessionJoin => "session join",
            Self::SessionStop => "session stop",
        };
        f.write_str(name)
    }
}

/// A boolean latch allowing at most one in-flight attempt of one kind.
///
/// Most operations finish inside a single async call and use
/// [`try_acquire`](Self::try_acquire), whose guard releases the latch on
/// every exit path including cancellation. Operations that stay in flight
/// across ticks (waiting for a transport callback) use
/// [`try_begin`](Self::try_begin) and [`release`](Self::release) instead.
/// Internal follow-up work that must not be dropped queues with
/// [`acquire`](Self::acquire).
#[derive(Debug)]
pub struct OperationLock {
    kind: OperationKind,
    held: AtomicBool,
    released: Notify,
}

impl OperationLock {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            held: AtomicBool::new(false),
            released: Notify::new(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Sets the latch and returns a guard that clears it on drop, or `None`
    /// if an attempt is already in flight.
    pub fn try_acquire(&self) -> Option<OperationGuard<'_>> {
        self.try_begin().then_some(OperationGuard { lock: self })
    }

    /// Waits for any in-flight attempt to finish, then sets the latch.
    ///
    /// Waiters race fairly for the latch; wrap the call in a timeout when
    /// the holder may never finish.
    pub async fn acquire(&self) -> OperationGuard<'_> {
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            if let Some(guard) = self.try_acquire() {
                return guard;
            }
            released.await;
        }
    }

    /// Sets the latch. Returns `false` if it was already set.
    pub fn try_begin(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clears the latch. Clearing an unset latch is a no-op.
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
        self.released.notify_waiters();
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Clears its [`OperationLock`] when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct OperationGuard<'a> {
    lock: &'a OperationLock,
}

impl OperationGuard<'_> {
    pub fn kind(&self) -> OperationKind {
        self.lock.kind
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
