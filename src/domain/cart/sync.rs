//! The pending remote write queue. It holds at most one scheduled write; scheduling a new
//! one cancels the previous, which gives trailing-edge debounce.

use strum_macros::Display;
use tokio_util::sync::CancellationToken;

/// Where the orchestrator is in its load/sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SyncPhase {
    /// Nothing loaded yet for the current identity.
    Uninitialized,
    Idle,
    /// A remote write is in flight.
    Syncing,
}

#[derive(Debug, Default)]
pub struct SyncQueue {
    pending: Option<PendingSync>,
    next_ticket: u64,
}

#[derive(Debug)]
struct PendingSync {
    ticket: u64,
    token: CancellationToken,
}

impl SyncQueue {
    /// Replaces any pending write with a new one. The returned ticket identifies it when
    /// its timer fires; the token is cancelled if it is replaced first.
    pub fn schedule(&mut self) -> (u64, CancellationToken) {
        self.cancel();
        self.next_ticket += 1;
        let token = CancellationToken::new();
        self.pending = Some(PendingSync {
            ticket: self.next_ticket,
            token: token.clone(),
        });
        (self.next_ticket, token)
    }

    /// Returns true if a pending write was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Claims the pending write if `ticket` is still the current one.
    pub fn claim(&mut self, ticket: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.ticket == ticket && !pending.token.is_cancelled() => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
