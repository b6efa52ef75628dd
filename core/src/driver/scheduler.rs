//! Tick scheduling
//!
//! At most one tick is pending at a time. Each ticket carries the epoch it
//! was issued in; cancelling bumps the epoch, so a ticket issued before a
//! stop can never run after it, even if it is presented again later.

/// Permission to run exactly one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTicket {
    epoch: u64,
    seq: u64,
}

impl TickTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Single-slot cooperative tick scheduler
#[derive(Debug, Default)]
pub struct TickScheduler {
    epoch: u64,
    next_seq: u64,
    pending: Option<TickTicket>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket unless one is already pending.
    pub fn schedule(&mut self) -> Option<TickTicket> {
        if self.pending.is_some() {
            return None;
        }
        let ticket = TickTicket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending = Some(ticket);
        Some(ticket)
    }

    /// Drop the pending ticket and invalidate every ticket issued so far
    pub fn cancel(&mut self) {
        self.pending = None;
        self.epoch += 1;
    }

    /// Redeem `ticket`. Only the currently pending ticket is accepted.
    pub fn accept(&mut self, ticket: TickTicket) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn pending(&self) -> Option<TickTicket> {
        self.pending
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
