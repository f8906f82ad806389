use parking_lot::Mutex;
use std::collections::HashMap;

/// Identifies one generate submission from a given form session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub session: String,
    pub seq: u64,
}

/// Remembers the newest submission per session so late results can be dropped.
#[derive(Default)]
pub struct SubmissionTracker {
    inner: Mutex<TrackerState>,
}

#[derive(Default)]
struct TrackerState {
    next_seq: u64,
    latest: HashMap<String, u64>,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, session: &str) -> Ticket {
        let mut state = self.inner.lock();
        state.next_seq += 1;
        let seq = state.next_seq;
        state.latest.insert(session.to_string(), seq);
        Ticket { session: session.to_string(), seq }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.inner.lock().latest.get(&ticket.session) == Some(&ticket.seq)
    }

    /// Drops the session entry once its latest ticket is done. A newer ticket's entry is left alone.
    pub fn finish(&self, ticket: &Ticket) {
        let mut state = self.inner.lock();
        if state.latest.get(&ticket.session) == Some(&ticket.seq) {
            state.latest.remove(&ticket.session);
        }
    }

    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.inner.lock().latest.len()
    }
}
