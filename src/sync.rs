use tokio::sync::broadcast;

use crate::model::attendance::AttendanceEvent;

/// Fan-out of committed attendance transitions to dashboard consumers.
/// Subscribers read already-committed state; this takes no part in the write
/// path's atomicity. Slow consumers that fall behind the buffer miss events
/// and are expected to catch up through the feed cursor.
#[derive(Clone)]
pub struct StatusSync {
    tx: broadcast::Sender<AttendanceEvent>,
}

impl StatusSync {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: AttendanceEvent) {
        // Send only fails when no dashboard is subscribed.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttendanceEvent> {
        self.tx.subscribe()
    }
}
