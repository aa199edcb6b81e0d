//! Realtime change feed.
//!
//! Every write appends a row to the change log inside its own transaction.
//! [`ChangeFeed::pump`] reads rows past the last published sequence number
//! and fans them out to subscribers whose [`ChangeFilter`] matches. Each
//! subscriber gets events in log order on its own channel.

use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::debug;

use crate::db::{Database, DbResult};
use crate::models::{AppointmentStatus, ChangeEvent, ChangeKind, ChangeTable};

/// Selects which events a subscriber receives. Empty filter matches all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: Option<ChangeTable>,
    pub kind: Option<ChangeKind>,
    /// (column, value) that the row payload must carry
    pub column_eq: Option<(String, String)>,
}

impl ChangeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Inserts into the appointments table that are still pending.
    pub fn new_pending_appointments() -> Self {
        Self::all()
            .table(ChangeTable::Appointments)
            .kind(ChangeKind::Insert)
            .column_eq("status", AppointmentStatus::Pending.as_str())
    }

    pub fn table(mut self, table: ChangeTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn column_eq(mut self, column: &str, value: &str) -> Self {
        self.column_eq = Some((column.to_string(), value.to_string()));
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.table.map_or(true, |t| t == event.table)
            && self.kind.map_or(true, |k| k == event.kind)
            && self
                .column_eq
                .as_ref()
                .map_or(true, |(column, value)| event.column(column) == Some(value.as_str()))
    }
}

/// Handle returned by [`ChangeFeed::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receiving end of a subscription.
pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: Receiver<ChangeEvent>,
}

impl Subscription {
    /// Events received so far, without blocking.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }
}

struct Subscriber {
    id: SubscriptionId,
    filter: ChangeFilter,
    sender: Sender<ChangeEvent>,
}

/// Fan-out of change-log events to filtered subscribers.
pub struct ChangeFeed {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    last_seq: i64,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed that treats everything up to `seq` as already published.
    pub fn starting_at(seq: i64) -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
            last_seq: seq,
        }
    }

    /// Sequence number of the last published event.
    pub fn last_seq(&self) -> i64 {
        self.last_seq
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn subscribe(&mut self, filter: ChangeFilter) -> Subscription {
        let (sender, receiver) = channel();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, filter, sender });
        debug!(subscription = id.0, "Feed subscription added");
        Subscription { id, receiver }
    }

    /// Drop a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver one event to matching subscribers. Returns the number reached.
    ///
    /// Subscribers whose receiver was dropped are removed.
    pub fn publish(&mut self, event: &ChangeEvent) -> usize {
        let mut delivered = 0;
        self.subscribers.retain(|s| {
            if !s.filter.matches(event) {
                return true;
            }
            match s.sender.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    debug!(subscription = s.id.0, "Pruning disconnected subscriber");
                    false
                }
            }
        });
        self.last_seq = self.last_seq.max(event.seq);
        delivered
    }

    /// Publish every logged change after the last published one.
    pub fn pump(&mut self, db: &Database) -> DbResult<usize> {
        let events = db.changes_since(self.last_seq)?;
        for event in &events {
            self.publish(event);
        }
        if !events.is_empty() {
            debug!(count = events.len(), last_seq = self.last_seq, "Feed pumped");
        }
        Ok(events.len())
    }

    /// Logged changes after `seq` that match `filter`, for a client catching up.
    pub fn replay_since(
        db: &Database,
        seq: i64,
        filter: &ChangeFilter,
    ) -> DbResult<Vec<ChangeEvent>> {
        Ok(db
            .changes_since(seq)?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect())
    }
}
