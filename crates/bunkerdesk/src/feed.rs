//! Change feed for live views.
//!
//! Storage publishes a [`ChangeEvent`] after every successful write. Views
//! subscribe and refresh what they show when a relevant table changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::model::string_enum;

/// Events buffered per subscriber before slow receivers start lagging.
pub const DEFAULT_CAPACITY: usize = 256;

string_enum! {
    /// Tables that publish changes.
    pub enum Table {
        /// Contacts.
        Contacts => "contacts",
        /// Suppliers.
        Suppliers => "suppliers",
        /// Supplier ports.
        SupplierPorts => "supplier_ports",
        /// Calls.
        Calls => "calls",
        /// Emails.
        Emails => "emails",
        /// Fuel deals.
        FuelDeals => "fuel_deals",
        /// Daily goals.
        DailyGoals => "daily_goals",
        /// Call schedules and their slots.
        CallSchedules => "call_schedules",
        /// Tasks.
        Tasks => "tasks",
        /// Saved notes.
        SavedNotes => "saved_notes",
        /// Note shares.
        NoteShares => "note_shares",
        /// User preferences.
        UserPreferences => "user_preferences",
    }
}

string_enum! {
    /// Kind of write.
    pub enum ChangeOp {
        /// Row created.
        Insert => "insert",
        /// Row changed.
        Update => "update",
        /// Row removed.
        Delete => "delete",
    }
}

/// One committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Table written.
    pub table: Table,
    /// Kind of write.
    pub op: ChangeOp,
    /// Row id.
    pub id: i64,
    /// When the write was published.
    pub at: DateTime<Utc>,
}

/// Broadcast channel of [`ChangeEvent`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    /// Create a feed buffering `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish a change. Returns how many subscribers received it.
    pub fn publish(&self, table: Table, op: ChangeOp, id: i64) -> usize {
        let event = ChangeEvent {
            table,
            op,
            id,
            at: Utc::now(),
        };
        trace!("publishing {} {} {}", event.op, event.table, event.id);
        // Sending fails only when nobody is listening
        self.sender.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let feed = ChangeFeed::default();
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.publish(Table::Contacts, ChangeOp::Insert, 1), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let feed = ChangeFeed::new(8);
        let mut first = feed.subscribe();
        let mut second = feed.clone().subscribe();

        assert_eq!(feed.publish(Table::Tasks, ChangeOp::Update, 7), 2);

        let event = first.recv().await.unwrap();
        assert_eq!(event.table, Table::Tasks);
        assert_eq!(event.op, ChangeOp::Update);
        assert_eq!(event.id, 7);
        assert_eq!(second.recv().await.unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let feed = ChangeFeed::new(8);
        let _early = feed.subscribe();
        feed.publish(Table::Calls, ChangeOp::Insert, 1);

        let mut late = feed.subscribe();
        feed.publish(Table::Calls, ChangeOp::Insert, 2);
        assert_eq!(late.recv().await.unwrap().id, 2);
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Table::FuelDeals.to_string(), "fuel_deals");
        assert_eq!("note_shares".parse::<Table>().unwrap(), Table::NoteShares);
    }
}
