//! Store events - best-effort change notifications for UI collaborators
//!
//! Events are sent after the write they describe has committed. Delivery is
//! not transactional: a dropped receiver or a full channel never fails the
//! write.

use crossbeam::channel::{Receiver, Sender, TrySendError};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    /// The direct children of a folder changed
    FolderContentChanged {
        account: String,
        folder_id: i64,
        folder_path: String,
    },
}

/// Sending half handed to the storage manager
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<StoreEvent>,
}

impl EventSender {
    /// Unbounded channel for collaborators that drain events on their own thread
    pub fn unbounded() -> (Self, Receiver<StoreEvent>) {
        let (tx, rx) = crossbeam::channel::unbounded();
        (Self { tx }, rx)
    }

    /// Bounded channel; events are dropped while it is full
    pub fn bounded(capacity: usize) -> (Self, Receiver<StoreEvent>) {
        let (tx, rx) = crossbeam::channel::bounded(capacity);
        (Self { tx }, rx)
    }

    /// Send without blocking, dropping the event when nobody can take it
    pub fn emit(&self, event: StoreEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::debug!("Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::trace!("No event listener connected");
            }
        }
    }
}
