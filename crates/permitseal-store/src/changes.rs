//! Change notifications for the documents collection.
//!
//! Every `DocumentStore` fans change events out through a tokio broadcast
//! channel. The feed is lossy by contract: a lagging subscriber skips ahead
//! and should re-list rather than reconstruct state from events.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::broadcast;

/// Capacity of the per-store broadcast channel.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ChangeKind::Created),
            "updated" => Ok(ChangeKind::Updated),
            "deleted" => Ok(ChangeKind::Deleted),
            other => Err(format!("unknown change kind: {}", other)),
        }
    }
}

/// A single change to the documents collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub id: String,
}

/// Handle on the change feed of a `DocumentStore`.
pub struct Subscription {
    receiver: broadcast::Receiver<DocumentChange>,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<DocumentChange>) -> Self {
        Subscription { receiver }
    }

    /// Wait for the next change event.
    ///
    /// Returns `None` once the store side of the channel is gone. Lagged
    /// deliveries are skipped with a warning; the consumer should re-list.
    pub async fn next(&mut self) -> Option<DocumentChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change subscription lagged, events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_delivers_in_process_changes() {
        let (tx, rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let mut sub = Subscription::new(rx);

        tx.send(DocumentChange {
            kind: ChangeKind::Created,
            id: "PERMIT-001".to_string(),
        })
        .unwrap();

        let change = sub.next().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Created);
        assert_eq!(change.id, "PERMIT-001");
    }

    #[tokio::test]
    async fn test_subscription_ends_when_store_dropped() {
        let (tx, rx) = broadcast::channel::<DocumentChange>(4);
        let mut sub = Subscription::new(rx);
        drop(tx);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_skips_lagged_events() {
        let (tx, rx) = broadcast::channel(2);
        let mut sub = Subscription::new(rx);

        for i in 0..5 {
            tx.send(DocumentChange {
                kind: ChangeKind::Updated,
                id: format!("PERMIT-{:03}", i),
            })
            .unwrap();
        }

        // The oldest events were dropped; the next delivery still succeeds.
        let change = sub.next().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Updated);
    }

    #[test]
    fn test_change_kind_round_trip() {
        for kind in [ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted] {
            assert_eq!(kind.as_str().parse::<ChangeKind>().unwrap(), kind);
        }
    }
}
