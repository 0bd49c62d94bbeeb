//! Subscriber registry.
//!
//! Thread-safe set of subscriber ids, shared between the training loop
//! (which reads snapshots to broadcast) and the relay's listener task
//! (which adds and removes subscribers on command).

use crate::core::SubscriberId;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Set of subscribers receiving broadcasts.
///
/// `add` is idempotent and `remove` of an unknown id is a no-op. Readers
/// get an owned snapshot so no lock is held while sending.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashSet<SubscriberId>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the given subscribers.
    pub fn with_subscribers(ids: impl IntoIterator<Item = SubscriberId>) -> Self {
        Self {
            subscribers: RwLock::new(ids.into_iter().collect()),
        }
    }

    /// Add a subscriber. Returns `true` if it was not present.
    pub async fn add(&self, id: SubscriberId) -> bool {
        self.subscribers.write().await.insert(id)
    }

    /// Remove a subscriber. Returns `true` if it was present.
    pub async fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.write().await.remove(&id)
    }

    /// Remove every subscriber.
    pub async fn clear(&self) {
        self.subscribers.write().await.clear();
    }

    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().await.contains(&id)
    }

    /// Owned copy of the current subscribers.
    pub async fn snapshot(&self) -> HashSet<SubscriberId> {
        self.subscribers.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ids(raw: &[i64]) -> HashSet<SubscriberId> {
        raw.iter().copied().map(SubscriberId).collect()
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let registry = SubscriberRegistry::new();
        assert!(registry.add(SubscriberId(1)).await);
        assert!(!registry.add(SubscriberId(1)).await);
        assert_eq!(registry.snapshot().await, ids(&[1]));
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let registry = SubscriberRegistry::with_subscribers([SubscriberId(1)]);
        assert!(!registry.remove(SubscriberId(2)).await);
        assert_eq!(registry.snapshot().await, ids(&[1]));
    }

    #[tokio::test]
    async fn test_snapshot_tracks_operation_sequence() {
        let registry = SubscriberRegistry::new();
        let ops: [(bool, i64); 8] = [
            (true, 1),
            (true, 2),
            (true, 3),
            (false, 2),
            (true, 2),
            (false, 1),
            (false, 9),
            (true, 3),
        ];

        let mut expected = HashSet::new();
        for (add, raw) in ops {
            let id = SubscriberId(raw);
            if add {
                registry.add(id).await;
                expected.insert(id);
            } else {
                registry.remove(id).await;
                expected.remove(&id);
            }
            assert_eq!(registry.snapshot().await, expected);
        }
        assert_eq!(expected, ids(&[2, 3]));
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = SubscriberRegistry::with_subscribers([SubscriberId(1), SubscriberId(2)]);
        registry.clear().await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = SubscriberRegistry::with_subscribers([SubscriberId(1)]);
        let snap = registry.snapshot().await;
        registry.add(SubscriberId(2)).await;
        assert_eq!(snap.len(), 1);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutation() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut handles = Vec::new();
        for i in 0..16i64 {
            let r = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                r.add(SubscriberId(i)).await;
                if i % 2 == 1 {
                    r.remove(SubscriberId(i)).await;
                }
                r.snapshot().await.len()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let snap = registry.snapshot().await;
        assert_eq!(snap.len(), 8);
        assert!(snap.iter().all(|id| id.0 % 2 == 0));
    }
}
