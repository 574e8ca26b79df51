use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DecisionKey {
    snapshot: u64,
    subject: String,
    object: String,
    action: String,
}

#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    allowed: bool,
    expires_at: Instant,
}

/// Time-bound cache of permission decisions.
///
/// Keys carry the evaluator's [`snapshot_id`](crate::Evaluator::snapshot_id),
/// so a policy rebuild makes every older entry unreachable and evaluators
/// from different stores never share entries. Ownership outcomes are never
/// stored here.
///
/// ```
/// use gatehouse_authz::DecisionCache;
/// use std::time::Duration;
///
/// let cache = DecisionCache::new(Duration::from_secs(30));
/// let rt = tokio::runtime::Runtime::new().expect("rt");
/// rt.block_on(async {
///     cache.put(1, "alice", "doc", "read", true).await;
///     assert_eq!(cache.get(1, "alice", "doc", "read").await, Some(true));
///     assert_eq!(cache.get(2, "alice", "doc", "read").await, None);
/// });
/// ```
#[derive(Debug)]
pub struct DecisionCache {
    // RwLock allows concurrent readers while inserts take exclusive access.
    inner: RwLock<HashMap<DecisionKey, CachedDecision>>,
    ttl: Duration,
    max_entries: Option<usize>,
}

impl DecisionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
            max_entries: None,
        }
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::new(ttl)
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(
        &self,
        snapshot: u64,
        subject: &str,
        object: &str,
        action: &str,
    ) -> Option<bool> {
        let key = DecisionKey {
            snapshot,
            subject: subject.to_string(),
            object: object.to_string(),
            action: action.to_string(),
        };
        let guard = self.inner.read().await;
        guard
            .get(&key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.allowed)
    }

    pub async fn put(
        &self,
        snapshot: u64,
        subject: &str,
        object: &str,
        action: &str,
        allowed: bool,
    ) {
        let now = Instant::now();
        let key = DecisionKey {
            snapshot,
            subject: subject.to_string(),
            object: object.to_string(),
            action: action.to_string(),
        };
        let mut guard = self.inner.write().await;
        // Entries from older snapshots can never be read again.
        guard.retain(|existing, entry| existing.snapshot >= snapshot && entry.expires_at > now);
        guard.insert(
            key.clone(),
            CachedDecision {
                allowed,
                expires_at: now + self.ttl,
            },
        );
        if let Some(max_entries) = self.max_entries
            && guard.len() > max_entries
        {
            // Evict the entry closest to expiry, never the one just written.
            if let Some(oldest) = guard
                .iter()
                .filter(|(existing, _)| **existing != key)
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone())
            {
                guard.remove(&oldest);
            }
        }
    }

    /// Drop every cached decision.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
