//! Cached transaction history of the open wallet.

use crate::session::SessionError;
use crate::synchronizer::TransactionRecord;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

/// What readers see of the transaction history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSnapshot {
    /// Newest first.
    pub records: Arc<Vec<TransactionRecord>>,
    pub is_loading: bool,
}

/// Transaction list that is only ever replaced as a whole.
///
/// Refreshes are serialized. A `clear` bumps the epoch so a refresh that was in flight for the
/// previous session cannot publish its result afterwards.
pub struct TransactionCache {
    snapshot: watch::Sender<TransactionSnapshot>,
    refresh_lock: Mutex<()>,
    epoch: AtomicU64,
}

impl Default for TransactionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionCache {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(TransactionSnapshot::default());
        Self {
            snapshot,
            refresh_lock: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> TransactionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Drop every record and invalidate refreshes in flight.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.snapshot.send_replace(TransactionSnapshot::default());
    }

    /// Replace the list with what `fetch` returns.
    ///
    /// The epoch is taken before queueing, so a refresh still waiting for the lock when
    /// `clear` runs never starts. On failure the list is cleared rather than left stale.
    /// Returns the number of records published.
    pub async fn refresh<F>(&self, fetch: F) -> Result<usize, SessionError>
    where
        F: Future<Output = Result<Vec<TransactionRecord>, SessionError>>,
    {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let _guard = self.refresh_lock.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Dropping queued transaction refresh for a closed session");
            return Err(SessionError::Cancelled);
        }
        self.snapshot.send_modify(|s| s.is_loading = true);

        let result = fetch.await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Discarding transaction refresh for a closed session");
            self.snapshot.send_modify(|s| s.is_loading = false);
            return Err(SessionError::Cancelled);
        }

        match result {
            Ok(mut records) => {
                records.sort_by(|a, b| b.block_time_seconds.cmp(&a.block_time_seconds));
                let count = records.len();
                self.snapshot.send_replace(TransactionSnapshot {
                    records: Arc::new(records),
                    is_loading: false,
                });
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to load transactions: {}", e);
                self.snapshot.send_replace(TransactionSnapshot::default());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, time: i64) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            block_time_seconds: time,
            mined_height: 0,
            value_zatoshi: 100,
            to_address: None,
            memos: Vec::new(),
            fee_zatoshi: None,
        }
    }

    fn ids(snapshot: &TransactionSnapshot) -> Vec<&str> {
        snapshot.records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn refresh_sorts_newest_first() {
        let cache = TransactionCache::new();
        let count = cache
            .refresh(async {
                Ok(vec![record("a", 100), record("b", 300), record("c", 200)])
            })
            .await
            .unwrap();

        assert_eq!(count, 3);
        let snapshot = cache.snapshot();
        assert_eq!(ids(&snapshot), vec!["b", "c", "a"]);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn failed_refresh_clears_list() {
        let cache = TransactionCache::new();
        cache.refresh(async { Ok(vec![record("a", 1)]) }).await.unwrap();

        let result = cache
            .refresh(async { Err(SessionError::TransientSyncError("offline".to_string())) })
            .await;
        assert!(result.is_err());
        assert!(cache.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn clear_discards_refresh_in_flight() {
        let cache = Arc::new(TransactionCache::new());
        let (release, wait) = tokio::sync::oneshot::channel::<()>();

        let task = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .refresh(async move {
                        let _ = wait.await;
                        Ok(vec![record("stale", 1)])
                    })
                    .await
            })
        };

        while !cache.snapshot().is_loading {
            tokio::task::yield_now().await;
        }
        cache.clear();
        release.send(()).unwrap();

        assert_eq!(task.await.unwrap(), Err(SessionError::Cancelled));
        assert!(cache.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn clear_drops_refresh_queued_behind_another() {
        let cache = Arc::new(TransactionCache::new());
        let (release, wait) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .refresh(async move {
                        let _ = wait.await;
                        Ok(vec![record("first", 1)])
                    })
                    .await
            })
        };
        while !cache.snapshot().is_loading {
            tokio::task::yield_now().await;
        }

        let (queued_tx, queued_rx) = tokio::sync::oneshot::channel::<()>();
        let fetched = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let second = {
            let cache = cache.clone();
            let fetched = fetched.clone();
            tokio::spawn(async move {
                let _ = queued_tx.send(());
                cache
                    .refresh(async move {
                        fetched.store(true, Ordering::SeqCst);
                        Ok(vec![record("old-session", 2)])
                    })
                    .await
            })
        };
        queued_rx.await.unwrap();

        cache.clear();
        release.send(()).unwrap();

        assert_eq!(first.await.unwrap(), Err(SessionError::Cancelled));
        assert_eq!(second.await.unwrap(), Err(SessionError::Cancelled));
        assert!(!fetched.load(Ordering::SeqCst));
        assert!(cache.snapshot().records.is_empty());
        assert!(!cache.snapshot().is_loading);
    }
}
