//! Progress tracking for a running session.
//!
//! This module provides the `SyncProgressTracker`, which follows the heights reported by the
//! synchronizer and logs sync progress at regular intervals. It is registered as a session
//! event handler next to the session manager's own handler.

use crate::session::SessionError;
use crate::session::events::{SessionEvent, SessionEventHandler};
use tracing::{debug, info};

/// Blocks between two progress log lines.
const LOG_INTERVAL_BLOCKS: u64 = 1000;

/// Service for tracking synchronization progress
#[derive(Debug, Clone, Default)]
pub struct SyncProgressTracker {
    /// Highest downloaded height seen in this session
    synced_height: u64,
    /// Highest chain tip seen in this session
    network_height: u64,
    /// Number of progress reports received
    updates_received: usize,
    /// Height at which progress was last logged
    last_logged_height: u64,
}

impl SyncProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a downloaded height. Heights only move forward.
    pub fn record_downloaded(&mut self, height: u64) {
        self.synced_height = self.synced_height.max(height);
        self.updates_received += 1;
    }

    /// Record the chain tip.
    pub fn record_network_height(&mut self, height: u64) {
        self.network_height = self.network_height.max(height);
        self.updates_received += 1;
    }

    /// Blocks left to scan, if the tip is known.
    pub fn remaining_blocks(&self) -> Option<u64> {
        (self.network_height > 0).then(|| self.network_height.saturating_sub(self.synced_height))
    }

    /// Log progress every 1000 blocks or when forced
    pub fn log_progress(&mut self, force: bool) {
        let blocks_since_last_log = self.synced_height.saturating_sub(self.last_logged_height);
        if !(force || blocks_since_last_log >= LOG_INTERVAL_BLOCKS) {
            return;
        }

        match self.remaining_blocks() {
            Some(remaining) => info!(
                "Sync progress: height {} of {} ({} blocks remaining)",
                self.synced_height, self.network_height, remaining
            ),
            None => info!("Sync progress: height {}", self.synced_height),
        }
        self.last_logged_height = self.synced_height;
    }

    pub fn get_stats(&self) -> SyncStats {
        SyncStats {
            synced_height: self.synced_height,
            network_height: self.network_height,
            updates_received: self.updates_received,
        }
    }
}

#[async_trait::async_trait]
impl SessionEventHandler for SyncProgressTracker {
    async fn handle(&mut self, event: &SessionEvent) -> Result<(), SessionError> {
        match event {
            SessionEvent::DownloadedHeight(height) => {
                self.record_downloaded(*height);
                self.log_progress(false);
            }
            SessionEvent::NetworkHeight(height) => self.record_network_height(*height),
            SessionEvent::StatusChanged(status) => {
                debug!("Status {} at height {}", status, self.synced_height);
                if *status == crate::synchronizer::SyncStatus::Synced {
                    self.log_progress(true);
                }
            }
            SessionEvent::SyncError { .. } => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SyncProgressTracker"
    }
}

/// Statistics about the sync progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub synced_height: u64,
    pub network_height: u64,
    pub updates_received: usize,
}

impl SyncStats {
    /// Get a human-readable summary of the sync statistics
    pub fn summary(&self) -> String {
        format!(
            "Synced to {} of {} after {} progress updates",
            self.synced_height, self.network_height, self.updates_received
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_never_move_backwards() {
        let mut tracker = SyncProgressTracker::new();
        tracker.record_downloaded(500);
        tracker.record_downloaded(400);
        tracker.record_network_height(1000);

        let stats = tracker.get_stats();
        assert_eq!(stats.synced_height, 500);
        assert_eq!(stats.updates_received, 3);
        assert_eq!(tracker.remaining_blocks(), Some(500));
    }

    #[test]
    fn remaining_is_unknown_without_tip() {
        let mut tracker = SyncProgressTracker::new();
        tracker.record_downloaded(10);
        assert_eq!(tracker.remaining_blocks(), None);
    }

    #[tokio::test]
    async fn handles_progress_events() {
        let mut tracker = SyncProgressTracker::new();
        tracker
            .handle(&SessionEvent::DownloadedHeight(1500))
            .await
            .unwrap();
        tracker
            .handle(&SessionEvent::NetworkHeight(3000))
            .await
            .unwrap();
        assert_eq!(
            tracker.get_stats().summary(),
            "Synced to 1500 of 3000 after 2 progress updates"
        );
    }
}
