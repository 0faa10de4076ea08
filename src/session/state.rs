//! Observable session state.
//!
//! The session manager is the only writer. Everything else reads `SessionState` snapshots
//! from a `tokio::sync::watch` channel.

use crate::synchronizer::{BlockRange, SessionHandle};
use std::fmt;
use std::time::Duration;

/// Number of blocks past the birthday queried before any height has been synced.
pub const INITIAL_TRANSACTION_WINDOW: u64 = 1000;

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "IDLE",
            SessionPhase::Starting => "STARTING",
            SessionPhase::Active => "ACTIVE",
            SessionPhase::Stopping => "STOPPING",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of everything the session manager knows about the open wallet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Handle of the running session. Set exactly while the phase is `Active`.
    pub active_session: Option<SessionHandle>,
    pub wallet_id: Option<String>,
    pub birthday_height: u64,
    /// Last height the synchronizer reported as downloaded.
    pub synced_height: u64,
    /// Chain tip as reported by the synchronizer.
    pub network_height: u64,
    pub balance_zatoshi: i64,
    pub primary_address: String,
    /// Delay of the start retry currently armed, if any.
    pub pending_retry: Option<Duration>,
}

impl SessionState {
    /// Whether a session is running. Derived from the handle, so the two never disagree.
    pub fn is_initialized(&self) -> bool {
        self.active_session.is_some()
    }

    /// Fraction of the chain scanned, in `[0, 1]`. Zero while the tip is unknown.
    pub fn sync_fraction(&self) -> f64 {
        if self.network_height == 0 {
            return 0.0;
        }
        (self.synced_height as f64 / self.network_height as f64).clamp(0.0, 1.0)
    }

    /// Sync progress as a percentage with two decimals, e.g. `"42.17"`.
    pub fn sync_percentage(&self) -> String {
        format!("{:.2}", self.sync_fraction() * 100.0)
    }

    /// Block range for transaction queries.
    pub fn transaction_range(&self) -> BlockRange {
        let first = self.birthday_height;
        let last = self
            .synced_height
            .max(first.saturating_add(INITIAL_TRANSACTION_WINDOW));
        BlockRange { first, last }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_guards_unknown_tip() {
        let state = SessionState {
            synced_height: 500,
            network_height: 0,
            ..Default::default()
        };
        assert_eq!(state.sync_fraction(), 0.0);
        assert_eq!(state.sync_percentage(), "0.00");
    }

    #[test]
    fn percentage_is_clamped() {
        let mut state = SessionState {
            synced_height: 250,
            network_height: 1000,
            ..Default::default()
        };
        assert_eq!(state.sync_percentage(), "25.00");

        state.synced_height = 1200;
        assert_eq!(state.sync_fraction(), 1.0);
    }

    #[test]
    fn transaction_range_covers_initial_window() {
        let mut state = SessionState {
            birthday_height: 2_000_000,
            ..Default::default()
        };
        assert_eq!(
            state.transaction_range(),
            BlockRange {
                first: 2_000_000,
                last: 2_001_000
            }
        );

        state.synced_height = 2_500_000;
        assert_eq!(state.transaction_range().last, 2_500_000);
    }

    #[test]
    fn initialized_follows_handle() {
        let mut state = SessionState::default();
        assert!(!state.is_initialized());
        state.active_session = Some(SessionHandle::new(1, "w"));
        assert!(state.is_initialized());
    }
}
