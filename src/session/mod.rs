//! Wallet Session Module
//!
//! This module owns the lifecycle of the synchronizer session for the open wallet. It is
//! composed of several submodules, each responsible for a specific aspect of the session:
//!
//! - `manager`: The `SessionManager` state machine. Tears down stale sessions, starts the new one, retries failed starts and keeps derived state current.
//! - `config`: Builds and validates the synchronizer config for a wallet.
//! - `events`: Session event types and the handler/dispatcher pair used while a session runs.
//! - `progress_tracker`: Follows and logs sync heights.
//! - `state`: The observable `SessionState` snapshot.
//! - `transaction_cache`: The transaction history, replaced atomically on every refresh.
//!
//! The manager is the only writer of session state. Presentation code observes snapshots and
//! notices and never holds the session handle itself.

/// Synchronizer config derivation
pub mod config;
/// Event system for session callbacks
pub mod events;
/// Session lifecycle state machine
pub mod manager;
/// Sync progress tracking and statistics
pub mod progress_tracker;
/// Observable session state
pub mod state;
/// Cached transaction history
pub mod transaction_cache;
mod types;

pub use config::{build_config, validate_config};
pub use manager::SessionManager;
pub use state::{SessionPhase, SessionState};
pub use transaction_cache::{TransactionCache, TransactionSnapshot};
pub use types::*;
