use crate::synchronizer::SynchronizerError;
use crate::transaction::TransactionError;

use std::time::Duration;

/// Session manager errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
	/// The synchronizer has no wallet for this alias/seed. Never retried automatically.
	#[error("Wallet not found: {0}")]
	WalletNotFound(String),

	/// The synchronizer refused a second concurrent session.
	#[error("Another synchronizer is active: {0}")]
	ActiveSessionConflict(String),

	#[error("Synchronizer error: {0}")]
	TransientSyncError(String),

	#[error("Synchronizer call {operation} timed out after {after:?}")]
	Timeout {
		operation: &'static str,
		after: Duration,
	},

	/// A session-dependent operation was called with no active session.
	#[error("Wallet not initialized")]
	NotInitialized,

	#[error("A session start is already in progress")]
	StartInProgress,

	#[error("Invalid session config: {0}")]
	InvalidConfig(String),

	/// The start attempt was superseded by a stop or a newer start.
	#[error("Session start cancelled")]
	Cancelled,

	#[error(transparent)]
	Transaction(#[from] TransactionError),
}

impl From<SynchronizerError> for SessionError {
	fn from(error: SynchronizerError) -> Self {
		match error {
			SynchronizerError::WalletMissing(msg) => SessionError::WalletNotFound(msg),
			SynchronizerError::Busy(msg) => SessionError::ActiveSessionConflict(msg),
			SynchronizerError::Other(msg) => SessionError::TransientSyncError(msg),
		}
	}
}

/// What a call to `start` led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
	/// The session is running and subscribed.
	Active,
	/// The synchronizer does not know this wallet; show wallet selection.
	WalletSelectionRequired,
	/// The attempt failed and another one is scheduled.
	RetryScheduled { after: Duration, reason: String },
}

/// User-facing notices published by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
	/// Non-fatal error reported by the synchronizer.
	SyncError { message: String },
	/// The open wallet is unknown to the synchronizer; go back to wallet selection.
	WalletSelectionRequired { wallet_id: Option<String> },
	/// A start attempt failed and will be retried.
	RetryScheduled { after: Duration, reason: String },
}
