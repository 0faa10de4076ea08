use serde::{Deserialize, Serialize};
use std::fmt;

/// A wallet the user created or imported.
///
/// Identities are immutable once stored; the registry only appends and deletes them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletIdentity {
	pub id: String,
	pub name: String,
	pub mnemonic_seed: String,
	#[serde(default)]
	pub birthday_height: u64,
	/// Creation time in milliseconds since the Unix epoch.
	pub created_at: i64,
}

impl WalletIdentity {
	/// Creation time as a UTC timestamp, if it is in range.
	pub fn created_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
		chrono::DateTime::from_timestamp_millis(self.created_at)
	}
}

impl fmt::Debug for WalletIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WalletIdentity")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("mnemonic_seed", &"<redacted>")
			.field("birthday_height", &self.birthday_height)
			.field("created_at", &self.created_at)
			.finish()
	}
}

/// Key-value store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	SerdeError(#[from] serde_json::Error),
}

/// Wallet registry failures
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
	#[error("Persistence error: {0}")]
	Persistence(#[from] StoreError),

	#[error("Wallet {0} already exists")]
	DuplicateWallet(String),

	#[error("Invalid wallet: {0}")]
	InvalidIdentity(String),
}
