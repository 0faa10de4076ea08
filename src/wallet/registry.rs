//! Persisted list of wallet identities.
//!
//! The registry backs the wallet picker: it lists, adds and deletes wallet identities and
//! remembers which wallet was opened last so a restarted process can clean up the session
//! that wallet left behind.

use crate::wallet::repositories::KeyValueStore;
use crate::wallet::{WalletError, WalletIdentity, generate_wallet_id, validate_seed_phrase};

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Storage key for the JSON array of wallet identities.
pub const WALLETS_KEY: &str = "@wallets_list";
/// Storage key for the id of the wallet opened last.
pub const CURRENT_WALLET_KEY: &str = "@current_wallet_id";

pub struct WalletRegistry {
	store: Arc<dyn KeyValueStore>,
	/// Serializes read-modify-write cycles on the wallet list
	write_lock: Mutex<()>,
}

impl WalletRegistry {
	pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
		Self {
			store,
			write_lock: Mutex::new(()),
		}
	}

	/// All stored wallets, in insertion order.
	///
	/// Never fails: an unreadable store is logged and reported as empty.
	pub async fn list_wallets(&self) -> Vec<WalletIdentity> {
		match self.load_wallets().await {
			Ok(wallets) => wallets,
			Err(e) => {
				error!("Failed to load wallet list: {}", e);
				Vec::new()
			}
		}
	}

	/// Look up one wallet by id.
	pub async fn find_wallet(&self, id: &str) -> Option<WalletIdentity> {
		self.list_wallets().await.into_iter().find(|w| w.id == id)
	}

	/// Append a wallet. Ids must be unique.
	pub async fn add_wallet(&self, identity: WalletIdentity) -> Result<(), WalletError> {
		if identity.id.trim().is_empty() {
			return Err(WalletError::InvalidIdentity("wallet id is empty".to_string()));
		}

		let _guard = self.write_lock.lock().await;
		let mut wallets = self.load_wallets().await?;
		if wallets.iter().any(|w| w.id == identity.id) {
			return Err(WalletError::DuplicateWallet(identity.id));
		}

		info!("Adding wallet {} ({})", identity.name, identity.id);
		wallets.push(identity);
		self.save_wallets(&wallets).await
	}

	/// Create a wallet identity from user input and append it.
	pub async fn create_wallet(
		&self,
		name: &str,
		seed_phrase: &str,
		birthday_height: u64,
	) -> Result<WalletIdentity, WalletError> {
		let name = name.trim();
		if name.is_empty() {
			return Err(WalletError::InvalidIdentity(
				"wallet name is empty".to_string(),
			));
		}
		let mnemonic_seed = validate_seed_phrase(seed_phrase)?;

		let identity = WalletIdentity {
			id: generate_wallet_id(),
			name: name.to_string(),
			mnemonic_seed,
			birthday_height,
			created_at: chrono::Utc::now().timestamp_millis(),
		};
		self.add_wallet(identity.clone()).await?;
		Ok(identity)
	}

	/// Remove a wallet. Returns `false` (and writes nothing) if the id is unknown.
	///
	/// Deleting the wallet recorded as current also forgets that record.
	pub async fn delete_wallet(&self, id: &str) -> Result<bool, WalletError> {
		let _guard = self.write_lock.lock().await;
		let mut wallets = self.load_wallets().await?;
		let before = wallets.len();
		wallets.retain(|w| w.id != id);
		if wallets.len() == before {
			return Ok(false);
		}

		self.save_wallets(&wallets).await?;
		info!("Deleted wallet {}", id);

		if self.current_wallet_id().await?.as_deref() == Some(id) {
			self.store.remove(CURRENT_WALLET_KEY).await?;
		}
		Ok(true)
	}

	/// Record which wallet is open. Idempotent.
	pub async fn set_current_wallet(&self, id: &str) -> Result<(), WalletError> {
		self.store.set(CURRENT_WALLET_KEY, id).await?;
		Ok(())
	}

	pub async fn current_wallet_id(&self) -> Result<Option<String>, WalletError> {
		Ok(self
			.store
			.get(CURRENT_WALLET_KEY)
			.await?
			.filter(|id| !id.is_empty()))
	}

	async fn load_wallets(&self) -> Result<Vec<WalletIdentity>, WalletError> {
		let Some(json) = self.store.get(WALLETS_KEY).await? else {
			return Ok(Vec::new());
		};
		match serde_json::from_str::<Vec<WalletIdentity>>(&json) {
			Ok(wallets) => Ok(wallets),
			Err(e) => {
				warn!("Stored wallet list is unreadable: {}", e);
				Err(WalletError::Persistence(e.into()))
			}
		}
	}

	async fn save_wallets(&self, wallets: &[WalletIdentity]) -> Result<(), WalletError> {
		let json = serde_json::to_string(wallets).map_err(|e| WalletError::Persistence(e.into()))?;
		self.store.set(WALLETS_KEY, &json).await?;
		Ok(())
	}
}
