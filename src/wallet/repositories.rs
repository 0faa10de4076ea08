use crate::wallet::StoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistent key-value store backing the wallet registry
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
	async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
	async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// On-disk record for one key
#[derive(serde::Serialize, serde::Deserialize)]
struct StoredEntry {
	key: String,
	value: String,
	updated_at: String,
}

/// File-based implementation of KeyValueStore, one JSON file per key
pub struct FileKeyValueStore {
	data_dir: PathBuf,
}

impl FileKeyValueStore {
	/// Open the store, creating the data directory if needed.
	pub async fn open(data_dir: PathBuf) -> Result<Self, StoreError> {
		tokio::fs::create_dir_all(&data_dir).await?;
		info!("Opened key-value store at {:?}", data_dir);
		Ok(Self { data_dir })
	}

	pub fn data_dir(&self) -> &Path {
		&self.data_dir
	}

	fn entry_filename(&self, key: &str) -> PathBuf {
		self.data_dir
			.join(format!("kv_{}.json", hex::encode(key.as_bytes())))
	}
}

#[async_trait::async_trait]
impl KeyValueStore for FileKeyValueStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let filename = self.entry_filename(key);

		let content = match tokio::fs::read_to_string(&filename).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};

		let entry: StoredEntry = serde_json::from_str(&content)?;
		debug!("Loaded key {} (updated {})", entry.key, entry.updated_at);
		Ok(Some(entry.value))
	}

	async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let entry = StoredEntry {
			key: key.to_string(),
			value: value.to_string(),
			updated_at: chrono::Utc::now().to_rfc3339(),
		};
		let content = serde_json::to_string_pretty(&entry)?;

		// Write next to the target and rename so readers never see a partial file
		let filename = self.entry_filename(key);
		let tmp_filename = filename.with_extension("json.tmp");
		tokio::fs::write(&tmp_filename, content).await?;
		tokio::fs::rename(&tmp_filename, &filename).await?;

		debug!("Saved key {} to {:?}", key, filename);
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), StoreError> {
		match tokio::fs::remove_file(self.entry_filename(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

/// In-memory implementation of KeyValueStore
#[derive(Default)]
pub struct MemoryKeyValueStore {
	entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKeyValueStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.entries.read().await.get(key).cloned())
	}

	async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.entries
			.write()
			.await
			.insert(key.to_string(), value.to_string());
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.entries.write().await.remove(key);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn file_store_round_trips_and_survives_reopen() {
		let temp_dir = TempDir::new().unwrap();
		let store = FileKeyValueStore::open(temp_dir.path().to_path_buf())
			.await
			.unwrap();

		assert_eq!(store.get("@wallets_list").await.unwrap(), None);
		store.set("@wallets_list", "[]").await.unwrap();
		store.set("@wallets_list", "[1]").await.unwrap();

		let reopened = FileKeyValueStore::open(temp_dir.path().to_path_buf())
			.await
			.unwrap();
		assert_eq!(
			reopened.get("@wallets_list").await.unwrap(),
			Some("[1]".to_string())
		);

		reopened.remove("@wallets_list").await.unwrap();
		reopened.remove("@wallets_list").await.unwrap();
		assert_eq!(reopened.get("@wallets_list").await.unwrap(), None);
	}

	#[tokio::test]
	async fn file_store_reports_corrupt_entries() {
		let temp_dir = TempDir::new().unwrap();
		let store = FileKeyValueStore::open(temp_dir.path().to_path_buf())
			.await
			.unwrap();
		tokio::fs::write(store.entry_filename("broken"), "not json")
			.await
			.unwrap();

		assert!(matches!(
			store.get("broken").await,
			Err(StoreError::SerdeError(_))
		));
	}

	#[tokio::test]
	async fn memory_store_overwrites() {
		let store = MemoryKeyValueStore::new();
		store.set("k", "a").await.unwrap();
		store.set("k", "b").await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), Some("b".to_string()));
	}
}
