use pirate_session_sync::config::AppConfig;
use pirate_session_sync::session::build_config;
use pirate_session_sync::wallet::{FileKeyValueStore, WalletRegistry};

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting wallet session service");

	let config = match AppConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	let store = match FileKeyValueStore::open(config.data_dir.clone()).await {
		Ok(store) => store,
		Err(e) => {
			error!("Failed to open wallet store at {:?}: {}", config.data_dir, e);
			return;
		}
	};
	let registry = WalletRegistry::new(Arc::new(store));

	let wallets = registry.list_wallets().await;
	info!("Found {} wallet(s)", wallets.len());

	for wallet in &wallets {
		let created = wallet
			.created_at_utc()
			.map(|t| t.to_rfc3339())
			.unwrap_or_else(|| "unknown".to_string());
		info!(
			"Wallet {} ({}): birthday {}, created {}",
			wallet.name, wallet.id, wallet.birthday_height, created
		);

		match build_config(wallet, &config.network) {
			Ok(session) => info!("  syncs from {} as alias {}", session.endpoint(), session.alias),
			Err(e) => warn!("  cannot be opened: {}", e),
		}
	}

	match registry.current_wallet_id().await {
		Ok(Some(id)) => info!("Current wallet: {}", id),
		Ok(None) => info!("No wallet opened yet"),
		Err(e) => error!("Failed to read current wallet: {}", e),
	}
}
