pub mod registry;
pub mod repositories;
pub mod types;

pub use registry::WalletRegistry;
pub use repositories::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use types::*;

use rand::Rng;

/// Number of words in a recovery phrase.
pub const SEED_PHRASE_WORDS: usize = 24;

/// Random 128-bit wallet id, hex encoded.
pub fn generate_wallet_id() -> String {
	let mut id = [0u8; 16];
	rand::rng().fill(&mut id);
	hex::encode(id)
}

/// Check that `phrase` has exactly 24 whitespace-separated words and return it normalized
/// to single spaces.
pub fn validate_seed_phrase(phrase: &str) -> Result<String, WalletError> {
	let words: Vec<&str> = phrase.split_whitespace().collect();
	if words.len() != SEED_PHRASE_WORDS {
		return Err(WalletError::InvalidIdentity(format!(
			"recovery phrase has {} words, expected {}",
			words.len(),
			SEED_PHRASE_WORDS
		)));
	}
	Ok(words.join(" "))
}
