//! Types exchanged with the native light-client synchronizer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters the synchronizer needs to open a session for one wallet.
///
/// The alias is the wallet id, so a session can always be addressed (and force-stopped)
/// by the wallet that owns it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Network the light client connects to (e.g. `mainnet`).
    pub network_name: String,
    /// Lightwalletd host.
    pub default_host: String,
    /// Lightwalletd port.
    pub default_port: u16,
    /// 24-word recovery phrase.
    pub mnemonic_seed: String,
    /// Name the synchronizer registers this session under.
    pub alias: String,
    /// Height below which no wallet funds can exist.
    pub birthday_height: u64,
}

impl SessionConfig {
    /// Endpoint in `host:port` form, for logging.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.default_host, self.default_port)
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("network_name", &self.network_name)
            .field("default_host", &self.default_host)
            .field("default_port", &self.default_port)
            .field("mnemonic_seed", &"<redacted>")
            .field("alias", &self.alias)
            .field("birthday_height", &self.birthday_height)
            .finish()
    }
}

/// Opaque reference to a running synchronizer instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    id: u64,
    alias: String,
}

impl SessionHandle {
    pub fn new(id: u64, alias: impl Into<String>) -> Self {
        Self {
            id,
            alias: alias.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.alias, self.id)
    }
}

/// Inclusive block range for transaction queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub first: u64,
    pub last: u64,
}

/// Balance as reported by the synchronizer. The total arrives string-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub total_zatoshi: String,
}

impl WalletBalance {
    /// Parse the string-encoded total.
    pub fn total(&self) -> Result<i64, SynchronizerError> {
        self.total_zatoshi.trim().parse::<i64>().map_err(|e| {
            SynchronizerError::Other(format!(
                "Invalid balance value '{}': {}",
                self.total_zatoshi, e
            ))
        })
    }
}

/// Addresses derived for the session's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddresses {
    pub primary_address: String,
}

/// A confirmed transaction, exactly as the synchronizer reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "blockTimeInSeconds")]
    pub block_time_seconds: i64,
    pub mined_height: u64,
    /// Signed value; negative means funds left the wallet.
    pub value_zatoshi: i64,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub memos: Vec<String>,
    #[serde(default)]
    pub fee_zatoshi: Option<i64>,
}

impl TransactionRecord {
    pub fn is_outgoing(&self) -> bool {
        self.value_zatoshi < 0
    }
}

/// Payment handed to the synchronizer for signing and broadcast.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub zatoshi: u64,
    pub to_address: String,
    pub memo: String,
    pub mnemonic_seed: String,
}

impl fmt::Debug for SendRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendRequest")
            .field("zatoshi", &self.zatoshi)
            .field("to_address", &self.to_address)
            .field("memo", &self.memo)
            .field("mnemonic_seed", &"<redacted>")
            .finish()
    }
}

/// Result of a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub txid: String,
    #[serde(default)]
    pub raw: Option<String>,
}

/// Status names pushed by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Syncing,
    Synced,
    Stopped,
    Disconnected,
    Other(String),
}

impl SyncStatus {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "SYNCING" => SyncStatus::Syncing,
            "SYNCED" => SyncStatus::Synced,
            "STOPPED" => SyncStatus::Stopped,
            "DISCONNECTED" => SyncStatus::Disconnected,
            _ => SyncStatus::Other(name.to_string()),
        }
    }

    /// Whether wallet data may have changed and should be re-read.
    pub fn refreshes_wallet_data(&self) -> bool {
        matches!(self, SyncStatus::Syncing | SyncStatus::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Syncing => write!(f, "SYNCING"),
            SyncStatus::Synced => write!(f, "SYNCED"),
            SyncStatus::Stopped => write!(f, "STOPPED"),
            SyncStatus::Disconnected => write!(f, "DISCONNECTED"),
            SyncStatus::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Callback events pushed asynchronously by a subscribed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynchronizerEvent {
    /// The synchronizer changed status.
    StatusChanged { name: String },
    /// Progress report. Either field may be absent.
    Update {
        last_downloaded_height: Option<u64>,
        network_block_height: Option<u64>,
    },
    /// Non-fatal error reported by the synchronizer.
    Error { message: String },
}

/// Failures reported by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynchronizerError {
    #[error("Wallet not found: {0}")]
    WalletMissing(String),

    #[error("Another synchronizer is active: {0}")]
    Busy(String),

    #[error("Synchronizer error: {0}")]
    Other(String),
}

impl SynchronizerError {
    /// Classify a free-text error message from a synchronizer that does not report
    /// structured errors.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("wallet not found") || lowered.contains("no wallet") {
            SynchronizerError::WalletMissing(message)
        } else if lowered.contains("another synchronizer") {
            SynchronizerError::Busy(message)
        } else {
            SynchronizerError::Other(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_free_text_errors() {
        assert!(matches!(
            SynchronizerError::from_message("Error: Wallet not found for alias abc"),
            SynchronizerError::WalletMissing(_)
        ));
        assert!(matches!(
            SynchronizerError::from_message("No wallet exists"),
            SynchronizerError::WalletMissing(_)
        ));
        assert!(matches!(
            SynchronizerError::from_message("Another synchronizer is currently active"),
            SynchronizerError::Busy(_)
        ));
        assert!(matches!(
            SynchronizerError::from_message("connection reset by peer"),
            SynchronizerError::Other(_)
        ));
    }

    #[test]
    fn parses_string_encoded_balance() {
        let balance = WalletBalance {
            total_zatoshi: "123456789".to_string(),
        };
        assert_eq!(balance.total().unwrap(), 123_456_789);

        let garbage = WalletBalance {
            total_zatoshi: "12a".to_string(),
        };
        assert!(garbage.total().is_err());
    }

    #[test]
    fn debug_output_hides_the_seed() {
        let config = SessionConfig {
            network_name: "mainnet".to_string(),
            default_host: "lightd1.pirate.black".to_string(),
            default_port: 443,
            mnemonic_seed: "abandon ability able".to_string(),
            alias: "w1".to_string(),
            birthday_height: 10,
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("abandon"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn status_names_are_case_insensitive() {
        assert_eq!(SyncStatus::from_name("synced"), SyncStatus::Synced);
        assert_eq!(SyncStatus::from_name("SYNCING"), SyncStatus::Syncing);
        assert!(SyncStatus::Synced.refreshes_wallet_data());
        assert!(!SyncStatus::from_name("DOWNLOADING").refreshes_wallet_data());
    }

    #[test]
    fn deserializes_transaction_record_with_missing_optionals() {
        let json = r#"{
            "id": "tx1",
            "blockTimeInSeconds": 1700000000,
            "minedHeight": 2000000,
            "valueZatoshi": -5000
        }"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_outgoing());
        assert!(record.memos.is_empty());
        assert_eq!(record.fee_zatoshi, None);
    }
}
