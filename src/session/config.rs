use crate::config::NetworkDefaults;
use crate::session::SessionError;
use crate::synchronizer::SessionConfig;
use crate::wallet::WalletIdentity;

/// Derive the synchronizer configuration for a wallet.
///
/// The alias is the wallet id so every session stays addressable by its wallet.
pub fn build_config(
    identity: &WalletIdentity,
    network: &NetworkDefaults,
) -> Result<SessionConfig, SessionError> {
    let config = SessionConfig {
        network_name: network.network_name.clone(),
        default_host: network.default_host.clone(),
        default_port: network.default_port,
        mnemonic_seed: identity.mnemonic_seed.clone(),
        alias: identity.id.clone(),
        birthday_height: identity.birthday_height,
    };
    validate_config(&config)?;
    Ok(config)
}

/// Reject configs the synchronizer could not address or open.
pub fn validate_config(config: &SessionConfig) -> Result<(), SessionError> {
    if config.alias.trim().is_empty() {
        return Err(SessionError::InvalidConfig("wallet id is empty".to_string()));
    }
    if config.mnemonic_seed.trim().is_empty() {
        return Err(SessionError::InvalidConfig(
            "wallet seed is empty".to_string(),
        ));
    }
    Ok(())
}
