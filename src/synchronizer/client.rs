//! Interface to the native light-client synchronizer.
//!
//! The synchronizer owns chain scanning, note decryption, balance computation and transaction
//! signing. This crate only drives its lifecycle and reads its results, so everything it needs
//! from the native layer is expressed by the [`Synchronizer`] trait below. All methods are async
//! and may suspend for as long as the native layer takes; callers impose their own timeouts.

use super::types::*;
use futures_util::Stream;
use std::pin::Pin;

/// Stream of callback events for one subscribed session.
pub type SynchronizerEventStream = Pin<Box<dyn Stream<Item = SynchronizerEvent> + Send>>;

/// Operations consumed from the native synchronizer module.
#[async_trait::async_trait]
pub trait Synchronizer: Send + Sync {
	/// Open a new session for the given wallet configuration.
	///
	/// # Errors
	/// `WalletMissing` when the synchronizer has no wallet for the alias/seed, `Busy` when
	/// another session is still running in this process.
	async fn create(&self, config: &SessionConfig) -> Result<SessionHandle, SynchronizerError>;

	/// Stop a session through the handle returned by [`Synchronizer::create`].
	async fn stop(&self, handle: &SessionHandle) -> Result<(), SynchronizerError>;

	/// Stop whatever session is registered under `alias`, including sessions left over
	/// from a previous run of the process.
	async fn stop_alias(&self, alias: &str) -> Result<(), SynchronizerError>;

	/// Subscribe to status, progress and error callbacks.
	async fn subscribe(
		&self,
		handle: &SessionHandle,
	) -> Result<SynchronizerEventStream, SynchronizerError>;

	/// Drop the callback subscription for a session.
	async fn unsubscribe(&self, handle: &SessionHandle) -> Result<(), SynchronizerError>;

	/// Current wallet balance.
	async fn get_balance(&self, handle: &SessionHandle) -> Result<WalletBalance, SynchronizerError>;

	/// Primary receiving address.
	async fn derive_address(
		&self,
		handle: &SessionHandle,
	) -> Result<WalletAddresses, SynchronizerError>;

	/// Confirmed transactions mined inside `range`.
	async fn get_transactions(
		&self,
		handle: &SessionHandle,
		range: BlockRange,
	) -> Result<Vec<TransactionRecord>, SynchronizerError>;

	/// Sign and broadcast a payment.
	async fn send(
		&self,
		handle: &SessionHandle,
		request: &SendRequest,
	) -> Result<SendReceipt, SynchronizerError>;

	/// Re-scan the chain from the wallet's birthday height.
	async fn rescan(&self, handle: &SessionHandle) -> Result<(), SynchronizerError>;
}
