//! Scriptable in-memory synchronizer used by the session manager tests.

use super::client::{Synchronizer, SynchronizerEventStream};
use super::types::*;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Every call the mock received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
	Create(String),
	Stop(String),
	StopAlias(String),
	Subscribe(String),
	Unsubscribe(String),
	GetBalance,
	DeriveAddress,
	GetTransactions(BlockRange),
	Send(u64),
	Rescan,
}

struct MockState {
	next_id: u64,
	/// Running sessions keyed by id. Like the native module, at most one may run.
	active: HashMap<u64, String>,
	max_active: usize,
	calls: Vec<Call>,
	create_failures: VecDeque<SynchronizerError>,
	hang_create: bool,
	fail_stops: bool,
	balance: Result<String, SynchronizerError>,
	address: Result<String, SynchronizerError>,
	transactions: Result<Vec<TransactionRecord>, SynchronizerError>,
	send_result: Result<String, SynchronizerError>,
	rescan_result: Result<(), SynchronizerError>,
	subscribers: Vec<UnboundedSender<SynchronizerEvent>>,
}

pub(crate) struct MockSynchronizer {
	state: Mutex<MockState>,
}

impl MockSynchronizer {
	pub(crate) fn new() -> Self {
		Self {
			state: Mutex::new(MockState {
				next_id: 1,
				active: HashMap::new(),
				max_active: 0,
				calls: Vec::new(),
				create_failures: VecDeque::new(),
				hang_create: false,
				fail_stops: false,
				balance: Ok("0".to_string()),
				address: Ok("zs1mockaddress".to_string()),
				transactions: Ok(Vec::new()),
				send_result: Ok("txid-1".to_string()),
				rescan_result: Ok(()),
				subscribers: Vec::new(),
			}),
		}
	}

	fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
		let mut guard = self.state.lock().unwrap();
		f(&mut guard)
	}

	/// Queue a failure for the next `create` call.
	pub(crate) fn fail_next_create(&self, error: SynchronizerError) {
		self.with_state(|s| s.create_failures.push_back(error));
	}

	/// Make `create` never complete.
	pub(crate) fn hang_create(&self, hang: bool) {
		self.with_state(|s| s.hang_create = hang);
	}

	/// Make every stop call fail without stopping anything.
	pub(crate) fn fail_stops(&self, fail: bool) {
		self.with_state(|s| s.fail_stops = fail);
	}

	/// Register a session the process does not hold a handle for, as if it was left
	/// behind by a previous run.
	pub(crate) fn leave_running(&self, alias: &str) {
		self.with_state(|s| {
			let id = s.next_id;
			s.next_id += 1;
			s.active.insert(id, alias.to_string());
		});
	}

	pub(crate) fn set_balance(&self, balance: Result<&str, SynchronizerError>) {
		self.with_state(|s| s.balance = balance.map(str::to_string));
	}

	pub(crate) fn set_address(&self, address: Result<&str, SynchronizerError>) {
		self.with_state(|s| s.address = address.map(str::to_string));
	}

	pub(crate) fn set_transactions(
		&self,
		transactions: Result<Vec<TransactionRecord>, SynchronizerError>,
	) {
		self.with_state(|s| s.transactions = transactions);
	}

	pub(crate) fn set_send_result(&self, result: Result<&str, SynchronizerError>) {
		self.with_state(|s| s.send_result = result.map(str::to_string));
	}

	pub(crate) fn set_rescan_result(&self, result: Result<(), SynchronizerError>) {
		self.with_state(|s| s.rescan_result = result);
	}

	/// Push an event to every live subscription.
	pub(crate) fn emit(&self, event: SynchronizerEvent) {
		self.with_state(|s| {
			s.subscribers
				.retain(|sender| sender.unbounded_send(event.clone()).is_ok())
		});
	}

	pub(crate) fn calls(&self) -> Vec<Call> {
		self.with_state(|s| s.calls.clone())
	}

	pub(crate) fn create_count(&self) -> usize {
		self.with_state(|s| {
			s.calls
				.iter()
				.filter(|c| matches!(c, Call::Create(_)))
				.count()
		})
	}

	pub(crate) fn active_aliases(&self) -> Vec<String> {
		self.with_state(|s| {
			let mut aliases: Vec<String> = s.active.values().cloned().collect();
			aliases.sort();
			aliases
		})
	}

	/// Largest number of sessions that were ever running at the same time.
	pub(crate) fn max_active(&self) -> usize {
		self.with_state(|s| s.max_active)
	}
}

#[async_trait::async_trait]
impl Synchronizer for MockSynchronizer {
	async fn create(&self, config: &SessionConfig) -> Result<SessionHandle, SynchronizerError> {
		let hang = self.with_state(|s| {
			s.calls.push(Call::Create(config.alias.clone()));
			s.hang_create
		});
		if hang {
			futures::future::pending::<()>().await;
		}
		self.with_state(|s| {
			if let Some(error) = s.create_failures.pop_front() {
				return Err(error);
			}
			if !s.active.is_empty() {
				return Err(SynchronizerError::Busy(
					"Another synchronizer is already running".to_string(),
				));
			}
			let id = s.next_id;
			s.next_id += 1;
			s.active.insert(id, config.alias.clone());
			s.max_active = s.max_active.max(s.active.len());
			Ok(SessionHandle::new(id, config.alias.clone()))
		})
	}

	async fn stop(&self, handle: &SessionHandle) -> Result<(), SynchronizerError> {
		self.with_state(|s| {
			s.calls.push(Call::Stop(handle.alias().to_string()));
			if s.fail_stops {
				return Err(SynchronizerError::Other("native stop failed".to_string()));
			}
			s.active.remove(&handle.id());
			Ok(())
		})
	}

	async fn stop_alias(&self, alias: &str) -> Result<(), SynchronizerError> {
		self.with_state(|s| {
			s.calls.push(Call::StopAlias(alias.to_string()));
			if s.fail_stops {
				return Err(SynchronizerError::Other("native stop failed".to_string()));
			}
			s.active.retain(|_, running| running != alias);
			Ok(())
		})
	}

	async fn subscribe(
		&self,
		handle: &SessionHandle,
	) -> Result<SynchronizerEventStream, SynchronizerError> {
		let (sender, receiver) = unbounded();
		self.with_state(|s| {
			s.calls.push(Call::Subscribe(handle.alias().to_string()));
			s.subscribers.push(sender);
		});
		Ok(Box::pin(receiver))
	}

	async fn unsubscribe(&self, handle: &SessionHandle) -> Result<(), SynchronizerError> {
		self.with_state(|s| {
			s.calls.push(Call::Unsubscribe(handle.alias().to_string()));
			s.subscribers.clear();
		});
		Ok(())
	}

	async fn get_balance(&self, _handle: &SessionHandle) -> Result<WalletBalance, SynchronizerError> {
		self.with_state(|s| {
			s.calls.push(Call::GetBalance);
			s.balance.clone().map(|total_zatoshi| WalletBalance { total_zatoshi })
		})
	}

	async fn derive_address(
		&self,
		_handle: &SessionHandle,
	) -> Result<WalletAddresses, SynchronizerError> {
		self.with_state(|s| {
			s.calls.push(Call::DeriveAddress);
			s.address
				.clone()
				.map(|primary_address| WalletAddresses { primary_address })
		})
	}

	async fn get_transactions(
		&self,
		_handle: &SessionHandle,
		range: BlockRange,
	) -> Result<Vec<TransactionRecord>, SynchronizerError> {
		self.with_state(|s| {
			s.calls.push(Call::GetTransactions(range));
			s.transactions.clone()
		})
	}

	async fn send(
		&self,
		_handle: &SessionHandle,
		request: &SendRequest,
	) -> Result<SendReceipt, SynchronizerError> {
		self.with_state(|s| {
			s.calls.push(Call::Send(request.zatoshi));
			s.send_result.clone().map(|txid| SendReceipt { txid, raw: None })
		})
	}

	async fn rescan(&self, _handle: &SessionHandle) -> Result<(), SynchronizerError> {
		self.with_state(|s| {
			s.calls.push(Call::Rescan);
			s.rescan_result.clone()
		})
	}
}
