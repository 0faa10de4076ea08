//! Session manager and integration point for the synchronizer lifecycle.
//!
//! This module defines the `SessionManager`, which owns the single synchronizer session of the
//! process. It tears down whatever the native layer may still be running, creates the new
//! session, subscribes to its events, and keeps the derived wallet state (balance, address,
//! heights, transaction history) up to date.
//!
//! The manager is responsible for:
//! - Enforcing at most one running synchronizer, including sessions left behind by earlier runs
//! - Classifying start failures and scheduling retries with the `backoff` crate
//! - Cancelling stale retries, event pumps and query results through a generation counter
//! - Publishing `SessionState` snapshots and user-facing `SessionNotice`s
//!
//! Every call into the synchronizer is bounded by `SessionTimings::call_timeout`. A timeout is
//! treated like any other transient failure.

use crate::config::{AppConfig, NetworkDefaults, SessionTimings, TeardownAliases};
use crate::session::config::{build_config, validate_config};
use crate::session::events::{
    EventDispatcher, SessionEvent, SessionEventHandler, convert_synchronizer_event,
};
use crate::session::progress_tracker::SyncProgressTracker;
use crate::session::state::{SessionPhase, SessionState};
use crate::session::transaction_cache::TransactionCache;
use crate::session::{SessionError, SessionNotice, StartOutcome};
use crate::synchronizer::{
    SendReceipt, SessionConfig, SessionHandle, SyncStatus, Synchronizer, SynchronizerError,
    SynchronizerEventStream,
};
use crate::transaction::{PaymentForm, build_send_request};
use crate::utils::format_zatoshi;
use crate::wallet::{WalletIdentity, WalletRegistry};

use backoff::backoff::Constant;
use futures::StreamExt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const NOTICE_CAPACITY: usize = 32;

/// Background work tied to the current session. Guarded by the lifecycle lock, which also
/// serializes teardown and creation.
#[derive(Default)]
struct Lifecycle {
    retry: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
    /// Config of the last start, kept for `restart` and the alias safety net in `stop`.
    config: Option<Arc<SessionConfig>>,
}

/// Held while a start attempt runs. Dropping it, including on task abort, releases the flag.
struct StartGuard<'a>(&'a AtomicBool);

impl<'a> StartGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owner of the synchronizer session.
///
/// Exactly one instance exists per process. It is constructed at startup and shared by handle
/// with every screen; readers observe state through `watch_state`, `transactions` and `notices`.
pub struct SessionManager {
    this: Weak<SessionManager>,
    synchronizer: Arc<dyn Synchronizer>,
    registry: Arc<WalletRegistry>,

    // Configuration
    network: NetworkDefaults,
    timings: SessionTimings,
    aliases: TeardownAliases,

    // Coordination
    generation: AtomicU64,
    starting: AtomicBool,
    lifecycle: Mutex<Lifecycle>,

    // Observable state
    state: watch::Sender<SessionState>,
    transactions: TransactionCache,
    notices: broadcast::Sender<SessionNotice>,
}

impl SessionManager {
    pub fn new(
        synchronizer: Arc<dyn Synchronizer>,
        registry: Arc<WalletRegistry>,
        config: &AppConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            synchronizer,
            registry,
            network: config.network.clone(),
            timings: config.timings.clone(),
            aliases: config.aliases.clone(),
            generation: AtomicU64::new(0),
            starting: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::default()),
            state,
            transactions: TransactionCache::new(),
            notices,
        })
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn transactions(&self) -> &TransactionCache {
        &self.transactions
    }

    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Open `identity`: start its session and record it as the current wallet.
    ///
    /// The wallet is not recorded when the synchronizer does not know it.
    pub async fn open_wallet(&self, identity: &WalletIdentity) -> Result<StartOutcome, SessionError> {
        let config = build_config(identity, &self.network)?;
        let outcome = self.start(config).await?;

        if outcome != StartOutcome::WalletSelectionRequired {
            if let Err(e) = self.registry.set_current_wallet(&identity.id).await {
                warn!("Failed to record current wallet {}: {}", identity.id, e);
            }
        }
        Ok(outcome)
    }

    /// Start a session for `config`, replacing whatever is running.
    ///
    /// A failed attempt either ends in `WalletSelectionRequired` or arms a retry, reported as
    /// `RetryScheduled`. Only a start superseded by `stop` and invalid input are errors.
    pub async fn start(&self, config: SessionConfig) -> Result<StartOutcome, SessionError> {
        validate_config(&config)?;
        let _guard = StartGuard::acquire(&self.starting).ok_or(SessionError::StartInProgress)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let config = Arc::new(config);
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(retry) = lifecycle.retry.take() {
            debug!("Replacing pending start retry");
            retry.abort();
        }
        lifecycle.config = Some(config.clone());
        self.state.send_modify(|s| {
            s.phase = SessionPhase::Starting;
            s.wallet_id = Some(config.alias.clone());
            s.birthday_height = config.birthday_height;
            s.pending_retry = None;
        });
        info!("Starting session for wallet {}", config.alias);

        let error = match self.attempt_start(&mut lifecycle, generation, &config).await {
            Ok(()) => return Ok(StartOutcome::Active),
            Err(e) => e,
        };
        if !self.is_current(generation) {
            debug!("Start superseded after failure: {}", error);
            return Err(SessionError::Cancelled);
        }

        match self.classify(error) {
            backoff::Error::Permanent(SessionError::WalletNotFound(reason)) => {
                info!("Wallet {} unknown to synchronizer: {}", config.alias, reason);
                self.deactivate();
                self.notify(SessionNotice::WalletSelectionRequired {
                    wallet_id: Some(config.alias.clone()),
                });
                Ok(StartOutcome::WalletSelectionRequired)
            }
            backoff::Error::Permanent(e) => {
                if e != SessionError::Cancelled {
                    self.deactivate();
                }
                Err(e)
            }
            backoff::Error::Transient { err, retry_after } => {
                let after = retry_after.unwrap_or(self.timings.transient_retry_delay);
                let reason = err.to_string();
                self.retry_pending(&err, after);
                lifecycle.retry = Some(self.schedule_retry(generation, config, after));
                Ok(StartOutcome::RetryScheduled { after, reason })
            }
        }
    }

    /// Stop the session and cancel any pending retry. Never fails: local state always ends
    /// up idle, whatever the synchronizer reports.
    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut lifecycle = self.lifecycle.lock().await;
        self.shutdown(&mut lifecycle).await;
        info!("Session stopped");
    }

    /// Stop and start again with the config of the last start.
    pub async fn restart(&self) -> Result<StartOutcome, SessionError> {
        let config = self
            .lifecycle
            .lock()
            .await
            .config
            .clone()
            .ok_or(SessionError::NotInitialized)?;

        info!("Restarting session for wallet {}", config.alias);
        self.stop().await;
        self.start(SessionConfig::clone(&config)).await
    }

    /// Fetch the balance and publish it. Returns the total in zatoshi.
    pub async fn refresh_balance(&self) -> Result<i64, SessionError> {
        let handle = self.active_handle()?;
        let balance = self
            .call("get_balance", self.synchronizer.get_balance(&handle))
            .await?;
        let total = balance.total()?;

        self.state.send_if_modified(|s| {
            if s.active_session.as_ref() != Some(&handle) || s.balance_zatoshi == total {
                return false;
            }
            s.balance_zatoshi = total;
            true
        });
        debug!("Balance: {}", format_zatoshi(total));
        Ok(total)
    }

    /// Fetch the primary address and publish it.
    pub async fn refresh_address(&self) -> Result<String, SessionError> {
        let handle = self.active_handle()?;
        let addresses = self
            .call("derive_address", self.synchronizer.derive_address(&handle))
            .await?;

        self.state.send_if_modified(|s| {
            if s.active_session.as_ref() != Some(&handle)
                || s.primary_address == addresses.primary_address
            {
                return false;
            }
            s.primary_address = addresses.primary_address.clone();
            true
        });
        Ok(addresses.primary_address)
    }

    /// Reload the transaction history. Returns the number of records loaded.
    pub async fn refresh_transactions(&self) -> Result<usize, SessionError> {
        let (handle, range) = {
            let state = self.state.borrow();
            let handle = state
                .active_session
                .clone()
                .ok_or(SessionError::NotInitialized)?;
            (handle, state.transaction_range())
        };

        debug!("Loading transactions for blocks {}..={}", range.first, range.last);
        self.transactions
            .refresh(self.call(
                "get_transactions",
                self.synchronizer.get_transactions(&handle, range),
            ))
            .await
    }

    /// Validate the payment form, submit it and refresh the balance.
    pub async fn send(&self, form: &PaymentForm) -> Result<SendReceipt, SessionError> {
        let handle = self.active_handle()?;
        let seed = self
            .lifecycle
            .lock()
            .await
            .config
            .as_ref()
            .map(|c| c.mnemonic_seed.clone())
            .ok_or(SessionError::NotInitialized)?;

        let request = build_send_request(form, &seed)?;
        info!("Sending {} zatoshi to {}", request.zatoshi, request.to_address);

        let receipt = self
            .call("send", self.synchronizer.send(&handle, &request))
            .await?;
        info!("Transaction submitted: {}", receipt.txid);

        let generation = self.generation.load(Ordering::SeqCst);
        let refreshed = self.refresh_balance().await.map(|_| ());
        self.log_background(generation, "balance", refreshed);
        Ok(receipt)
    }

    /// Rescan from the birthday height. Local progress and history restart from scratch.
    pub async fn rescan(&self) -> Result<(), SessionError> {
        let handle = self.active_handle()?;
        info!("Rescanning wallet from birthday");
        self.call("rescan", self.synchronizer.rescan(&handle)).await?;

        self.state.send_modify(|s| {
            if s.active_session.as_ref() == Some(&handle) {
                s.synced_height = 0;
                s.balance_zatoshi = 0;
            }
        });
        self.transactions.clear();
        Ok(())
    }

    fn active_handle(&self) -> Result<SessionHandle, SessionError> {
        self.state
            .borrow()
            .active_session
            .clone()
            .ok_or(SessionError::NotInitialized)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Teardown, create, subscribe and initial fetches. Runs under the lifecycle lock.
    async fn attempt_start(
        &self,
        lifecycle: &mut Lifecycle,
        generation: u64,
        config: &Arc<SessionConfig>,
    ) -> Result<(), SessionError> {
        self.teardown(lifecycle, &config.alias).await;
        if !self.is_current(generation) {
            return Err(SessionError::Cancelled);
        }

        info!("Creating synchronizer for {}", config.endpoint());
        let handle = self
            .call("create", self.synchronizer.create(config))
            .await?;
        if !self.is_current(generation) {
            self.stop_handle(&handle).await;
            return Err(SessionError::Cancelled);
        }

        let events = match self
            .call("subscribe", self.synchronizer.subscribe(&handle))
            .await
        {
            Ok(events) => events,
            Err(e) => {
                self.stop_handle(&handle).await;
                return Err(e);
            }
        };

        self.state.send_modify(|s| {
            s.phase = SessionPhase::Active;
            s.active_session = Some(handle.clone());
            s.pending_retry = None;
        });
        lifecycle.pump = Some(self.spawn_event_pump(generation, events));
        info!("Session {} active", handle);

        let balance = self.refresh_balance().await.map(|_| ());
        let address = self.refresh_address().await.map(|_| ());
        for result in [balance, address] {
            match result {
                Err(SessionError::WalletNotFound(reason)) => {
                    self.release_held(lifecycle).await;
                    return Err(SessionError::WalletNotFound(reason));
                }
                Err(e) => warn!("Initial wallet query failed: {}", e),
                Ok(()) => {}
            }
        }

        self.spawn_transaction_refresh(generation);
        Ok(())
    }

    /// Stop everything that could still occupy the synchronizer.
    ///
    /// Covers the session this manager holds, the alias about to start, the default alias and
    /// the aliases of the recorded current wallet. Every attempt is independent.
    async fn teardown(&self, lifecycle: &mut Lifecycle, alias: &str) {
        if self.release_held(lifecycle).await {
            tokio::time::sleep(self.timings.stop_settle_delay).await;
        }

        let recorded = match self.registry.current_wallet_id().await {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not read current wallet id: {}", e);
                None
            }
        };

        for candidate in self.aliases.candidates(alias, recorded.as_deref()) {
            self.force_stop_alias(&candidate).await;
            tokio::time::sleep(self.timings.stop_settle_delay).await;
        }
        tokio::time::sleep(self.timings.teardown_settle_delay).await;
    }

    /// Stop the held session, if any, and clear its data. Returns whether one was held.
    async fn release_held(&self, lifecycle: &mut Lifecycle) -> bool {
        if let Some(pump) = lifecycle.pump.take() {
            pump.abort();
        }

        let Some(handle) = self.state.borrow().active_session.clone() else {
            return false;
        };

        info!("Stopping session {}", handle);
        if let Err(e) = self
            .call("unsubscribe", self.synchronizer.unsubscribe(&handle))
            .await
        {
            warn!("Failed to unsubscribe from {}: {}", handle, e);
        }
        self.stop_handle(&handle).await;

        self.state.send_modify(|s| {
            s.active_session = None;
            s.synced_height = 0;
            s.network_height = 0;
            s.balance_zatoshi = 0;
            s.primary_address.clear();
        });
        self.transactions.clear();
        true
    }

    async fn shutdown(&self, lifecycle: &mut Lifecycle) {
        if let Some(retry) = lifecycle.retry.take() {
            info!("Cancelling pending start retry");
            retry.abort();
        }

        self.state.send_modify(|s| {
            s.phase = SessionPhase::Stopping;
            s.pending_retry = None;
        });
        self.release_held(lifecycle).await;
        if let Some(config) = lifecycle.config.clone() {
            self.force_stop_alias(&config.alias).await;
        }
        self.deactivate();
    }

    async fn stop_handle(&self, handle: &SessionHandle) {
        if let Err(e) = self.call("stop", self.synchronizer.stop(handle)).await {
            warn!("Failed to stop session {}: {}", handle, e);
        }
    }

    async fn force_stop_alias(&self, alias: &str) {
        debug!("Force-stopping alias {}", alias);
        if let Err(e) = self
            .call("stop_alias", self.synchronizer.stop_alias(alias))
            .await
        {
            debug!("Nothing stopped for alias {}: {}", alias, e);
        }
    }

    fn deactivate(&self) {
        self.state.send_replace(SessionState::default());
        self.transactions.clear();
    }

    fn notify(&self, notice: SessionNotice) {
        // No receivers is fine
        let _ = self.notices.send(notice);
    }

    fn retry_pending(&self, error: &SessionError, after: Duration) {
        warn!("Session start failed, retrying in {:?}: {}", after, error);
        self.state.send_modify(|s| {
            s.phase = SessionPhase::Starting;
            s.pending_retry = Some(after);
        });
        self.notify(SessionNotice::RetryScheduled {
            after,
            reason: error.to_string(),
        });
    }

    fn classify(&self, error: SessionError) -> backoff::Error<SessionError> {
        match error {
            SessionError::WalletNotFound(_)
            | SessionError::Cancelled
            | SessionError::InvalidConfig(_)
            | SessionError::StartInProgress => backoff::Error::permanent(error),
            SessionError::ActiveSessionConflict(_) => {
                backoff::Error::retry_after(error, self.timings.conflict_retry_delay)
            }
            _ => backoff::Error::retry_after(error, self.timings.transient_retry_delay),
        }
    }

    /// Bound a synchronizer call by the configured timeout.
    async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SynchronizerError>>,
    {
        match tokio::time::timeout(self.timings.call_timeout, call).await {
            Ok(result) => result.map_err(SessionError::from),
            Err(_) => Err(SessionError::Timeout {
                operation,
                after: self.timings.call_timeout,
            }),
        }
    }

    fn schedule_retry(
        &self,
        generation: u64,
        config: Arc<SessionConfig>,
        after: Duration,
    ) -> JoinHandle<()> {
        let manager = self.this.clone();
        let policy = Constant::new(self.timings.transient_retry_delay);

        tokio::spawn(async move {
            tokio::time::sleep(after).await;

            let operation = || {
                let manager = manager.clone();
                let config = config.clone();
                async move {
                    let manager = manager
                        .upgrade()
                        .ok_or_else(|| backoff::Error::permanent(SessionError::Cancelled))?;
                    manager.retry_start(generation, &config).await
                }
            };
            let notify_target = manager.clone();
            let notify = move |error: SessionError, after: Duration| {
                if let Some(manager) = notify_target.upgrade() {
                    manager.retry_pending(&error, after);
                }
            };

            match backoff::future::retry_notify(policy, operation, notify).await {
                Ok(()) => {}
                Err(SessionError::WalletNotFound(reason)) => {
                    if let Some(manager) = manager.upgrade() {
                        manager.abandon(generation, &reason).await;
                    }
                }
                Err(SessionError::Cancelled) => debug!("Start retry superseded"),
                Err(e) => warn!("Giving up on session start: {}", e),
            }
        })
    }

    async fn retry_start(
        &self,
        generation: u64,
        config: &Arc<SessionConfig>,
    ) -> Result<(), backoff::Error<SessionError>> {
        if !self.is_current(generation) {
            return Err(backoff::Error::permanent(SessionError::Cancelled));
        }
        let _guard = StartGuard::acquire(&self.starting)
            .ok_or_else(|| backoff::Error::permanent(SessionError::StartInProgress))?;
        let mut lifecycle = self.lifecycle.lock().await;
        if !self.is_current(generation) {
            return Err(backoff::Error::permanent(SessionError::Cancelled));
        }

        info!("Retrying session start for wallet {}", config.alias);
        self.state.send_modify(|s| s.pending_retry = None);
        self.attempt_start(&mut lifecycle, generation, config)
            .await
            .map_err(|e| self.classify(e))
    }

    /// Close the session of `generation` because its wallet is gone, and send the user back
    /// to wallet selection.
    async fn abandon(&self, generation: u64, reason: &str) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self
            .generation
            .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Ignoring wallet-missing report from a closed session");
            return;
        }

        warn!("Wallet missing, closing session: {}", reason);
        let wallet_id = lifecycle.config.as_ref().map(|c| c.alias.clone());
        // The caller may be the retry task itself; detach rather than abort it.
        lifecycle.retry = None;
        self.shutdown(&mut lifecycle).await;
        self.notify(SessionNotice::WalletSelectionRequired { wallet_id });
    }

    /// Outcome of a refresh nobody waits for. Stale data is kept on failure.
    fn log_background(&self, generation: u64, what: &'static str, result: Result<(), SessionError>) {
        match result {
            Ok(()) => {}
            Err(SessionError::WalletNotFound(reason)) => {
                let manager = self.this.clone();
                tokio::spawn(async move {
                    if let Some(manager) = manager.upgrade() {
                        manager.abandon(generation, &reason).await;
                    }
                });
            }
            Err(SessionError::NotInitialized | SessionError::Cancelled) => {
                debug!("Skipped {} refresh: no active session", what);
            }
            Err(e) => warn!("Failed to refresh {}: {}", what, e),
        }
    }

    fn spawn_transaction_refresh(&self, generation: u64) {
        let manager = self.this.clone();
        tokio::spawn(async move {
            if let Some(manager) = manager.upgrade() {
                let result = manager.refresh_transactions().await.map(|_| ());
                manager.log_background(generation, "transactions", result);
            }
        });
    }

    fn spawn_event_pump(&self, generation: u64, mut events: SynchronizerEventStream) -> JoinHandle<()> {
        let manager = self.this.clone();
        tokio::spawn(async move {
            let mut dispatcher = EventDispatcher::new();
            dispatcher.register_handler(Box::new(SyncProgressTracker::new()));
            dispatcher.register_handler(Box::new(ManagerEventHandler {
                manager,
                generation,
            }));

            while let Some(event) = events.next().await {
                for session_event in convert_synchronizer_event(event) {
                    dispatcher.dispatch(&session_event).await;
                }
            }
            debug!("Synchronizer event stream ended");
        })
    }

    async fn handle_event(&self, generation: u64, event: &SessionEvent) {
        match event {
            SessionEvent::StatusChanged(status) => {
                info!("Synchronizer status: {}", status);
                if !status.refreshes_wallet_data() {
                    return;
                }
                let balance = self.refresh_balance().await.map(|_| ());
                self.log_background(generation, "balance", balance);
                let address = self.refresh_address().await.map(|_| ());
                self.log_background(generation, "address", address);
                if *status == SyncStatus::Synced {
                    let transactions = self.refresh_transactions().await.map(|_| ());
                    self.log_background(generation, "transactions", transactions);
                }
            }
            SessionEvent::DownloadedHeight(height) => {
                self.state.send_if_modified(|s| {
                    let changed = s.synced_height != *height;
                    s.synced_height = *height;
                    changed
                });
                let balance = self.refresh_balance().await.map(|_| ());
                self.log_background(generation, "balance", balance);
            }
            SessionEvent::NetworkHeight(height) => {
                self.state.send_if_modified(|s| {
                    let changed = s.network_height != *height;
                    s.network_height = *height;
                    changed
                });
            }
            SessionEvent::SyncError { message } => {
                warn!("Synchronizer error: {}", message);
                self.notify(SessionNotice::SyncError {
                    message: message.clone(),
                });
            }
        }
    }
}

/// Applies session events to the manager's state while its session is current.
struct ManagerEventHandler {
    manager: Weak<SessionManager>,
    generation: u64,
}

#[async_trait::async_trait]
impl SessionEventHandler for ManagerEventHandler {
    async fn handle(&mut self, event: &SessionEvent) -> Result<(), SessionError> {
        let Some(manager) = self.manager.upgrade() else {
            return Ok(());
        };
        if manager.is_current(self.generation) {
            manager.handle_event(self.generation, event).await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SessionManager"
    }
}
