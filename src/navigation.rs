//! Screen selection driven by session outcomes.
//!
//! The controller holds no session data. It only decides which screen is shown, based on what
//! the user did and what the session manager reported.

use crate::session::{SessionNotice, StartOutcome};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
	Splash,
	WalletManager,
	CreateWallet,
	WalletSetup,
	Loading,
	Main,
	Send,
	Receive,
	TransactionDetail,
}

impl fmt::Display for Screen {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Screen::Splash => "SPLASH",
			Screen::WalletManager => "WALLET_MANAGER",
			Screen::CreateWallet => "CREATE_WALLET",
			Screen::WalletSetup => "WALLET_SETUP",
			Screen::Loading => "LOADING",
			Screen::Main => "MAIN",
			Screen::Send => "SEND",
			Screen::Receive => "RECEIVE",
			Screen::TransactionDetail => "TRANSACTION_DETAIL",
		};
		write!(f, "{}", name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenController {
	current: Screen,
	loading_message: Option<String>,
	selected_transaction: Option<String>,
}

impl Default for ScreenController {
	fn default() -> Self {
		Self::new()
	}
}

impl ScreenController {
	pub fn new() -> Self {
		Self {
			current: Screen::Splash,
			loading_message: None,
			selected_transaction: None,
		}
	}

	pub fn current(&self) -> Screen {
		self.current
	}

	pub fn loading_message(&self) -> Option<&str> {
		self.loading_message.as_deref()
	}

	/// Id of the transaction shown on the detail screen.
	pub fn selected_transaction(&self) -> Option<&str> {
		self.selected_transaction.as_deref()
	}

	fn navigate(&mut self, screen: Screen) {
		debug!("Navigating from {} to {}", self.current, screen);
		self.current = screen;
		if screen != Screen::Loading {
			self.loading_message = None;
		}
	}

	fn show_loading(&mut self, message: &str) {
		self.navigate(Screen::Loading);
		self.loading_message = Some(message.to_string());
	}

	pub fn splash_finished(&mut self) {
		self.navigate(Screen::WalletManager);
	}

	pub fn show_create_wallet(&mut self) {
		self.navigate(Screen::CreateWallet);
	}

	pub fn show_wallet_setup(&mut self) {
		self.navigate(Screen::WalletSetup);
	}

	/// A wallet was picked, created or imported; its session is being opened.
	pub fn wallet_selected(&mut self) {
		self.show_loading("Opening wallet...");
	}

	/// Apply the result of opening a wallet.
	pub fn on_start_outcome(&mut self, outcome: &StartOutcome) {
		match outcome {
			StartOutcome::Active => self.navigate(Screen::Main),
			StartOutcome::WalletSelectionRequired => self.navigate(Screen::WalletManager),
			// Keep the loading screen while the retry is pending
			StartOutcome::RetryScheduled { .. } => {}
		}
	}

	/// Opening a wallet failed outright.
	pub fn wallet_open_failed(&mut self) {
		self.navigate(Screen::WalletManager);
	}

	/// React to a notice published by the session manager.
	pub fn on_notice(&mut self, notice: &SessionNotice) {
		if let SessionNotice::WalletSelectionRequired { .. } = notice {
			self.selected_transaction = None;
			self.navigate(Screen::WalletManager);
		}
	}

	/// A started retry succeeded while the loading screen was up.
	pub fn session_active(&mut self) {
		if self.current == Screen::Loading {
			self.navigate(Screen::Main);
		}
	}

	pub fn closing_wallet(&mut self) {
		self.show_loading("Closing wallet...");
	}

	pub fn wallet_closed(&mut self) {
		self.selected_transaction = None;
		self.navigate(Screen::WalletManager);
	}

	pub fn show_send(&mut self) {
		self.navigate(Screen::Send);
	}

	pub fn show_receive(&mut self) {
		self.navigate(Screen::Receive);
	}

	pub fn show_transaction_detail(&mut self, transaction_id: &str) {
		self.selected_transaction = Some(transaction_id.to_string());
		self.navigate(Screen::TransactionDetail);
	}

	pub fn back_to_main(&mut self) {
		self.navigate(Screen::Main);
	}

	/// The main screen stays mounted under these screens so its state survives overlays.
	pub fn keeps_main_mounted(&self) -> bool {
		matches!(
			self.current,
			Screen::Loading
				| Screen::Main
				| Screen::Send
				| Screen::Receive
				| Screen::TransactionDetail
		)
	}
}
