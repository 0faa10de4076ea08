//! Send request builder
//!
//! Turns the user-entered payment form into the request handed to the synchronizer,
//! converting decimal coin amounts to zatoshi.

use crate::synchronizer::SendRequest;
use crate::transaction::{DEFAULT_FEE_ZATOSHI, MAX_MEMO_BYTES};
use crate::utils::{format_zatoshi, parse_coin_amount};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransactionError {
	#[error("Transaction validation error: {0}")]
	ValidationError(String),

	#[error("Invalid amount: {0}")]
	InvalidAmount(String),

	#[error("Invalid fee: {0}")]
	InvalidFee(String),
}

/// Raw values from the send form, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentForm {
	pub from_address: String,
	pub to_address: String,
	pub amount: String,
	pub fee: String,
	pub memo: String,
}

impl PaymentForm {
	/// A fresh send form for `from_address` with the default fee filled in.
	pub fn new(from_address: &str) -> Self {
		Self {
			from_address: from_address.to_string(),
			fee: format_zatoshi(DEFAULT_FEE_ZATOSHI),
			..Self::default()
		}
	}
}

/// Builder for constructing a [`SendRequest`]
#[derive(Default)]
pub struct SendRequestBuilder {
	/// Address the funds leave from (only validated, the synchronizer picks the notes)
	from_address: Option<String>,
	/// Recipient address
	to_address: Option<String>,
	/// Decimal coin amount
	amount: Option<String>,
	/// Decimal coin fee
	fee: Option<String>,
	/// Optional memo
	memo: Option<String>,
	/// Seed the synchronizer signs with
	seed: Option<String>,
}

impl SendRequestBuilder {
	/// Creates a new, empty builder
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a builder from every field of the send form
	pub fn from_form(form: &PaymentForm) -> Self {
		Self::new()
			.with_from_address(&form.from_address)
			.with_to_address(&form.to_address)
			.with_amount(&form.amount)
			.with_fee(&form.fee)
			.with_memo(&form.memo)
	}

	pub fn with_from_address(mut self, address: &str) -> Self {
		self.from_address = Some(address.to_string());
		self
	}

	pub fn with_to_address(mut self, address: &str) -> Self {
		self.to_address = Some(address.to_string());
		self
	}

	pub fn with_amount(mut self, amount: &str) -> Self {
		self.amount = Some(amount.to_string());
		self
	}

	pub fn with_fee(mut self, fee: &str) -> Self {
		self.fee = Some(fee.to_string());
		self
	}

	pub fn with_memo(mut self, memo: &str) -> Self {
		self.memo = Some(memo.to_string());
		self
	}

	pub fn with_seed(mut self, seed: &str) -> Self {
		self.seed = Some(seed.to_string());
		self
	}

	/// Validates the inputs and builds the request
	pub fn build(self) -> Result<SendRequest, TransactionError> {
		let from_address = non_blank(self.from_address);
		if from_address.is_none() {
			return Err(TransactionError::ValidationError(
				"Please enter a from address".to_string(),
			));
		}

		let to_address = non_blank(self.to_address).ok_or_else(|| {
			TransactionError::ValidationError("Please enter a destination address".to_string())
		})?;

		let amount_text = self.amount.unwrap_or_default();
		let zatoshi = parse_coin_amount(&amount_text)
			.ok_or_else(|| TransactionError::InvalidAmount(amount_text.clone()))?;
		if zatoshi == 0 {
			return Err(TransactionError::InvalidAmount(amount_text));
		}

		// Fee is chosen by the synchronizer; the entered value only has to be well formed.
		let fee_text = self.fee.unwrap_or_default();
		if parse_coin_amount(&fee_text).is_none() {
			return Err(TransactionError::InvalidFee(fee_text));
		}

		let memo = match self.memo {
			Some(memo) if !memo.trim().is_empty() => memo,
			_ => String::new(),
		};
		if memo.len() > MAX_MEMO_BYTES {
			return Err(TransactionError::ValidationError(format!(
				"Memo is {} bytes, at most {} allowed",
				memo.len(),
				MAX_MEMO_BYTES
			)));
		}

		let mnemonic_seed = non_blank(self.seed).ok_or_else(|| {
			TransactionError::ValidationError("No wallet seed available".to_string())
		})?;

		Ok(SendRequest {
			zatoshi,
			to_address,
			memo,
			mnemonic_seed,
		})
	}
}

/// Build the synchronizer request for a filled-in send form.
pub fn build_send_request(form: &PaymentForm, seed: &str) -> Result<SendRequest, TransactionError> {
	SendRequestBuilder::from_form(form).with_seed(seed).build()
}

fn non_blank(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}
