/// Send request builder for payments handed to the synchronizer
pub mod builder;

pub use builder::{PaymentForm, SendRequestBuilder, TransactionError, build_send_request};

/// Number of decimal places of the native coin.
pub const COIN_DECIMALS: u32 = 8;

/// Zatoshi in one whole coin.
pub const ZATOSHI_PER_COIN: i64 = 100_000_000;

/// Largest memo the send flow accepts.
pub const MAX_MEMO_BYTES: usize = 512;

/// Fee the send screen pre-fills, 0.0001 coin.
pub const DEFAULT_FEE_ZATOSHI: i64 = 10_000;
