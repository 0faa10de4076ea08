//! Utility module for the wallet session crate.
//!
//! Re-exports amount formatting and parsing helpers used throughout the codebase.
/// Utility functions for formatting and parsing amounts
pub mod index;

pub use index::{format_zatoshi, parse_coin_amount};
