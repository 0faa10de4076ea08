//! Boundary with the native light-client synchronizer.
//!
//! This module provides the collaborator trait and the types that cross it. The synchronizer
//! itself lives in the native module and is not implemented here; tests drive the session
//! manager through an in-crate mock.

/// Trait describing the synchronizer operations this crate consumes
mod client;
/// Type definitions for data exchanged with the synchronizer
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{Synchronizer, SynchronizerEventStream};
pub use types::*;
