//! Event system for synchronizer sessions.
//!
//! This module defines the session event types, the event handler trait, and the event
//! dispatcher used while a session is running. Raw synchronizer callbacks are converted into
//! `SessionEvent`s and dispatched to every registered handler, which keeps derived-state
//! updates, progress logging and notices independent of each other.
//!
//! Callbacks may arrive in any order and at any rate, so handlers must treat every event as
//! idempotent.

use crate::session::SessionError;
use crate::synchronizer::{SyncStatus, SynchronizerEvent};

/// Events that occur while a session is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The synchronizer changed status
    StatusChanged(SyncStatus),
    /// Blocks up to this height have been downloaded and scanned
    DownloadedHeight(u64),
    /// The chain tip moved
    NetworkHeight(u64),
    /// The synchronizer reported a non-fatal error
    SyncError { message: String },
}

/// Trait for handling session events.
///
/// Implementors receive all session events and can perform side effects or state updates.
#[async_trait::async_trait]
pub trait SessionEventHandler: Send + Sync {
    /// Handle a session event.
    async fn handle(&mut self, event: &SessionEvent) -> Result<(), SessionError>;

    /// Get the name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
///
/// Handlers are called in registration order for every event.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Box<dyn SessionEventHandler>>,
}

impl EventDispatcher {
    /// Create a new, empty event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new event handler.
    pub fn register_handler(&mut self, handler: Box<dyn SessionEventHandler>) {
        self.handlers.push(handler);
    }

    /// Dispatch an event to all registered handlers.
    ///
    /// Errors from handlers are logged, but do not stop other handlers from running.
    pub async fn dispatch(&mut self, event: &SessionEvent) {
        for handler in &mut self.handlers {
            if let Err(e) = handler.handle(event).await {
                tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
            }
        }
    }
}

/// Convert a synchronizer callback into session events.
///
/// A progress update may carry both heights; the downloaded height is emitted first.
pub fn convert_synchronizer_event(event: SynchronizerEvent) -> Vec<SessionEvent> {
    let mut session_events = Vec::new();

    match event {
        SynchronizerEvent::StatusChanged { name } => {
            session_events.push(SessionEvent::StatusChanged(SyncStatus::from_name(&name)));
        }
        SynchronizerEvent::Update {
            last_downloaded_height,
            network_block_height,
        } => {
            if let Some(height) = last_downloaded_height {
                session_events.push(SessionEvent::DownloadedHeight(height));
            }
            if let Some(height) = network_block_height {
                session_events.push(SessionEvent::NetworkHeight(height));
            }
        }
        SynchronizerEvent::Error { message } => {
            session_events.push(SessionEvent::SyncError { message });
        }
    }

    session_events
}
