//! Consent events.
//!
//! Events are dispatched on an [`EventBus`] so other page code can observe
//! consent changes without holding a reference to the orchestrator.

use crate::consent::DEFAULT_CHANNEL_CAPACITY;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// A handle for receiving consent notifications.
pub type Subscription = broadcast::Receiver<ConsentEvent>;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsentEvent {
    /// The two consent records disagreed and a sync is about to be submitted.
    ConsentChanged {
        cookie_name: String,
        /// Intuit cookie value at the time of the change, if any
        intuit_value: Option<String>,
        /// CMP cookie value at the time of the change, if any
        cmp_value: Option<String>,
    },
    /// A browser privacy signal forced the session into an opted-out state.
    PrivacySignalOptOut {
        cookie_name: String,
        preferences: BTreeMap<String, bool>,
    },
}

impl ConsentEvent {
    /// Event name as seen by page scripts.
    pub fn name(&self) -> &'static str {
        match self {
            ConsentEvent::ConsentChanged { .. } => "consentChanged",
            ConsentEvent::PrivacySignalOptOut { .. } => "privacySignalOptOut",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConsentEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }

    pub fn publish(&self, ev: ConsentEvent) {
        log::debug!("Consent[events]: dispatching {}", ev.name());
        // send() only fails without receivers, which is fine.
        let _ = self.tx.send(ev);
    }
}
