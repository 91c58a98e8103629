//! Page bootstrap.
//!
//! Top-level page code calls [`register`] once and keeps the returned
//! [`ConsentToolHandle`]. The CMP then drives the handle: once its script has
//! loaded ([`ConsentToolHandle::on_cmp_loaded`]) and on every change the user
//! makes ([`ConsentToolHandle::on_consent_changed`]).
//!
//! The handle's lock is never held while the orchestrator runs, so a consent
//! utility may call back into the handle from inside a submission. Such a call
//! is recorded and replayed once the running sync returns.
//!
//! ```rust
//! use consent_sync::cookies::DefaultCookieJar;
//! use consent_sync::{register, DataLayer, PageContext, SyncConfig, SyncServices};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let page = PageContext::new("https://accounts.intuit.com/".parse()?);
//! let services = SyncServices::new(DefaultCookieJar::new().into(), page);
//! let handle = register(services, SyncConfig::default(), DataLayer::new());
//!
//! handle.on_cmp_loaded()?;
//! assert!(handle.is_initialized());
//! assert_eq!(handle.data_layer().entries()?.len(), 1);
//! # Ok(()) }
//! ```

use crate::consent::config::SyncConfig;
use crate::consent::errors::ConsentError;
use crate::consent::events::Subscription;
use crate::consent::sync::{InitOutcome, SyncOrchestrator, SyncOutcome, SyncServices, SyncState};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Analytics marker pushed when the tool initializes.
pub const CONSENT_TOOL_LOADED: &str = "consentToolLoaded";

/// Page-level analytics event queue.
#[derive(Debug, Clone, Default)]
pub struct DataLayer {
    entries: Arc<Mutex<Vec<Value>>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: Value) -> Result<(), ConsentError> {
        self.entries.lock().map_err(|_| ConsentError::Poisoned)?.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<Value>, ConsentError> {
        Ok(self.entries.lock().map_err(|_| ConsentError::Poisoned)?.clone())
    }
}

/// Where the page's orchestrator currently lives.
enum Slot {
    Unloaded,
    Ready(SyncOrchestrator),
    /// Checked out by a running call; `pending` records changes reported meanwhile.
    Running { pending: bool },
}

/// Handle returned by [`register`]; owns the page's orchestrator once the CMP has loaded.
pub struct ConsentToolHandle {
    services: SyncServices,
    config: SyncConfig,
    data_layer: DataLayer,
    slot: Mutex<Slot>,
}

impl std::fmt::Debug for ConsentToolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentToolHandle")
            .field("page", &self.services.page)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Registers the consent tool for a page. Call once from bootstrap code.
pub fn register(services: SyncServices, config: SyncConfig, data_layer: DataLayer) -> ConsentToolHandle {
    log::debug!("Consent[bootstrap]: registered for {}", services.page.host());
    ConsentToolHandle {
        services,
        config,
        data_layer,
        slot: Mutex::new(Slot::Unloaded),
    }
}

impl ConsentToolHandle {
    /// CMP loaded callback: builds the orchestrator and runs the page-load sync.
    ///
    /// A second call returns [`ConsentError::AlreadyInitialized`]. When initialization
    /// fails the handle stays unloaded and a later call may try again.
    pub fn on_cmp_loaded(&self) -> Result<InitOutcome, ConsentError> {
        {
            let mut slot = self.slot.lock().map_err(|_| ConsentError::Poisoned)?;
            if !matches!(*slot, Slot::Unloaded) {
                log::warn!("Consent[bootstrap]: CMP loaded twice, ignoring");
                return Err(ConsentError::AlreadyInitialized);
            }
            *slot = Slot::Running { pending: false };
        }

        let loaded = SyncOrchestrator::new(self.services.clone(), self.config.clone()).and_then(|mut orchestrator| {
            let outcome = orchestrator.initialize()?;
            Ok((orchestrator, outcome))
        });
        let (orchestrator, outcome) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("Consent[bootstrap]: initialization failed: {}", e);
                self.put_back(Slot::Unloaded)?;
                return Err(e);
            }
        };

        log::info!("Consent[bootstrap]: initialized ({:?})", outcome);
        let marker = self.data_layer.push(json!({
            "event": CONSENT_TOOL_LOADED,
            "cookieName": orchestrator.cookie_name(),
        }));

        self.park(orchestrator)?;
        marker?;
        Ok(outcome)
    }

    /// CMP consent-changed callback.
    ///
    /// Returns [`SyncOutcome::Deferred`] when called while another sync is running.
    pub fn on_consent_changed(&self) -> Result<SyncOutcome, ConsentError> {
        let mut orchestrator = {
            let mut slot = self.slot.lock().map_err(|_| ConsentError::Poisoned)?;
            match std::mem::replace(&mut *slot, Slot::Running { pending: false }) {
                Slot::Ready(orchestrator) => orchestrator,
                Slot::Unloaded => {
                    *slot = Slot::Unloaded;
                    return Err(ConsentError::NotInitialized);
                }
                Slot::Running { .. } => {
                    log::debug!("Consent[bootstrap]: sync in progress, deferring consent change");
                    *slot = Slot::Running { pending: true };
                    return Ok(SyncOutcome::Deferred);
                }
            }
        };

        let result = orchestrator.on_consent_changed();
        self.park(orchestrator)?;
        result
    }

    /// Returns the orchestrator to the slot, first replaying any change deferred
    /// while it was checked out.
    fn park(&self, mut orchestrator: SyncOrchestrator) -> Result<(), ConsentError> {
        loop {
            {
                let mut slot = self.slot.lock().map_err(|_| ConsentError::Poisoned)?;
                if !matches!(*slot, Slot::Running { pending: true }) {
                    *slot = Slot::Ready(orchestrator);
                    return Ok(());
                }
                *slot = Slot::Running { pending: false };
            }

            if let Err(e) = orchestrator.on_consent_changed() {
                log::error!("Consent[bootstrap]: deferred consent change failed: {}", e);
            }
        }
    }

    fn put_back(&self, state: Slot) -> Result<(), ConsentError> {
        *self.slot.lock().map_err(|_| ConsentError::Poisoned)? = state;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.lock().map(|s| !matches!(*s, Slot::Unloaded)).unwrap_or(false)
    }

    /// Current orchestrator state; `Syncing` while a call is running.
    pub fn state(&self) -> Option<SyncState> {
        let slot = self.slot.lock().ok()?;
        match &*slot {
            Slot::Unloaded => None,
            Slot::Ready(orchestrator) => Some(orchestrator.state()),
            Slot::Running { .. } => Some(SyncState::Syncing),
        }
    }

    /// Subscribe to consent events for this page.
    pub fn subscribe(&self) -> Subscription {
        self.services.events.subscribe()
    }

    pub fn data_layer(&self) -> &DataLayer {
        &self.data_layer
    }

    /// Drops the orchestrator so the next CMP load initializes again.
    #[cfg(test)]
    pub(crate) fn reset(&self) {
        let _ = self.put_back(Slot::Unloaded);
    }
}
