//! Consent reconciliation between the first-party Intuit consent cookie and the
//! CMP (`OptanonConsent`) cookie.
//!
//! The pieces, leaves first:
//!
//! - [`cookies`]: cookie jars, persistent stores and the [`DocumentCookies`](cookies::DocumentCookies)
//!   adapter that scripts-side reads/writes go through.
//! - [`preferences`]: the two cookie encodings and the [`CategoryMap`](preferences::CategoryMap)
//!   between them.
//! - [`reconcile`]: when to sync, and how to merge one side into the other.
//! - [`law`]: the regional law configuration (checkbox schema + sync endpoints).
//! - [`sync`]: the [`SyncOrchestrator`](sync::SyncOrchestrator) driving a page lifecycle.
//! - [`bootstrap`]: registration entry point returning a [`ConsentToolHandle`](bootstrap::ConsentToolHandle).

pub mod bootstrap;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod events;
pub mod geo;
pub mod law;
pub mod preferences;
pub mod reconcile;
pub mod sync;

pub use bootstrap::{register, ConsentToolHandle, DataLayer};
pub use config::{PrivacySignalPolicy, SyncConfig, SyncConfigError};
pub use errors::ConsentError;
pub use events::{ConsentEvent, EventBus};
pub use law::{ConsentSubmission, ConsentUtility, LawConfig, LawConfigResolver};
pub use sync::{InitOutcome, PageContext, SyncOrchestrator, SyncServices, SyncState};

/// Default capacity of the consent event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// CMP consent cookie.
pub const CMP_CONSENT_COOKIE: &str = "OptanonConsent";
/// CMP cookie marking the banner as closed.
pub const CMP_BANNER_CLOSED_COOKIE: &str = "OptanonAlertBoxClosed";
/// Marker written when the user made an explicit choice before authenticating.
pub const PRE_AUTH_CONSENT_COOKIE: &str = "pacflag";
/// Names the Intuit consent cookie can take, in detection order.
pub const INTUIT_COOKIE_NAMES: [&str; 4] = ["cpra", "ccpa", "gdpr", "lgdp"];
/// Intuit cookie name used when none is present yet.
pub const DEFAULT_INTUIT_COOKIE: &str = "ccpa";
