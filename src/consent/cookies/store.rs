//! Cookie store infrastructure.
//!
//! A **cookie store** is a provisioner and persistence layer for per-site cookie jars.
//! The consent code only ever *holds a [`CookieJarHandle`]*; the store exists to mint
//! that jar for a site and to keep its cookie strings across page loads.
//!
//! This module exports two implementations:
//! - [`InMemoryCookieStore`]: jars live as long as the store (tests, private sessions).
//! - [`JsonCookieStore`]: file-backed JSON store, one file for all sites.
//!
//! ## Example
//! ```rust,no_run
//! use consent_sync::cookies::{CookieStore, DocumentCookies, JsonCookieStore};
//!
//! let store = JsonCookieStore::new("cookies.json".into()).unwrap();
//! let jar = store.jar_for("accounts.intuit.com").unwrap();
//! let cookies = DocumentCookies::new(jar);
//! ```
mod in_memory;
mod json;

use crate::consent::cookies::cookie_jar::DefaultCookieJar;
use crate::consent::cookies::cookies::CookieJarHandle;

pub use in_memory::InMemoryCookieStore;
/// File-backed JSON cookie store (one file for all sites).
pub use json::JsonCookieStore;

/// A cookie **store** mints per-site cookie **jars** and (optionally) persists them.
///
/// Implementations must be `Send + Sync` and safe for concurrent use.
pub trait CookieStore: Send + Sync {
    /// Returns (or creates and returns) the cookie jar handle for `site`.
    ///
    /// Returns the *same logical jar instance* for a given site across calls.
    fn jar_for(&self, site: &str) -> Option<CookieJarHandle>;

    /// Persists the cookie state for `site` from a provided snapshot.
    ///
    /// This should be **best-effort** and must not panic.
    fn persist_site_from_snapshot(&self, site: &str, snapshot: &DefaultCookieJar);

    /// Removes all persisted cookie data for `site`. Idempotent.
    fn remove_site(&self, site: &str);
}
