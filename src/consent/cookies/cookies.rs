//! Cookie core types.
//!
//! This module defines the **type-erased handles** used by the consent code
//! and the serializable [`Cookie`] data structure.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!   - Callers take a **read lock** for queries and a **write lock** for
//!     mutations. Every mutation replaces a single cookie in full.
//! - [`CookieStoreHandle`] is `Arc<dyn CookieStore + Send + Sync>`.
//!   - Stores manage their **own internal synchronization**; trait methods take `&self`.
//!
//! ```rust
//! use consent_sync::cookies::Cookie;
//!
//! let c = Cookie {
//!     name: "OptanonConsent".into(),
//!     value: "groups=1%3A1%2C4%3A0".into(),
//!     path: Some("/".into()),
//!     domain: Some("intuit.com".into()),
//!     secure: true,
//!     expires: Some("Tue, 19 Oct 2027 10:00:00 GMT".into()),
//!     same_site: Some("None".into()),
//!     http_only: false,
//! };
//! assert!(!c.is_expired(time::OffsetDateTime::UNIX_EPOCH));
//! ```

use crate::consent::cookies::store::CookieStore;
use crate::consent::cookies::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// A handle to a cookie jar trait.
///
/// This is a reference-counted, read/write-locked pointer to a type-erased
/// [`CookieJar`].
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

/// A handle to a cookie store trait.
///
/// Store implementations must be **`Send + Sync` and internally synchronized**,
/// since callers hold only `&self` when invoking trait methods.
pub type CookieStoreHandle = Arc<dyn CookieStore + Send + Sync>;

/// `Expires` attribute format (`Tue, 19 Oct 2027 10:00:00 GMT`).
const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Formats `at` as an HTTP date, the way `Date.prototype.toUTCString()` does.
pub fn format_http_date(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(UtcOffset::UTC).format(HTTP_DATE)
}

/// Parses an `Expires` attribute value. Returns `None` for anything unrecognized.
pub fn parse_http_date(s: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(s.trim(), HTTP_DATE)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// A cookie as stored/serialized by a jar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (still percent-encoded).
    pub value: String,

    /// Path scoping (e.g., `"/"`).
    pub path: Option<String>,

    /// Domain scoping (host-only if `None`). Leading dot is stripped.
    pub domain: Option<String>,

    /// If `true`, cookie is sent only over HTTPS.
    pub secure: bool,

    /// Expiration timestamp as written (HTTP date). Session cookies have `None`.
    pub expires: Option<String>,

    /// SameSite policy (`"Strict"`, `"Lax"`, or `"None"`).
    pub same_site: Option<String>,

    /// If `true`, cookie is hidden from `document.cookie`.
    pub http_only: bool,
}

impl Cookie {
    /// Session cookie with only a name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            secure: false,
            expires: None,
            same_site: None,
            http_only: false,
        }
    }

    /// True when `expires` parses and lies at or before `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires
            .as_deref()
            .and_then(parse_http_date)
            .is_some_and(|at| at <= now)
    }
}
