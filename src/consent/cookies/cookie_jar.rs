//! Cookie jar abstraction and a simple in-memory implementation.
//!
//! A **cookie jar** represents the cookies visible to one document (one site).
//! Writes arrive as `Set-Cookie`-style strings, exactly what a script assigns
//! to `document.cookie`, and reads come back as the `name=value; ...` string.
//!
//! ## Notes & limitations
//! - Attributes handled: `Path`, `Domain`, `Expires`, `SameSite`, `Secure`,
//!   `HttpOnly`. `Max-Age` and size limits are not implemented.
//! - A write whose `Expires` lies in the past deletes the cookie. Cookies that
//!   expire while stored are hidden from every read and dropped by
//!   [`DefaultCookieJar::purge_expired`].
//! - This module is **not** internally synchronized. Use it via a
//!   `CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!
use crate::consent::cookies::Cookie;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;

/// A cookie jar keeps the cookies for one single document.
///
/// ### Type erasure
/// `as_any` / `as_any_mut` enable downcasting when callers need access to
/// concrete implementations (e.g., for snapshotting/persistence).
pub trait CookieJar: Send + Sync {
    /// Returns a type-erased reference to the jar.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable type-erased reference to the jar.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Applies a single `Set-Cookie` string (`name=value; path=/; ...`).
    ///
    /// A cookie with the same name is replaced as a whole ("last write wins").
    fn set_cookie(&mut self, set_cookie: &str);

    /// Returns the cookie named `name`, if any.
    fn get_cookie(&self, name: &str) -> Option<Cookie>;

    /// Returns the script-visible cookie string (`a=1; b=2`), skipping `HttpOnly` cookies.
    fn document_cookie(&self) -> String;

    /// All cookies, in insertion order. Intended for diagnostics/inspection.
    fn all_cookies(&self) -> Vec<Cookie>;

    /// Removes a single cookie by name.
    fn remove_cookie(&mut self, name: &str);

    /// Removes all cookies from the jar.
    fn clear(&mut self);
}

/// Default cookie jar which holds cookies for a single document.
///
/// This implementation is **in-memory only** and performs **no persistence**.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultCookieJar {
    /// Cookies in insertion order.
    pub entries: Vec<Cookie>,
}

impl DefaultCookieJar {
    /// Creates an empty in-memory cookie jar.
    pub fn new() -> Self {
        DefaultCookieJar { entries: Vec::new() }
    }

    /// Parses a `Set-Cookie` string. Returns `None` when there is no `name=`.
    pub fn parse_set_cookie(set_cookie: &str) -> Option<Cookie> {
        let mut parts = set_cookie.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, value.trim());

        for part in parts {
            let part = part.trim();
            if let Some((k, v)) = part.split_once('=') {
                let v = v.trim();
                match k.trim().to_ascii_lowercase().as_str() {
                    "path" => cookie.path = Some(v.to_string()),
                    "domain" => cookie.domain = Some(v.trim_start_matches('.').to_string()),
                    "expires" => cookie.expires = Some(v.to_string()),
                    "samesite" => {
                        // normalize to "Lax" | "Strict" | "None"
                        cookie.same_site = Some(if v.eq_ignore_ascii_case("lax") {
                            "Lax".to_string()
                        } else if v.eq_ignore_ascii_case("strict") {
                            "Strict".to_string()
                        } else if v.eq_ignore_ascii_case("none") {
                            "None".to_string()
                        } else {
                            v.to_string()
                        });
                    }
                    _ => {}
                }
            } else if part.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if part.eq_ignore_ascii_case("httponly") {
                cookie.http_only = true;
            }
        }

        if cookie.path.is_none() {
            cookie.path = Some("/".to_string());
        }

        Some(cookie)
    }

    /// Drops every cookie whose expiry lies at or before `now`. Returns how many were dropped.
    pub fn purge_expired(&mut self, now: OffsetDateTime) -> usize {
        let before = self.entries.len();
        self.entries.retain(|c| !c.is_expired(now));
        before - self.entries.len()
    }

    fn live(&self) -> impl Iterator<Item = &Cookie> {
        let now = OffsetDateTime::now_utc();
        self.entries.iter().filter(move |c| !c.is_expired(now))
    }
}

impl From<DefaultCookieJar> for Arc<RwLock<dyn CookieJar + Send + Sync>> {
    fn from(jar: DefaultCookieJar) -> Self {
        Arc::new(RwLock::new(jar))
    }
}

impl CookieJar for DefaultCookieJar {
    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }

    fn set_cookie(&mut self, set_cookie: &str) {
        let Some(cookie) = Self::parse_set_cookie(set_cookie) else {
            log::warn!("Consent[cookies]: ignoring malformed cookie write {:?}", set_cookie);
            return;
        };

        if cookie.is_expired(OffsetDateTime::now_utc()) {
            self.entries.retain(|c| c.name != cookie.name);
            return;
        }

        // Replace existing cookie with same name
        if let Some(existing) = self.entries.iter_mut().find(|c| c.name == cookie.name) {
            *existing = cookie;
        } else {
            self.entries.push(cookie);
        }
    }

    fn get_cookie(&self, name: &str) -> Option<Cookie> {
        self.live().find(|c| c.name == name).cloned()
    }

    fn document_cookie(&self) -> String {
        self.live()
            .filter(|c| !c.http_only)
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn all_cookies(&self) -> Vec<Cookie> {
        self.live().cloned().collect()
    }

    fn remove_cookie(&mut self, name: &str) {
        self.entries.retain(|c| c.name != name);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
