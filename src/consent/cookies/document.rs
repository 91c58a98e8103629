//! Script-level cookie access.
//!
//! [`DocumentCookies`] is the only write path the consent code uses. It mirrors
//! reading and assigning `document.cookie`:
//! - [`read`](DocumentCookies::read) finds a cookie by its **exact** name in the
//!   document cookie string and percent-decodes it.
//! - [`write`](DocumentCookies::write) builds one `Set-Cookie` string and hands it
//!   to the jar, replacing the whole value of that one cookie.
//!
//! The two CMP cookies carry structured values (`groups=1:1,4:0`), so their
//! commas and colons are percent-encoded before writing.

use crate::consent::cookies::{format_http_date, CookieJarHandle};
use crate::consent::errors::ConsentError;
use crate::consent::{CMP_BANNER_CLOSED_COOKIE, CMP_CONSENT_COOKIE};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;
use time::OffsetDateTime;

/// Characters encoded in structured CMP cookie values.
const STRUCTURED_VALUE: &AsciiSet = &CONTROLS.add(b',').add(b':');

/// Attributes for a single cookie write.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieWriteOptions {
    pub path: String,
    /// Inserted verbatim after `domain=`. Callers may append flags here,
    /// e.g. `.intuit.com; Samesite=None; secure`.
    pub domain: Option<String>,
    pub expires: Option<OffsetDateTime>,
}

impl Default for CookieWriteOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            expires: None,
        }
    }
}

impl CookieWriteOptions {
    pub fn new(domain: Option<String>, expires: Option<OffsetDateTime>) -> Self {
        Self { domain, expires, ..Self::default() }
    }
}

/// Encodes `value` for storage under `name`.
///
/// Only `OptanonConsent` and `OptanonAlertBoxClosed` are encoded; everything
/// else is written as-is.
pub fn encode_value<'a>(name: &str, value: &'a str) -> Cow<'a, str> {
    if name == CMP_CONSENT_COOKIE || name == CMP_BANNER_CLOSED_COOKIE {
        utf8_percent_encode(value, STRUCTURED_VALUE).into()
    } else {
        Cow::Borrowed(value)
    }
}

/// Builds the `Set-Cookie` string for a write.
pub fn build_cookie_string(
    name: &str,
    value: &str,
    options: &CookieWriteOptions,
) -> Result<String, ConsentError> {
    let mut s = format!("{}={}; path={}", name, encode_value(name, value), options.path);
    if let Some(domain) = &options.domain {
        s.push_str("; domain=");
        s.push_str(domain);
    }
    if let Some(expires) = options.expires {
        s.push_str("; expires=");
        s.push_str(&format_http_date(expires)?);
    }
    Ok(s)
}

/// Cookie access for one document, backed by a [`CookieJarHandle`].
#[derive(Clone)]
pub struct DocumentCookies {
    jar: CookieJarHandle,
}

impl std::fmt::Debug for DocumentCookies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCookies")
            .field("jar", &"Arc<RwLock<dyn CookieJar>>")
            .finish()
    }
}

impl DocumentCookies {
    pub fn new(jar: CookieJarHandle) -> Self {
        Self { jar }
    }

    pub fn jar(&self) -> CookieJarHandle {
        self.jar.clone()
    }

    /// Returns the decoded value of `name`, or `None` when absent.
    ///
    /// Matching is on the full name, so `ccpa` never matches `ccpa_legacy`.
    pub fn read(&self, name: &str) -> Result<Option<String>, ConsentError> {
        let document_cookie = self.jar.read().map_err(|_| ConsentError::Poisoned)?.document_cookie();

        let value = document_cookie
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| k.trim() == name)
            .map(|(_, v)| decode_value(v.trim()));

        Ok(value)
    }

    /// Returns true when `name` is present.
    pub fn exists(&self, name: &str) -> Result<bool, ConsentError> {
        Ok(self.read(name)?.is_some())
    }

    /// Writes a single cookie, replacing its whole value. Returns the string written.
    pub fn write(&self, name: &str, value: &str, options: &CookieWriteOptions) -> Result<String, ConsentError> {
        let cookie_string = build_cookie_string(name, value, options)?;
        log::debug!("Consent[cookies]: writing {}", cookie_string);

        self.jar
            .write()
            .map_err(|_| ConsentError::Poisoned)?
            .set_cookie(&cookie_string);

        Ok(cookie_string)
    }

    /// Removes `name` from the jar.
    pub fn remove(&self, name: &str) -> Result<(), ConsentError> {
        self.jar
            .write()
            .map_err(|_| ConsentError::Poisoned)?
            .remove_cookie(name);
        Ok(())
    }
}

/// Percent-decodes a raw cookie value, keeping the raw text if it isn't valid UTF-8.
fn decode_value(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}
