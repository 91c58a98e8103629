//! Sync configuration.
//!
//! `SyncConfig` controls how a [`SyncOrchestrator`](crate::consent::sync::SyncOrchestrator)
//! writes cookies and which sync paths are active. Sensible defaults are
//! provided via [`Default`]; [`SyncConfig::builder()`] customizes with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use consent_sync::config::{PrivacySignalPolicy, SyncConfig};
//! let cfg = SyncConfig::default();
//! assert_eq!(cfg.default_intuit_cookie, "ccpa");
//! assert_eq!(cfg.privacy_signal_policy, PrivacySignalPolicy::Disabled);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use consent_sync::config::SyncConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = SyncConfig::builder()
//!     .cookie_domain(".intuit.com; Samesite=None; secure")
//!     .default_intuit_cookie("cpra")
//!     .deny_host_pattern(r"(^|\.)example\.org$")
//!     .build()?; // returns Result<SyncConfig, SyncConfigError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `cookie_domain`: Domain attribute for every cookie write. Written bit-for-bit, so it
//!   may carry extra attributes such as `Samesite=None; secure`.
//! - `default_intuit_cookie`: Intuit cookie name used when none exists yet (default `ccpa`).
//! - `denylist_patterns`: Host regexes of products that manage consent elsewhere.
//! - `consent_cookie_ttl`: Lifetime of Intuit and `OptanonConsent` writes (default 365 days).
//! - `banner_closed_ttl`: Lifetime of `OptanonAlertBoxClosed` writes (default 365 days).
//! - `pre_auth_ttl`: Lifetime of the `pacflag` marker (default 30 days).
//! - `privacy_signal_policy`: Whether a browser privacy signal forces an opt-out.
//! - `privacy_signal_regions`: Geo countries where the privacy signal applies.
//!
//! # Errors
//!
//! Builder validation returns [`SyncConfigError`] for an unknown Intuit cookie name,
//! a denylist pattern that does not compile, or a non-positive TTL.

use crate::consent::INTUIT_COOKIE_NAMES;
use regex::Regex;
use std::fmt;
use time::Duration;

/// What to do when the page reports a browser-level privacy signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivacySignalPolicy {
    /// The signal is never honored; the opt-out path always reports "not opted out".
    #[default]
    Disabled,
    /// The signal forces an opted-out state in configured regions.
    Enforced,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub cookie_domain: Option<String>,
    pub default_intuit_cookie: String,
    pub denylist_patterns: Vec<String>,
    pub consent_cookie_ttl: Duration,
    pub banner_closed_ttl: Duration,
    pub pre_auth_ttl: Duration,
    pub privacy_signal_policy: PrivacySignalPolicy,
    pub privacy_signal_regions: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cookie_domain: None,
            default_intuit_cookie: crate::consent::DEFAULT_INTUIT_COOKIE.to_string(),
            denylist_patterns: vec![
                r"(^|\.)mailchimp\.com$".to_string(),
                r"(^|\.)creditkarma\.com$".to_string(),
            ],
            consent_cookie_ttl: Duration::days(365),
            banner_closed_ttl: Duration::days(365),
            pre_auth_ttl: Duration::days(30),
            privacy_signal_policy: PrivacySignalPolicy::Disabled,
            privacy_signal_regions: vec!["US".to_string()],
        }
    }
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Compiles the host denylist.
    pub fn denylist(&self) -> Result<Vec<Regex>, SyncConfigError> {
        self.denylist_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| SyncConfigError::InvalidPattern {
                pattern: p.clone(),
                reason: e.to_string(),
            }))
            .collect()
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    inner: SyncConfig,
}

impl SyncConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut SyncConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn cookie_domain<S: Into<String>>(self, domain: S) -> Self { self.map(|c| c.cookie_domain = Some(domain.into())) }
    pub fn default_intuit_cookie<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.default_intuit_cookie = name.into()) }
    pub fn deny_host_pattern<S: Into<String>>(self, pattern: S) -> Self { self.map(|c| c.denylist_patterns.push(pattern.into())) }
    pub fn clear_denylist(self) -> Self { self.map(|c| c.denylist_patterns.clear()) }
    pub fn consent_cookie_ttl(self, ttl: Duration) -> Self { self.map(|c| c.consent_cookie_ttl = ttl) }
    pub fn banner_closed_ttl(self, ttl: Duration) -> Self { self.map(|c| c.banner_closed_ttl = ttl) }
    pub fn pre_auth_ttl(self, ttl: Duration) -> Self { self.map(|c| c.pre_auth_ttl = ttl) }
    pub fn privacy_signal_policy(self, policy: PrivacySignalPolicy) -> Self { self.map(|c| c.privacy_signal_policy = policy) }
    pub fn privacy_signal_regions(self, regions: Vec<String>) -> Self { self.map(|c| c.privacy_signal_regions = regions) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut SyncConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<SyncConfig, SyncConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum SyncConfigError {
    UnknownIntuitCookie(String),
    InvalidPattern { pattern: String, reason: String },
    NonPositiveTtl(&'static str),
}

impl fmt::Display for SyncConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncConfigError::UnknownIntuitCookie(name) =>
                write!(f, "intuit cookie name {name:?} is not one of {}", INTUIT_COOKIE_NAMES.join("|")),
            SyncConfigError::InvalidPattern { pattern, reason } =>
                write!(f, "denylist pattern {pattern:?} does not compile: {reason}"),
            SyncConfigError::NonPositiveTtl(field) =>
                write!(f, "{field} must be positive"),
        }
    }
}
impl std::error::Error for SyncConfigError {}

fn validate(c: &SyncConfig) -> Result<(), SyncConfigError> {
    if !INTUIT_COOKIE_NAMES.contains(&c.default_intuit_cookie.as_str()) {
        return Err(SyncConfigError::UnknownIntuitCookie(c.default_intuit_cookie.clone()));
    }
    c.denylist()?;
    for (field, ttl) in [
        ("consent_cookie_ttl", c.consent_cookie_ttl),
        ("banner_closed_ttl", c.banner_closed_ttl),
        ("pre_auth_ttl", c.pre_auth_ttl),
    ] {
        if !ttl.is_positive() {
            return Err(SyncConfigError::NonPositiveTtl(field));
        }
    }
    Ok(())
}
