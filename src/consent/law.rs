//! Regional law configuration and the external consent utility.
//!
//! A [`LawConfig`] says which checkboxes a region presents and which backend
//! endpoints receive consent submissions. The hosting page may provide a
//! [`ConsentUtility`] that knows the active config for the visitor's geo; when
//! it doesn't, [`LawConfig::default`] (US / CCPA) applies.

use crate::consent::preferences::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

const DEFAULT_ENDPOINTS: [&str; 5] = [
    "https://accounts.intuit.com/privacy/consent/v1/sync",
    "https://quickbooks.intuit.com/privacy/consent/v1/sync",
    "https://turbotax.intuit.com/privacy/consent/v1/sync",
    "https://proconnect.intuit.com/privacy/consent/v1/sync",
    "https://mint.intuit.com/privacy/consent/v1/sync",
];

/// One checkbox of the consent form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkbox {
    /// Category id (`essential`, `advertising`).
    pub value: String,
    #[serde(default)]
    pub essential: bool,
    #[serde(default)]
    pub default_checked: bool,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LawConfig {
    pub regions: Vec<String>,
    pub endpoints: Vec<String>,
    pub checkboxes: Vec<Checkbox>,
}

impl Default for LawConfig {
    /// US region, CCPA checkboxes, the five sync endpoints.
    fn default() -> Self {
        Self {
            regions: vec!["US".to_string()],
            endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            checkboxes: vec![
                Checkbox {
                    value: Category::Essential.id().to_string(),
                    essential: true,
                    default_checked: true,
                    label: Some("Strictly necessary".to_string()),
                },
                Checkbox {
                    value: Category::Advertising.id().to_string(),
                    essential: false,
                    default_checked: true,
                    label: Some("Advertising".to_string()),
                },
            ],
        }
    }
}

impl LawConfig {
    /// Endpoints that parse as URLs. Invalid entries are logged and skipped.
    pub fn endpoint_urls(&self) -> Vec<Url> {
        self.endpoints
            .iter()
            .filter_map(|e| match Url::parse(e) {
                Ok(url) => Some(url),
                Err(err) => {
                    log::warn!("Consent[law]: skipping invalid endpoint {:?}: {}", e, err);
                    None
                }
            })
            .collect()
    }
}

/// Payload handed to [`ConsentUtility::submit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSubmission {
    pub id: Uuid,
    pub cookie_name: String,
    pub endpoints: Vec<Url>,
    pub preferences: BTreeMap<String, bool>,
}

/// Geo/consent utility provided by the hosting page.
pub trait ConsentUtility: Send + Sync {
    /// Active law config for the visitor, if the utility knows it.
    fn law_config(&self, cookie_name: &str) -> Option<LawConfig>;

    /// Sends the mapped preferences to the sync endpoints.
    ///
    /// May call back into [`ConsentToolHandle::on_consent_changed`](crate::consent::bootstrap::ConsentToolHandle::on_consent_changed);
    /// such a call returns `SyncOutcome::Deferred` and is replayed after the current sync.
    fn submit(&self, submission: &ConsentSubmission) -> anyhow::Result<()>;
}

/// Resolves the [`LawConfig`] for a cookie, fresh on every call.
#[derive(Clone, Default)]
pub struct LawConfigResolver {
    utility: Option<Arc<dyn ConsentUtility>>,
}

impl std::fmt::Debug for LawConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LawConfigResolver")
            .field("utility", &self.utility.is_some())
            .finish()
    }
}

impl LawConfigResolver {
    pub fn new(utility: Option<Arc<dyn ConsentUtility>>) -> Self {
        Self { utility }
    }

    pub fn resolve(&self, cookie_name: &str) -> LawConfig {
        match self.utility.as_ref().and_then(|u| u.law_config(cookie_name)) {
            Some(config) => config,
            None => {
                log::debug!("Consent[law]: no law config for {}, using US default", cookie_name);
                LawConfig::default()
            }
        }
    }
}
