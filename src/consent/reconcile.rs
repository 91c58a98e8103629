//! Reconciliation between the Intuit and CMP consent records.
//!
//! - [`should_sync`] decides whether the two records disagree.
//! - [`copy_cookie_preferences`] merges Intuit → CMP (Intuit is authoritative).
//! - [`map_cmp_to_intuit_preferences`] maps CMP → the law config's checkboxes.
//!
//! Unknown state on either side is treated as "needs sync" and, when a value has
//! to be chosen, as opted in. Essential is always enabled.

use crate::consent::law::LawConfig;
use crate::consent::preferences::{Category, CategoryMap, CmpConsent, ConsentFlag, IntuitPreferences};
use std::collections::BTreeMap;

/// Result of merging preferences into a cookie value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieUpdate {
    /// The cookie already holds the merged value.
    Unchanged,
    /// The cookie must be replaced with this value.
    Write(String),
}

impl CookieUpdate {
    pub fn value(&self) -> Option<&str> {
        match self {
            CookieUpdate::Unchanged => None,
            CookieUpdate::Write(v) => Some(v),
        }
    }
}

/// Whether the Intuit advertising flag and the CMP advertising membership disagree.
///
/// | intuit      | cmp active | sync |
/// |-------------|------------|------|
/// | `0`         | yes        | yes  |
/// | `1`         | no         | yes  |
/// | `0`         | no         | no   |
/// | `1`         | yes        | no   |
/// | unknown     | any        | yes  |
/// | any         | unknown    | yes  |
pub fn should_sync(intuit_advertising: Option<ConsentFlag>, cmp_advertising_active: Option<bool>) -> bool {
    match (intuit_advertising, cmp_advertising_active) {
        (Some(ConsentFlag::Disabled), Some(true)) => true,
        (Some(ConsentFlag::Enabled), Some(false)) => true,
        (None, _) | (_, None) => true,
        (Some(flag), Some(active)) => flag.is_enabled() != active,
    }
}

/// Merges the Intuit preferences into the CMP cookie value.
///
/// - no CMP cookie: a fresh `groups=1:1,4:<adv>`
/// - CMP cookie without `groups`: the segment is appended
/// - CMP cookie with `groups`: essential forced to `1`, advertising overwritten
///
/// Every other segment and category is preserved.
pub fn copy_cookie_preferences(intuit: &IntuitPreferences, cmp_raw: Option<&str>) -> CookieUpdate {
    let advertising = intuit.advertising.unwrap_or(ConsentFlag::Enabled);

    let Some(raw) = cmp_raw else {
        return CookieUpdate::Write(CmpConsent::with_defaults(advertising).to_string());
    };

    let mut consent = CmpConsent::parse(raw);
    consent.set_flag(CategoryMap::cmp_number(Category::Essential), ConsentFlag::Enabled);
    consent.set_flag(CategoryMap::cmp_number(Category::Advertising), advertising);

    let merged = consent.to_string();
    if merged == raw {
        CookieUpdate::Unchanged
    } else {
        CookieUpdate::Write(merged)
    }
}

/// Maps the CMP's active categories onto the law config's checkboxes.
///
/// Essential checkboxes are always `true`. With no active-category signal at
/// all every checkbox is `true`.
pub fn map_cmp_to_intuit_preferences(law: &LawConfig, active: Option<&[String]>) -> BTreeMap<String, bool> {
    law.checkboxes
        .iter()
        .map(|checkbox| {
            let enabled = if checkbox.essential {
                true
            } else {
                match active {
                    None => true,
                    Some(active) => CategoryMap::to_cmp(&checkbox.value)
                        .is_some_and(|number| active.iter().any(|a| a == number)),
                }
            };
            (checkbox.value.clone(), enabled)
        })
        .collect()
}
