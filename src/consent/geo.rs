//! Geo cookies (read-only).
//!
//! The edge sets `AKES_GEO` to `<country>~<region>` (e.g. `US~CA`);
//! `AKES_GEO_OVERRIDE` takes precedence when present.

use crate::consent::cookies::DocumentCookies;
use crate::consent::errors::ConsentError;

pub const GEO_OVERRIDE_COOKIE: &str = "AKES_GEO_OVERRIDE";
pub const GEO_COOKIE: &str = "AKES_GEO";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: String,
    pub region: Option<String>,
}

impl GeoLocation {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().splitn(2, '~');
        let country = parts.next()?.trim();
        if country.is_empty() {
            return None;
        }
        let region = parts
            .next()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_ascii_uppercase);

        Some(Self {
            country: country.to_ascii_uppercase(),
            region,
        })
    }

    /// Reads the override cookie, then the regular geo cookie.
    pub fn from_cookies(cookies: &DocumentCookies) -> Result<Option<Self>, ConsentError> {
        for name in [GEO_OVERRIDE_COOKIE, GEO_COOKIE] {
            if let Some(geo) = cookies.read(name)?.as_deref().and_then(Self::parse) {
                return Ok(Some(geo));
            }
        }
        Ok(None)
    }

    /// True when any entry names this country (`US`) or country and region (`US-CA`).
    pub fn is_in(&self, regions: &[String]) -> bool {
        regions.iter().any(|entry| match entry.split_once('-') {
            Some((country, region)) => {
                country.eq_ignore_ascii_case(&self.country)
                    && self.region.as_deref().is_some_and(|r| r.eq_ignore_ascii_case(region))
            }
            None => entry.eq_ignore_ascii_case(&self.country),
        })
    }
}
