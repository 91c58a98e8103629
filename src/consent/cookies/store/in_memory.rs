use std::collections::HashMap;
use std::sync::RwLock;

use crate::consent::cookies::cookie_jar::DefaultCookieJar;
use crate::consent::cookies::store::CookieStore;
use crate::consent::cookies::CookieJarHandle;

#[derive(Default)]
pub struct InMemoryCookieStore {
    /// Cookie jars per site
    jars: RwLock<HashMap<String, CookieJarHandle>>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for InMemoryCookieStore {
    fn jar_for(&self, site: &str) -> Option<CookieJarHandle> {
        let mut jars = self.jars.write().ok()?;
        let handle = jars
            .entry(site.to_string())
            .or_insert_with(|| DefaultCookieJar::new().into())
            .clone();
        Some(handle)
    }

    fn persist_site_from_snapshot(&self, _site: &str, _snapshot: &DefaultCookieJar) {}

    fn remove_site(&self, site: &str) {
        if let Ok(mut jars) = self.jars.write() {
            jars.remove(site);
        }
    }
}
