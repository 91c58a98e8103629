use crate::consent::cookies::cookie_jar::DefaultCookieJar;
use crate::consent::cookies::store::CookieStore;
use crate::consent::cookies::{Cookie, CookieJar, CookieJarHandle};
use std::sync::Weak;

/// A `CookieJar` decorator that persists changes after each mutation.
///
/// This type is *transparent* for reads but *eagerly* persists after writes.
pub struct PersistentCookieJar {
    /// Site this jar belongs to (used to address the store).
    site: String,
    /// Inner cookie jar that holds the actual cookie state.
    pub inner: CookieJarHandle,
    /// Store responsible for persistence. Weak, since the store caches this jar.
    store_handle: Weak<dyn CookieStore + Send + Sync>,
}

impl PersistentCookieJar {
    /// Creates a new persistence-enabled wrapper around an existing jar.
    pub fn new(site: impl Into<String>, jar: CookieJarHandle, store_handle: Weak<dyn CookieStore + Send + Sync>) -> Self {
        Self {
            site: site.into(),
            inner: jar,
            store_handle,
        }
    }

    /// Snapshots the inner jar and persists it to the backing store.
    ///
    /// Skipped (with a log line) when the inner jar isn't a [`DefaultCookieJar`]
    /// or the store has been dropped.
    fn persist(&self) {
        let snapshot = match self.inner.read() {
            Ok(inner) => inner.as_any().downcast_ref::<DefaultCookieJar>().cloned(),
            Err(_) => None,
        };
        let Some(snapshot) = snapshot else {
            log::warn!("Consent[cookies]: cannot snapshot jar for {}", self.site);
            return;
        };

        match self.store_handle.upgrade() {
            Some(store) => store.persist_site_from_snapshot(&self.site, &snapshot),
            None => log::debug!("Consent[cookies]: store for {} is gone, not persisting", self.site),
        }
    }
}

impl CookieJar for PersistentCookieJar {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    /// Applies the write, then persists the updated state.
    fn set_cookie(&mut self, set_cookie: &str) {
        if let Ok(mut inner) = self.inner.write() {
            inner.set_cookie(set_cookie);
        }
        self.persist();
    }

    fn get_cookie(&self, name: &str) -> Option<Cookie> {
        self.inner.read().ok()?.get_cookie(name)
    }

    fn document_cookie(&self) -> String {
        self.inner.read().map(|j| j.document_cookie()).unwrap_or_default()
    }

    fn all_cookies(&self) -> Vec<Cookie> {
        self.inner.read().map(|j| j.all_cookies()).unwrap_or_default()
    }

    /// Removes a single cookie by name, then persists the updated state.
    fn remove_cookie(&mut self, name: &str) {
        if let Ok(mut inner) = self.inner.write() {
            inner.remove_cookie(name);
        }
        self.persist();
    }

    /// Clears all cookies in the jar, then persists the updated state.
    fn clear(&mut self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.clear();
        }
        self.persist();
    }
}
