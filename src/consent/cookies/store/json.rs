//! JSON-backed cookie store.
//!
//! `JsonCookieStore` persists **all sites'** cookie jars in a single JSON file on disk.
//! Jars it returns are wrapped in [`PersistentCookieJar`], so that **every mutation**
//! to a jar triggers a snapshot write back to this store.
//!
//! ### Design
//! - One file for all sites (`CookieStoreFile { sites: HashMap<String, DefaultCookieJar> }`).
//! - In-memory cache: `jars: RwLock<HashMap<String, CookieJarHandle>>` for quick reuse.
//! - The store keeps a weak self handle so the persistent jars can call back into
//!   `persist_site_from_snapshot` without a reference cycle.
//!
//! ### I/O characteristics & caveats
//! - Every persist **reads then rewrites** the whole file. File writes are not atomic.
//! - I/O and serialization errors after construction are logged, never raised.
//! - Cookies already expired on disk are dropped when a site's jar is first loaded.
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, Weak};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::consent::cookies::cookie_jar::DefaultCookieJar;
use crate::consent::cookies::persistent_cookie_jar::PersistentCookieJar;
use crate::consent::cookies::store::CookieStore;
use crate::consent::cookies::CookieJarHandle;
use crate::consent::errors::ConsentError;
use time::OffsetDateTime;

/// On-disk representation of all sites' cookie jars.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieStoreFile {
    sites: HashMap<String, DefaultCookieJar>,
}

/// A JSON-based cookie store that persists cookies across page loads.
pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,

    /// Cookie jars per site
    jars: RwLock<HashMap<String, CookieJarHandle>>,

    /// Self handle, so `PersistentCookieJar` can call back into this store.
    store_self: Weak<JsonCookieStore>,
}

impl JsonCookieStore {
    /// Creates (or opens) a JSON cookie store at `path`.
    ///
    /// If the file does not exist, an empty structure is written to disk.
    pub fn new(path: PathBuf) -> Result<Arc<Self>, ConsentError> {
        if !path.exists() {
            let empty = serde_json::to_vec(&CookieStoreFile::default())?;
            fs::write(&path, empty)?;
        }

        Ok(Arc::new_cyclic(|store_self| Self {
            path,
            jars: RwLock::new(HashMap::new()),
            store_self: store_self.clone(),
        }))
    }

    /// Loads and deserializes the full cookie store file.
    ///
    /// A file that doesn't deserialize is treated as empty.
    fn load_file(&self) -> anyhow::Result<CookieStoreFile> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading cookie store {}", self.path.display()))?;

        Ok(serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("Consent[cookies]: cookie store {} is corrupt ({}), starting empty", self.path.display(), e);
            CookieStoreFile::default()
        }))
    }

    /// Serializes and writes the full cookie store file (pretty-printed).
    fn save_file(&self, store_file: &CookieStoreFile) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(store_file).context("serializing cookies")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("writing cookie store {}", self.path.display()))?;
        Ok(())
    }

    fn update_file(&self, f: impl FnOnce(&mut CookieStoreFile)) {
        let result = self.load_file().and_then(|mut file| {
            f(&mut file);
            self.save_file(&file)
        });
        if let Err(e) = result {
            log::error!("Consent[cookies]: {:#}", e);
        }
    }
}

impl CookieStore for JsonCookieStore {
    /// Returns the cookie jar handle for `site`, loading it from disk on first use.
    fn jar_for(&self, site: &str) -> Option<CookieJarHandle> {
        {
            // Fast path: already in memory
            let jars = self.jars.read().ok()?;
            if let Some(jar) = jars.get(site) {
                return Some(jar.clone());
            }
        }

        let mut jar = match self.load_file() {
            Ok(mut file) => file.sites.remove(site).unwrap_or_default(),
            Err(e) => {
                log::error!("Consent[cookies]: {:#}", e);
                DefaultCookieJar::new()
            }
        };
        let purged = jar.purge_expired(OffsetDateTime::now_utc());
        if purged > 0 {
            log::debug!("Consent[cookies]: dropped {} expired cookies for {}", purged, site);
        }
        let inner: CookieJarHandle = jar.into();

        let store: Weak<dyn CookieStore + Send + Sync> = self.store_self.clone();
        let persistent: CookieJarHandle = Arc::new(RwLock::new(PersistentCookieJar::new(site, inner, store)));

        self.jars.write().ok()?.insert(site.to_string(), persistent.clone());

        Some(persistent)
    }

    fn persist_site_from_snapshot(&self, site: &str, snapshot: &DefaultCookieJar) {
        self.update_file(|file| {
            file.sites.insert(site.to_string(), snapshot.clone());
        });
    }

    fn remove_site(&self, site: &str) {
        if let Ok(mut jars) = self.jars.write() {
            jars.remove(site);
        }
        self.update_file(|file| {
            file.sites.remove(site);
        });
    }
}
