use consent_sync::cookies::{
    CookieStore, CookieWriteOptions, DocumentCookies, InMemoryCookieStore, JsonCookieStore,
};
use consent_sync::law::{ConsentSubmission, ConsentUtility, LawConfig};
use consent_sync::preferences::{ConsentFlag, IntuitPreferences};
use consent_sync::sync::{InitOutcome, SuppressReason, SyncOutcome};
use consent_sync::{
    register, ConsentEvent, ConsentToolHandle, DataLayer, PageContext, SyncConfig, SyncServices,
    CMP_CONSENT_COOKIE, PRE_AUTH_CONSENT_COOKIE,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SITE: &str = "accounts.intuit.com";

/// Stands in for the backend: every submission sets the Intuit cookie.
struct BackendUtility {
    cookies: DocumentCookies,
    submitted: Mutex<Vec<ConsentSubmission>>,
}

impl ConsentUtility for BackendUtility {
    fn law_config(&self, _cookie_name: &str) -> Option<LawConfig> {
        Some(LawConfig::default())
    }

    fn submit(&self, submission: &ConsentSubmission) -> anyhow::Result<()> {
        let advertising = submission.preferences.get("advertising").copied().unwrap_or(true);
        let value = IntuitPreferences::new(ConsentFlag::from_bool(advertising)).encode();
        self.cookies
            .write(&submission.cookie_name, &value, &CookieWriteOptions::default())?;
        self.submitted.lock().unwrap().push(submission.clone());
        Ok(())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One page load. The store must outlive the handle for writes to reach disk.
struct PageLoad {
    _store: Arc<JsonCookieStore>,
    handle: ConsentToolHandle,
    cookies: DocumentCookies,
    utility: Arc<BackendUtility>,
    outcome: InitOutcome,
}

/// Opens the store, registers the tool and lets the CMP load.
fn page_load(path: &Path) -> PageLoad {
    let store = JsonCookieStore::new(path.to_path_buf()).unwrap();
    let jar = store.jar_for(SITE).unwrap();
    let cookies = DocumentCookies::new(jar.clone());

    let utility = Arc::new(BackendUtility {
        cookies: cookies.clone(),
        submitted: Mutex::new(Vec::new()),
    });
    let page = PageContext::new(format!("https://{SITE}/app/sign-in").parse().unwrap());
    let services = SyncServices::new(jar, page).with_utility(utility.clone());

    let handle = register(services, SyncConfig::default(), DataLayer::new());
    let outcome = handle.on_cmp_loaded().unwrap();
    PageLoad { _store: store, handle, cookies, utility, outcome }
}

#[test]
fn consent_follows_the_user_across_page_loads() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.json");

    // Seed a CMP choice made before any Intuit cookie existed
    {
        let store = JsonCookieStore::new(path.clone()).unwrap();
        let cookies = DocumentCookies::new(store.jar_for(SITE).unwrap());
        cookies
            .write(CMP_CONSENT_COOKIE, "isGpcEnabled=0&groups=1:1,4:0", &CookieWriteOptions::default())
            .unwrap();
    }

    // 1st load: no Intuit cookie, so the CMP choice is synced to the backend
    let first = page_load(&path);
    let PageLoad { cookies, utility, outcome, .. } = &first;
    assert!(matches!(outcome, InitOutcome::Synced(SyncOutcome::Submitted(_))));
    assert_eq!(utility.submitted.lock().unwrap().len(), 1);
    assert_eq!(cookies.read("ccpa").unwrap().as_deref(), Some("1|0"));

    // 2nd load: both cookies agree, nothing to write
    let second = page_load(&path);
    let PageLoad { handle, cookies, utility, outcome, .. } = &second;
    assert_eq!(*outcome, InitOutcome::CopiedFromIntuit { written: false });
    assert!(utility.submitted.lock().unwrap().is_empty());

    // the user opts back in through the CMP
    let mut events = handle.subscribe();
    cookies
        .write(CMP_CONSENT_COOKIE, "isGpcEnabled=0&groups=1:1,4:1", &CookieWriteOptions::default())
        .unwrap();
    let outcome = handle.on_consent_changed().unwrap();
    assert!(matches!(outcome, SyncOutcome::Submitted(_)));
    assert!(matches!(events.try_recv().unwrap(), ConsentEvent::ConsentChanged { .. }));
    assert_eq!(cookies.read("ccpa").unwrap().as_deref(), Some("1|1"));
    assert_eq!(cookies.read(PRE_AUTH_CONSENT_COOKIE).unwrap().as_deref(), Some("true"));

    // 3rd load: the pre-auth marker suppresses the banner
    let third = page_load(&path);
    let PageLoad { cookies, utility, outcome, .. } = &third;
    assert_eq!(*outcome, InitOutcome::Suppressed(SuppressReason::PreAuthConsent));
    assert!(utility.submitted.lock().unwrap().is_empty());
    assert!(cookies.read("OptanonAlertBoxClosed").unwrap().is_some());
    assert_eq!(
        cookies.read(CMP_CONSENT_COOKIE).unwrap().as_deref(),
        Some("isGpcEnabled=0&groups=1:1,4:1")
    );
}

#[test]
fn intuit_choice_seeds_a_fresh_cmp_cookie() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.json");

    {
        let store = JsonCookieStore::new(path.clone()).unwrap();
        let cookies = DocumentCookies::new(store.jar_for(SITE).unwrap());
        cookies.write("cpra", "1|0", &CookieWriteOptions::default()).unwrap();
    }

    let PageLoad { handle, cookies, outcome, .. } = page_load(&path);
    assert_eq!(outcome, InitOutcome::CopiedFromIntuit { written: true });
    assert_eq!(cookies.read(CMP_CONSENT_COOKIE).unwrap().as_deref(), Some("groups=1:1,4:0"));

    let loaded = handle.data_layer().entries().unwrap();
    assert_eq!(loaded[0]["cookieName"], "cpra");
}

#[test]
fn expired_pre_auth_marker_no_longer_suppresses() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.json");

    // a pacflag written long ago, still sitting in the file
    let seeded = serde_json::json!({
        "sites": {
            "accounts.intuit.com": {
                "entries": [
                    {
                        "name": "pacflag", "value": "true", "path": "/", "domain": null,
                        "secure": false, "expires": "Thu, 01 Jan 2026 00:00:00 GMT",
                        "same_site": null, "http_only": false
                    },
                    {
                        "name": "OptanonConsent", "value": "groups=1%3A1%2C4%3A0", "path": "/", "domain": null,
                        "secure": false, "expires": "Fri, 01 Jan 2100 00:00:00 GMT",
                        "same_site": null, "http_only": false
                    }
                ]
            }
        }
    });
    std::fs::write(&path, seeded.to_string()).unwrap();

    let PageLoad { cookies, utility, outcome, .. } = page_load(&path);
    assert!(matches!(outcome, InitOutcome::Synced(SyncOutcome::Submitted(_))));
    assert_eq!(cookies.read(PRE_AUTH_CONSENT_COOKIE).unwrap(), None);
    assert_eq!(utility.submitted.lock().unwrap()[0].preferences["advertising"], false);
}

#[test]
fn private_session_shares_one_jar_per_site() {
    init_logging();
    let store = InMemoryCookieStore::new();
    let open = |store: &InMemoryCookieStore| {
        let jar = store.jar_for(SITE).unwrap();
        let page = PageContext::new(format!("https://{SITE}/").parse().unwrap());
        register(SyncServices::new(jar, page), SyncConfig::default(), DataLayer::new())
    };

    let first = open(&store);
    assert_eq!(first.on_cmp_loaded().unwrap(), InitOutcome::Synced(SyncOutcome::NoUtility));
    assert_eq!(first.on_consent_changed().unwrap(), SyncOutcome::NoUtility);

    // a second tab on the same site sees the marker the first one wrote
    let second = open(&store);
    assert_eq!(
        second.on_cmp_loaded().unwrap(),
        InitOutcome::Suppressed(SuppressReason::PreAuthConsent)
    );

    // other sites start clean
    let other = store.jar_for("quickbooks.intuit.com").unwrap();
    assert!(!DocumentCookies::new(other).exists(PRE_AUTH_CONSENT_COOKIE).unwrap());
}
