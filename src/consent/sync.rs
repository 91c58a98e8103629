//! Sync orchestration for one page lifecycle.
//!
//! ```text
//! Init ──► Suppressed                     (pacflag, or Intuit full opt-out)
//!   │
//!   └────► Syncing ──► Idle               (privacy signal, Intuit → CMP copy,
//!                                          denylisted host, or full sync)
//! ```
//!
//! [`SyncOrchestrator::initialize`] runs once per page load, and
//! [`SyncOrchestrator::on_consent_changed`] re-enters whenever the CMP reports
//! a user change. Nothing here blocks on the network: submissions go through the
//! page's [`ConsentUtility`] and failures are logged, not returned.

use crate::consent::config::{PrivacySignalPolicy, SyncConfig};
use crate::consent::cookies::{CookieJarHandle, CookieWriteOptions, DocumentCookies};
use crate::consent::errors::ConsentError;
use crate::consent::events::{ConsentEvent, EventBus};
use crate::consent::geo::GeoLocation;
use crate::consent::law::{ConsentSubmission, ConsentUtility, LawConfig, LawConfigResolver};
use crate::consent::preferences::{Category, CmpConsent, ConsentFlag, IntuitPreferences};
use crate::consent::reconcile::{copy_cookie_preferences, map_cmp_to_intuit_preferences, should_sync, CookieUpdate};
use crate::consent::{
    CMP_BANNER_CLOSED_COOKIE, CMP_CONSENT_COOKIE, INTUIT_COOKIE_NAMES, PRE_AUTH_CONSENT_COOKIE,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use url::Url;
use uuid::Uuid;

/// What the hosting page tells us about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContext {
    pub url: Url,
    /// Browser-level privacy signal (Global Privacy Control / Do Not Track).
    pub privacy_signal: bool,
}

impl PageContext {
    pub fn new(url: Url) -> Self {
        Self { url, privacy_signal: false }
    }

    pub fn with_privacy_signal(mut self, on: bool) -> Self {
        self.privacy_signal = on;
        self
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

/// Collaborators the orchestrator works with.
#[derive(Clone)]
pub struct SyncServices {
    pub cookies: DocumentCookies,
    pub utility: Option<Arc<dyn ConsentUtility>>,
    pub events: EventBus,
    pub page: PageContext,
}

impl fmt::Debug for SyncServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncServices")
            .field("cookies", &self.cookies)
            .field("utility", &self.utility.is_some())
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

impl SyncServices {
    pub fn new(jar: CookieJarHandle, page: PageContext) -> Self {
        Self {
            cookies: DocumentCookies::new(jar),
            utility: None,
            events: EventBus::new(),
            page,
        }
    }

    pub fn with_utility(mut self, utility: Arc<dyn ConsentUtility>) -> Self {
        self.utility = Some(utility);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Init,
    Suppressed,
    Syncing,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    PreAuthConsent,
    FullOptOut,
}

/// Result of a [`SyncOrchestrator::sync_preferences`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Both records already agree.
    InSync,
    /// Preferences were handed to the consent utility.
    Submitted(Uuid),
    /// The consent utility reported an error (logged).
    SubmissionFailed,
    /// There is no consent utility on this page (logged).
    NoUtility,
    /// A sync was already running; the change is picked up once it finishes.
    Deferred,
}

/// Which path [`SyncOrchestrator::initialize`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Suppressed(SuppressReason),
    PrivacySignalOptOut(SyncOutcome),
    /// Intuit cookie copied to the CMP cookie; `written` is false when already aligned.
    CopiedFromIntuit { written: bool },
    /// The host manages consent elsewhere.
    SkippedHost,
    Synced(SyncOutcome),
}

/// Both cookies as last read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieSnapshot {
    pub intuit_raw: Option<String>,
    pub cmp_raw: Option<String>,
    pub intuit: IntuitPreferences,
    pub cmp: Option<CmpConsent>,
}

impl CookieSnapshot {
    fn read(cookies: &DocumentCookies, cookie_name: &str) -> Result<Self, ConsentError> {
        let intuit_raw = cookies.read(cookie_name)?;
        let cmp_raw = cookies.read(CMP_CONSENT_COOKIE)?;
        Ok(Self {
            intuit: IntuitPreferences::decode(intuit_raw.as_deref()),
            cmp: cmp_raw.as_deref().map(CmpConsent::parse),
            intuit_raw,
            cmp_raw,
        })
    }

    /// CMP advertising membership, `None` when the CMP has no groups signal.
    pub fn cmp_advertising_active(&self) -> Option<bool> {
        self.cmp.as_ref().and_then(|c| c.is_active(Category::Advertising))
    }
}

/// Drives reconciliation for one page. Owned by whoever bootstraps the page.
pub struct SyncOrchestrator {
    services: SyncServices,
    config: SyncConfig,
    denylist: Vec<Regex>,
    resolver: LawConfigResolver,
    state: SyncState,
    cookie_name: String,
    snapshot: CookieSnapshot,
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("state", &self.state)
            .field("cookie_name", &self.cookie_name)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    pub fn new(services: SyncServices, config: SyncConfig) -> Result<Self, ConsentError> {
        let denylist = config.denylist()?;
        let resolver = LawConfigResolver::new(services.utility.clone());
        let cookie_name = detect_cookie_name(&services.cookies, &config.default_intuit_cookie)?;
        let snapshot = CookieSnapshot::read(&services.cookies, &cookie_name)?;

        Ok(Self {
            services,
            config,
            denylist,
            resolver,
            state: SyncState::Init,
            cookie_name,
            snapshot,
        })
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Name of the Intuit cookie in use (`cpra`, `ccpa`, `gdpr` or `lgdp`).
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn snapshot(&self) -> &CookieSnapshot {
        &self.snapshot
    }

    pub fn services(&self) -> &SyncServices {
        &self.services
    }

    /// Page-load entry point.
    pub fn initialize(&mut self) -> Result<InitOutcome, ConsentError> {
        self.state = SyncState::Init;
        self.refresh()?;

        let pre_auth = self.services.cookies.exists(PRE_AUTH_CONSENT_COOKIE)?;
        if pre_auth || self.snapshot.intuit.is_full_opt_out() {
            let reason = if pre_auth { SuppressReason::PreAuthConsent } else { SuppressReason::FullOptOut };
            log::info!("Consent[sync]: suppressing CMP banner ({:?})", reason);
            self.suppress_banner()?;
            self.state = SyncState::Suppressed;
            return Ok(InitOutcome::Suppressed(reason));
        }

        if self.privacy_signal_opted_out()? {
            self.state = SyncState::Syncing;
            let outcome = self.apply_privacy_signal_opt_out()?;
            self.state = SyncState::Idle;
            return Ok(InitOutcome::PrivacySignalOptOut(outcome));
        }

        if self.snapshot.intuit_raw.is_some() {
            self.state = SyncState::Syncing;
            let written = self.align_cmp_cookie()?;
            self.state = SyncState::Idle;
            return Ok(InitOutcome::CopiedFromIntuit { written });
        }

        if self.is_denylisted_host() {
            log::debug!("Consent[sync]: {} manages consent itself, skipping sync", self.services.page.host());
            self.state = SyncState::Idle;
            return Ok(InitOutcome::SkippedHost);
        }

        Ok(InitOutcome::Synced(self.sync_preferences()?))
    }

    /// Submits the CMP's preferences when the two records disagree.
    pub fn sync_preferences(&mut self) -> Result<SyncOutcome, ConsentError> {
        self.state = SyncState::Syncing;
        self.refresh()?;

        if !should_sync(self.snapshot.intuit.advertising, self.snapshot.cmp_advertising_active()) {
            log::debug!("Consent[sync]: {} and {} agree", self.cookie_name, CMP_CONSENT_COOKIE);
            self.state = SyncState::Idle;
            return Ok(SyncOutcome::InSync);
        }

        self.services.events.publish(ConsentEvent::ConsentChanged {
            cookie_name: self.cookie_name.clone(),
            intuit_value: self.snapshot.intuit_raw.clone(),
            cmp_value: self.snapshot.cmp_raw.clone(),
        });

        let law = self.resolver.resolve(&self.cookie_name);
        let active = self.snapshot.cmp.as_ref().and_then(CmpConsent::active_categories);
        let preferences = map_cmp_to_intuit_preferences(&law, active.as_deref());
        let outcome = self.submit(&law, preferences);

        self.refresh()?;
        self.state = SyncState::Idle;
        Ok(outcome)
    }

    /// CMP change notification: mark the explicit choice, then sync.
    pub fn on_consent_changed(&mut self) -> Result<SyncOutcome, ConsentError> {
        let options = self.write_options(self.config.pre_auth_ttl);
        self.services.cookies.write(PRE_AUTH_CONSENT_COOKIE, "true", &options)?;
        self.sync_preferences()
    }

    /// Re-reads both cookies. The Intuit cookie name is re-detected as well,
    /// since a submission may have created it.
    fn refresh(&mut self) -> Result<(), ConsentError> {
        self.cookie_name = detect_cookie_name(&self.services.cookies, &self.config.default_intuit_cookie)?;
        self.snapshot = CookieSnapshot::read(&self.services.cookies, &self.cookie_name)?;
        Ok(())
    }

    /// Copies the Intuit preferences into the CMP cookie. Returns true when it wrote.
    fn align_cmp_cookie(&mut self) -> Result<bool, ConsentError> {
        let update = copy_cookie_preferences(&self.snapshot.intuit, self.snapshot.cmp_raw.as_deref());
        let written = match &update {
            CookieUpdate::Unchanged => false,
            CookieUpdate::Write(value) => {
                let options = self.write_options(self.config.consent_cookie_ttl);
                self.services.cookies.write(CMP_CONSENT_COOKIE, value, &options)?;
                true
            }
        };
        self.refresh()?;
        Ok(written)
    }

    fn suppress_banner(&self) -> Result<(), ConsentError> {
        let closed_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let options = self.write_options(self.config.banner_closed_ttl);
        self.services.cookies.write(CMP_BANNER_CLOSED_COOKIE, &closed_at, &options)?;
        Ok(())
    }

    /// Whether a privacy signal puts this visitor into an opted-out state.
    ///
    /// With [`PrivacySignalPolicy::Disabled`] this is always false.
    fn privacy_signal_opted_out(&self) -> Result<bool, ConsentError> {
        match self.config.privacy_signal_policy {
            PrivacySignalPolicy::Disabled => Ok(false),
            PrivacySignalPolicy::Enforced => {
                if !self.services.page.privacy_signal {
                    return Ok(false);
                }
                let geo = GeoLocation::from_cookies(&self.services.cookies)?;
                Ok(geo.is_some_and(|g| g.is_in(&self.config.privacy_signal_regions)))
            }
        }
    }

    fn apply_privacy_signal_opt_out(&mut self) -> Result<SyncOutcome, ConsentError> {
        let opted_out = IntuitPreferences::new(ConsentFlag::Disabled);
        let options = self.write_options(self.config.consent_cookie_ttl);
        self.services.cookies.write(&self.cookie_name, &opted_out.encode(), &options)?;
        self.refresh()?;
        self.align_cmp_cookie()?;

        let law = self.resolver.resolve(&self.cookie_name);
        let active = self.snapshot.cmp.as_ref().and_then(CmpConsent::active_categories);
        let preferences = map_cmp_to_intuit_preferences(&law, active.as_deref());

        log::info!("Consent[sync]: privacy signal honored for {}", self.services.page.host());
        self.services.events.publish(ConsentEvent::PrivacySignalOptOut {
            cookie_name: self.cookie_name.clone(),
            preferences: preferences.clone(),
        });

        let outcome = self.submit(&law, preferences);
        self.refresh()?;
        Ok(outcome)
    }

    /// Hands preferences to the consent utility. Failures are logged and swallowed.
    fn submit(&self, law: &LawConfig, preferences: BTreeMap<String, bool>) -> SyncOutcome {
        let Some(utility) = &self.services.utility else {
            log::error!(
                "Consent[sync]: cannot submit {} preferences (consent utility present: false)",
                self.cookie_name
            );
            return SyncOutcome::NoUtility;
        };

        let submission = ConsentSubmission {
            id: Uuid::new_v4(),
            cookie_name: self.cookie_name.clone(),
            endpoints: law.endpoint_urls(),
            preferences,
        };

        match utility.submit(&submission) {
            Ok(()) => {
                log::info!(
                    "Consent[sync]: submitted {} preferences to {} endpoints ({})",
                    submission.cookie_name,
                    submission.endpoints.len(),
                    submission.id
                );
                SyncOutcome::Submitted(submission.id)
            }
            Err(e) => {
                log::error!(
                    "Consent[sync]: submission {} failed (consent utility present: true): {:#}",
                    submission.id,
                    e
                );
                SyncOutcome::SubmissionFailed
            }
        }
    }

    fn is_denylisted_host(&self) -> bool {
        let host = self.services.page.host();
        self.denylist.iter().any(|re| re.is_match(host))
    }

    fn write_options(&self, ttl: Duration) -> CookieWriteOptions {
        CookieWriteOptions::new(self.config.cookie_domain.clone(), Some(OffsetDateTime::now_utc() + ttl))
    }
}

/// First Intuit cookie present, in [`INTUIT_COOKIE_NAMES`] order, else `default`.
fn detect_cookie_name(cookies: &DocumentCookies, default: &str) -> Result<String, ConsentError> {
    for name in INTUIT_COOKIE_NAMES {
        if cookies.exists(name)? {
            return Ok(name.to_string());
        }
    }
    Ok(default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::cookies::DefaultCookieJar;
    use crate::consent::events::Subscription;
    use std::sync::Mutex;

    /// Records submissions and, like the real endpoints, sets the Intuit cookie.
    #[derive(Default)]
    struct RecordingUtility {
        submissions: Mutex<Vec<ConsentSubmission>>,
        cookies: Mutex<Option<DocumentCookies>>,
        fail: bool,
    }

    impl ConsentUtility for RecordingUtility {
        fn law_config(&self, _cookie_name: &str) -> Option<LawConfig> {
            None
        }

        fn submit(&self, submission: &ConsentSubmission) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("endpoint unreachable");
            }
            self.submissions.lock().unwrap().push(submission.clone());
            if let Some(cookies) = self.cookies.lock().unwrap().as_ref() {
                let adv = ConsentFlag::from_bool(submission.preferences["advertising"]);
                cookies
                    .write(&submission.cookie_name, &IntuitPreferences::new(adv).encode(), &CookieWriteOptions::default())
                    .unwrap();
            }
            Ok(())
        }
    }

    struct Fixture {
        cookies: DocumentCookies,
        utility: Arc<RecordingUtility>,
        events: Subscription,
        orchestrator: SyncOrchestrator,
    }

    fn fixture(url: &str, jar: &[&str], config: SyncConfig, utility: RecordingUtility) -> Fixture {
        let mut handle = DefaultCookieJar::new();
        for c in jar {
            crate::consent::cookies::CookieJar::set_cookie(&mut handle, c);
        }
        let page = PageContext::new(Url::parse(url).unwrap());
        let services = SyncServices::new(handle.into(), page);
        let cookies = services.cookies.clone();
        *utility.cookies.lock().unwrap() = Some(cookies.clone());

        let utility = Arc::new(utility);
        let services = services.with_utility(utility.clone());
        let events = services.events.subscribe();
        let orchestrator = SyncOrchestrator::new(services, config).unwrap();

        Fixture { cookies, utility, events, orchestrator }
    }

    fn read(f: &Fixture, name: &str) -> Option<String> {
        f.cookies.read(name).unwrap()
    }

    #[test]
    fn pacflag_suppresses_banner_and_skips_sync() {
        let mut f = fixture(
            "https://accounts.intuit.com/",
            &["pacflag=true", "OptanonConsent=groups=1%3A1%2C4%3A1"],
            SyncConfig::default(),
            RecordingUtility::default(),
        );

        let outcome = f.orchestrator.initialize().unwrap();

        assert_eq!(outcome, InitOutcome::Suppressed(SuppressReason::PreAuthConsent));
        assert_eq!(f.orchestrator.state(), SyncState::Suppressed);
        assert!(read(&f, CMP_BANNER_CLOSED_COOKIE).is_some());
        assert!(f.utility.submissions.lock().unwrap().is_empty());
        assert!(f.events.try_recv().is_err());
        // CMP cookie untouched
        assert_eq!(read(&f, CMP_CONSENT_COOKIE).as_deref(), Some("groups=1:1,4:1"));
    }

    #[test]
    fn full_opt_out_suppresses_banner() {
        let mut f = fixture("https://accounts.intuit.com/", &["ccpa=0|0"], SyncConfig::default(), RecordingUtility::default());
        let outcome = f.orchestrator.initialize().unwrap();
        assert_eq!(outcome, InitOutcome::Suppressed(SuppressReason::FullOptOut));
        assert!(read(&f, CMP_CONSENT_COOKIE).is_none());
    }

    #[test]
    fn banner_closed_value_is_a_timestamp() {
        let mut f = fixture("https://accounts.intuit.com/", &["pacflag=true"], SyncConfig::default(), RecordingUtility::default());
        f.orchestrator.initialize().unwrap();

        let raw = f.cookies.jar().read().unwrap().get_cookie(CMP_BANNER_CLOSED_COOKIE).unwrap();
        assert!(raw.value.contains("%3A"));
        let closed_at = read(&f, CMP_BANNER_CLOSED_COOKIE).unwrap();
        assert!(OffsetDateTime::parse(&closed_at, &Rfc3339).is_ok());
    }

    #[test]
    fn intuit_cookie_is_copied_to_cmp() {
        let config = SyncConfig::builder()
            .cookie_domain(".intuit.com; Samesite=None; secure")
            .build()
            .unwrap();
        let mut f = fixture("https://accounts.intuit.com/", &["ccpa=1|0"], config, RecordingUtility::default());

        let outcome = f.orchestrator.initialize().unwrap();

        assert_eq!(outcome, InitOutcome::CopiedFromIntuit { written: true });
        assert_eq!(f.orchestrator.state(), SyncState::Idle);
        assert_eq!(read(&f, CMP_CONSENT_COOKIE).as_deref(), Some("groups=1:1,4:0"));

        let cookie = f.cookies.jar().read().unwrap().get_cookie(CMP_CONSENT_COOKIE).unwrap();
        assert_eq!(cookie.domain.as_deref(), Some("intuit.com"));
        assert_eq!(cookie.same_site.as_deref(), Some("None"));
        assert!(cookie.secure);
        assert!(cookie.expires.is_some());
        assert!(f.utility.submissions.lock().unwrap().is_empty());
    }

    #[test]
    fn intuit_is_authoritative_over_existing_cmp() {
        let mut f = fixture(
            "https://accounts.intuit.com/",
            &["ccpa=1|1", "OptanonConsent=isGpcEnabled=0&groups=1%3A1%2C4%3A0"],
            SyncConfig::default(),
            RecordingUtility::default(),
        );
        f.orchestrator.initialize().unwrap();
        assert_eq!(read(&f, CMP_CONSENT_COOKIE).as_deref(), Some("isGpcEnabled=0&groups=1:1,4:1"));
    }

    #[test]
    fn aligned_cookies_are_not_rewritten() {
        let mut f = fixture(
            "https://accounts.intuit.com/",
            &["cpra=1|1", "OptanonConsent=groups=1%3A1%2C4%3A1"],
            SyncConfig::default(),
            RecordingUtility::default(),
        );
        assert_eq!(f.orchestrator.cookie_name(), "cpra");
        assert_eq!(f.orchestrator.initialize().unwrap(), InitOutcome::CopiedFromIntuit { written: false });
    }

    #[test]
    fn denylisted_host_skips_sync() {
        let mut f = fixture("https://login.mailchimp.com/", &[], SyncConfig::default(), RecordingUtility::default());
        assert_eq!(f.orchestrator.initialize().unwrap(), InitOutcome::SkippedHost);
        assert!(f.utility.submissions.lock().unwrap().is_empty());
    }

    #[test]
    fn no_cookies_runs_full_sync() {
        let mut f = fixture(
            "https://accounts.intuit.com/",
            &["OptanonConsent=groups=1%3A1%2C4%3A0"],
            SyncConfig::default(),
            RecordingUtility::default(),
        );

        let outcome = f.orchestrator.initialize().unwrap();
        assert!(matches!(outcome, InitOutcome::Synced(SyncOutcome::Submitted(_))));

        let submissions = f.utility.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].cookie_name, "ccpa");
        assert_eq!(submissions[0].endpoints.len(), 5);
        assert_eq!(submissions[0].preferences["essential"], true);
        assert_eq!(submissions[0].preferences["advertising"], false);
        drop(submissions);

        assert!(matches!(f.events.try_recv().unwrap(), ConsentEvent::ConsentChanged { .. }));
        // the utility set the Intuit cookie, and the snapshot picked it up
        assert_eq!(f.orchestrator.snapshot().intuit_raw.as_deref(), Some("1|0"));
    }

    #[test]
    fn missing_cmp_signal_opts_in() {
        let mut f = fixture("https://accounts.intuit.com/", &[], SyncConfig::default(), RecordingUtility::default());
        f.orchestrator.initialize().unwrap();
        let submissions = f.utility.submissions.lock().unwrap();
        assert_eq!(submissions[0].preferences["advertising"], true);
    }

    #[test]
    fn sync_is_skipped_when_in_sync() {
        let mut f = fixture(
            "https://accounts.intuit.com/",
            &["ccpa=1|0", "OptanonConsent=groups=1%3A1%2C4%3A0"],
            SyncConfig::default(),
            RecordingUtility::default(),
        );
        assert_eq!(f.orchestrator.sync_preferences().unwrap(), SyncOutcome::InSync);
        assert!(f.events.try_recv().is_err());
    }

    #[test]
    fn submission_failures_are_swallowed() {
        let utility = RecordingUtility { fail: true, ..Default::default() };
        let mut f = fixture("https://accounts.intuit.com/", &[], SyncConfig::default(), utility);
        assert_eq!(f.orchestrator.initialize().unwrap(), InitOutcome::Synced(SyncOutcome::SubmissionFailed));
        assert_eq!(f.orchestrator.state(), SyncState::Idle);
    }

    #[test]
    fn missing_utility_is_logged_not_raised() {
        let page = PageContext::new(Url::parse("https://accounts.intuit.com/").unwrap());
        let services = SyncServices::new(DefaultCookieJar::new().into(), page);
        let mut orchestrator = SyncOrchestrator::new(services, SyncConfig::default()).unwrap();
        assert_eq!(orchestrator.initialize().unwrap(), InitOutcome::Synced(SyncOutcome::NoUtility));
    }

    #[test]
    fn consent_change_writes_pacflag_then_syncs() {
        let mut f = fixture(
            "https://accounts.intuit.com/",
            &["ccpa=1|1", "OptanonConsent=groups=1%3A1%2C4%3A1"],
            SyncConfig::default(),
            RecordingUtility::default(),
        );
        f.orchestrator.initialize().unwrap();

        // user turns advertising off in the CMP
        f.cookies
            .write(CMP_CONSENT_COOKIE, "groups=1:1,4:0", &CookieWriteOptions::default())
            .unwrap();
        let outcome = f.orchestrator.on_consent_changed().unwrap();

        assert!(matches!(outcome, SyncOutcome::Submitted(_)));
        assert_eq!(read(&f, PRE_AUTH_CONSENT_COOKIE).as_deref(), Some("true"));
        let expires = f.cookies.jar().read().unwrap().get_cookie(PRE_AUTH_CONSENT_COOKIE).unwrap().expires;
        assert!(expires.is_some());
        assert_eq!(read(&f, "ccpa").as_deref(), Some("1|0"));
    }

    #[test]
    fn privacy_signal_is_ignored_while_disabled() {
        let mut f = fixture("https://accounts.intuit.com/", &["AKES_GEO=US~CA", "ccpa=1|1"], SyncConfig::default(), RecordingUtility::default());
        f.orchestrator.services.page.privacy_signal = true;
        assert_eq!(f.orchestrator.initialize().unwrap(), InitOutcome::CopiedFromIntuit { written: true });
        assert_eq!(read(&f, "ccpa").as_deref(), Some("1|1"));
    }

    #[test]
    fn enforced_privacy_signal_opts_out() {
        let config = SyncConfig::builder()
            .privacy_signal_policy(PrivacySignalPolicy::Enforced)
            .build()
            .unwrap();
        let mut f = fixture("https://accounts.intuit.com/", &["AKES_GEO=US~CA", "ccpa=1|1"], config, RecordingUtility::default());
        f.orchestrator.services.page.privacy_signal = true;

        let outcome = f.orchestrator.initialize().unwrap();

        assert!(matches!(outcome, InitOutcome::PrivacySignalOptOut(SyncOutcome::Submitted(_))));
        assert_eq!(read(&f, "ccpa").as_deref(), Some("1|0"));
        assert_eq!(read(&f, CMP_CONSENT_COOKIE).as_deref(), Some("groups=1:1,4:0"));
        match f.events.try_recv().unwrap() {
            ConsentEvent::PrivacySignalOptOut { preferences, .. } => {
                assert_eq!(preferences["advertising"], false);
                assert_eq!(preferences["essential"], true);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn enforced_privacy_signal_respects_regions() {
        let config = SyncConfig::builder()
            .privacy_signal_policy(PrivacySignalPolicy::Enforced)
            .build()
            .unwrap();
        let mut f = fixture("https://accounts.intuit.com/", &["AKES_GEO=DE", "ccpa=1|1"], config, RecordingUtility::default());
        f.orchestrator.services.page.privacy_signal = true;
        assert_eq!(f.orchestrator.initialize().unwrap(), InitOutcome::CopiedFromIntuit { written: true });
    }
}
