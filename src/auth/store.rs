//! Session store: in-memory authentication state and the token lifecycle.
//!
//! The store owns the only mutable view of both the persisted credential
//! bundle and the in-memory session state. It acquires tokens on login,
//! restores them on startup, rotates them through the refresh endpoint, and
//! runs a background watcher that re-validates expiry on a fixed interval.
//!
//! Every failure path here resolves to a returned error value or a state
//! transition to logged-out; nothing panics and nothing is silently dropped
//! without a log line.

use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthClient};
use crate::auth::bundle::{
    Bundle, BundleStore, ACCESS_EXPIRATION, ACCESS_TOKEN, BUNDLE_KEYS, REFRESH_EXPIRATION,
    REFRESH_TOKEN, USER,
};

/// Interval between background expiration checks.
/// 45s keeps the session fresh without waking up more than needed.
const CHECK_INTERVAL: Duration = Duration::from_secs(45);

/// In-memory view of the current run's authentication state.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<Value>,
    pub is_authenticated: bool,
}

struct Inner {
    client: AuthClient,
    bundle: Box<dyn BundleStore>,
    state: RwLock<SessionState>,
    watcher: StdMutex<Option<JoinHandle<()>>>,
    // Serializes refresh attempts so a tick-triggered refresh cannot
    // interleave bundle writes with an explicit caller refresh.
    refresh_gate: tokio::sync::Mutex<()>,
    check_interval: Duration,
}

/// Handle to the session store. Clone is cheap (Arc inner); all clones see
/// the same state, bundle, and watcher.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(client: AuthClient, bundle: Box<dyn BundleStore>) -> Self {
        Self::with_check_interval(client, bundle, CHECK_INTERVAL)
    }

    /// Construct with a custom watcher interval (mainly for tests).
    pub fn with_check_interval(
        client: AuthClient,
        bundle: Box<dyn BundleStore>,
        check_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                bundle,
                state: RwLock::new(SessionState::default()),
                watcher: StdMutex::new(None),
                refresh_gate: tokio::sync::Mutex::new(()),
                check_interval,
            }),
        }
    }

    // ========================================================================
    // State accessors
    // ========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_authenticated
    }

    /// Current user profile, if authenticated.
    pub fn user(&self) -> Option<Value> {
        self.read_state().user
    }

    pub fn state(&self) -> SessionState {
        self.read_state()
    }

    /// Direct access to the underlying credential bundle store.
    pub fn bundle_store(&self) -> &dyn BundleStore {
        self.inner.bundle.as_ref()
    }

    // Lock poisoning is recovered rather than propagated: the guarded data
    // is a plain value that is only ever cloned or replaced whole, so it is
    // coherent even after a panic elsewhere.
    fn read_state(&self) -> SessionState {
        self.inner
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn write_state(&self, state: SessionState) {
        *self.inner.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Write or clear one bundle key. Storage faults are logged rather than
    /// propagated: the in-memory session stays authoritative for this run
    /// even when the durable copy falls behind.
    fn persist(&self, op: &str, key: &str, value: Option<&str>) {
        let result = match value {
            Some(v) => self.inner.bundle.set(key, v),
            None => self.inner.bundle.remove(key),
        };
        if let Err(e) = result {
            warn!(op, key, error = %e, "Failed to persist bundle key");
        }
    }

    // ========================================================================
    // Lifecycle operations
    // ========================================================================

    /// Submit credentials to the backend and establish a session.
    ///
    /// On success the full credential bundle is persisted, the in-memory
    /// state flips to authenticated, and the expiration watcher starts. On
    /// rejection or transport failure nothing is mutated and the error is
    /// returned for the caller to display.
    pub async fn login<C: Serialize + Sync + ?Sized>(
        &self,
        credentials: &C,
    ) -> Result<(), ApiError> {
        let response = self.inner.client.login(credentials).await?;

        let user_json = serde_json::to_string(&response.user)
            .map_err(|e| ApiError::InvalidResponse(format!("Unserializable user profile: {}", e)))?;

        self.persist("login", ACCESS_TOKEN, Some(&response.access));
        self.persist("login", REFRESH_TOKEN, Some(&response.refresh));
        self.persist("login", USER, Some(&user_json));
        self.persist("login", ACCESS_EXPIRATION, response.access_expiration.as_deref());
        self.persist("login", REFRESH_EXPIRATION, response.refresh_expiration.as_deref());

        self.write_state(SessionState {
            user: Some(response.user),
            is_authenticated: true,
        });
        self.start_watcher();

        info!("Login succeeded, session established");
        Ok(())
    }

    /// Tear down the session: stop the watcher, clear every bundle key, and
    /// reset the in-memory state. Idempotent; storage errors are logged and
    /// swallowed so logout can never fail.
    pub fn logout(&self) {
        self.stop_watcher();
        for key in BUNDLE_KEYS {
            if let Err(e) = self.inner.bundle.remove(key) {
                warn!(key, error = %e, "Failed to clear bundle key on logout");
            }
        }
        self.write_state(SessionState::default());
        debug!("Session cleared");
    }

    /// Stop the background watcher without touching credentials. Call this
    /// when discarding the store so the watcher task does not outlive it.
    pub fn dispose(&self) {
        self.stop_watcher();
    }

    /// Restore a session from the persisted bundle at startup.
    ///
    /// An incomplete bundle (missing user, access token, or access
    /// expiration) is a no-op and the session stays unauthenticated. A
    /// complete bundle with a live access token restores state directly; an
    /// expired access token with a live refresh token attempts a silent
    /// refresh, and any failure along that path ends logged out.
    pub async fn initialize_auth(&self) {
        let bundle = match Bundle::load(self.inner.bundle.as_ref()) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(error = %e, "Failed to read credential bundle, staying unauthenticated");
                return;
            }
        };

        if !bundle.is_restorable() {
            debug!("No restorable session in credential bundle");
            return;
        }

        let Some(user) = bundle.user_profile() else {
            debug!("Stored user profile is corrupt, staying unauthenticated");
            return;
        };

        if !bundle.access_expired() {
            self.write_state(SessionState {
                user: Some(user),
                is_authenticated: true,
            });
            self.start_watcher();
            info!("Session restored from stored credentials");
            return;
        }

        let refresh_live = bundle.refresh_token.is_some() && !bundle.refresh_expired();
        if refresh_live {
            match self.refresh_token().await {
                Ok(_) => {
                    self.write_state(SessionState {
                        user: Some(user),
                        is_authenticated: true,
                    });
                    self.start_watcher();
                    info!("Session restored via token refresh");
                }
                Err(e) => {
                    // refresh_token already logged out
                    debug!(error = %e, "Startup token refresh failed");
                }
            }
        } else {
            info!("Stored session fully expired, clearing");
            self.logout();
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Attempts are serialized: a second caller waits for the first to
    /// finish rather than racing it for the bundle writes. Any failure
    /// (missing refresh token, rejection, transport) logs the session out
    /// before the error is returned.
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        let _gate = self.inner.refresh_gate.lock().await;

        let refresh = match self.inner.bundle.get(REFRESH_TOKEN) {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("No refresh token available, logging out");
                self.logout();
                return Err(ApiError::Unauthorized);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read refresh token, logging out");
                self.logout();
                return Err(ApiError::Unauthorized);
            }
        };

        match self.inner.client.refresh(&refresh).await {
            Ok(response) => {
                self.persist("refresh", ACCESS_TOKEN, Some(&response.access));
                // When the backend omits the new expiration, keep the stored
                // one; the next validity check re-evaluates it fail-closed.
                if let Some(ref expiration) = response.access_expiration {
                    self.persist("refresh", ACCESS_EXPIRATION, Some(expiration));
                }
                debug!("Access token refreshed");
                Ok(response.access)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging out");
                self.logout();
                Err(e)
            }
        }
    }

    /// Re-validate token freshness against the persisted bundle.
    ///
    /// Returns false only when the session is over (both tokens expired or
    /// the bundle is unreadable), in which case the session has already been
    /// logged out. An expired access token with a live refresh token kicks
    /// off a fire-and-forget refresh and reports the session as provisionally
    /// valid; if that refresh fails it logs out, and the next check sees it.
    pub fn check_token_validity(&self) -> bool {
        let bundle = match Bundle::load(self.inner.bundle.as_ref()) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(error = %e, "Failed to read credential bundle, ending session");
                self.logout();
                return false;
            }
        };

        if !bundle.access_expired() {
            return true;
        }

        let refresh_live = bundle.refresh_token.is_some() && !bundle.refresh_expired();
        if !refresh_live {
            info!("Session expired");
            self.logout();
            return false;
        }

        // Access token lapsed but the refresh token is still good: rotate in
        // the background and keep the session provisionally valid.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = self.clone();
                handle.spawn(async move {
                    if let Err(e) = store.refresh_token().await {
                        warn!(error = %e, "Background token refresh failed");
                    }
                });
            }
            Err(_) => {
                warn!("No async runtime available for background token refresh");
            }
        }
        true
    }

    /// Whether the background expiration watcher is currently running.
    pub fn is_watching(&self) -> bool {
        self.inner
            .watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    // ========================================================================
    // Expiration watcher
    // ========================================================================

    /// Start the periodic expiration check, replacing any prior instance.
    /// At most one watcher runs per store.
    fn start_watcher(&self) {
        let mut slot = self.inner.watcher.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let store = self.clone();
        let interval = self.inner.check_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // interval fires immediately; the first real check comes one
            // period after login/restore.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !store.check_token_validity() {
                    break;
                }
            }
        }));
    }

    fn stop_watcher(&self) {
        let mut slot = self.inner.watcher.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::bundle::MemoryStore;
    use chrono::{Duration as ChronoDuration, Utc};

    fn offline_store() -> SessionStore {
        // Points at a closed port; these tests never reach the network.
        let client = AuthClient::new("http://127.0.0.1:9").expect("build client");
        SessionStore::new(client, Box::new(MemoryStore::new()))
    }

    fn future_ts(hours: i64) -> String {
        (Utc::now() + ChronoDuration::hours(hours)).to_rfc3339()
    }

    fn past_ts(hours: i64) -> String {
        (Utc::now() - ChronoDuration::hours(hours)).to_rfc3339()
    }

    #[tokio::test]
    async fn test_initialize_with_empty_bundle_is_noop() {
        let store = offline_store();
        store.initialize_auth().await;
        assert!(!store.is_authenticated());
        assert!(!store.is_watching());
    }

    #[tokio::test]
    async fn test_initialize_fail_closed_on_partial_bundle() {
        let store = offline_store();
        store.inner.bundle.set(USER, r#"{"id":1}"#).unwrap();
        store.inner.bundle.set(ACCESS_TOKEN, "A1").unwrap();
        // No accessExpiration: must not authenticate and must not touch the
        // network (the client points at a dead port).
        store.initialize_auth().await;
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_initialize_restores_live_session() {
        let store = offline_store();
        store.inner.bundle.set(USER, r#"{"id":1}"#).unwrap();
        store.inner.bundle.set(ACCESS_TOKEN, "A1").unwrap();
        store
            .inner
            .bundle
            .set(ACCESS_EXPIRATION, &future_ts(1))
            .unwrap();

        store.initialize_auth().await;
        assert!(store.is_authenticated());
        assert_eq!(store.user().unwrap()["id"], 1);
        assert!(store.is_watching());
        store.dispose();
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let store = offline_store();
        store.inner.bundle.set(ACCESS_TOKEN, "A1").unwrap();
        store.logout();
        store.logout();
        store.logout();
        assert!(!store.is_authenticated());
        assert!(!store.is_watching());
        for key in BUNDLE_KEYS {
            assert_eq!(store.inner.bundle.get(key).unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_validity_check_logs_out_when_both_tokens_expired() {
        let store = offline_store();
        store.inner.bundle.set(USER, r#"{"id":1}"#).unwrap();
        store.inner.bundle.set(ACCESS_TOKEN, "A1").unwrap();
        store.inner.bundle.set(REFRESH_TOKEN, "R1").unwrap();
        store
            .inner
            .bundle
            .set(ACCESS_EXPIRATION, &past_ts(2))
            .unwrap();
        store
            .inner
            .bundle
            .set(REFRESH_EXPIRATION, &past_ts(1))
            .unwrap();

        assert!(!store.check_token_validity());
        assert!(!store.is_authenticated());
        assert_eq!(store.inner.bundle.get(ACCESS_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_validity_check_passes_with_live_access_token() {
        let store = offline_store();
        store.inner.bundle.set(ACCESS_TOKEN, "A1").unwrap();
        store
            .inner
            .bundle
            .set(ACCESS_EXPIRATION, &future_ts(1))
            .unwrap();
        assert!(store.check_token_validity());
    }
}
