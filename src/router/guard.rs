//! Navigation guard: decides whether a route transition proceeds.

use tracing::debug;

use crate::auth::SessionStore;
use crate::router::Router;

/// Redirect targets used by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Where unauthenticated (or expired) sessions are sent.
    pub login_path: String,
    /// Where authenticated sessions land when pushed off guest/home routes.
    pub landing_path: String,
    /// The root route, redirected to the landing page when authenticated.
    pub home_path: String,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            landing_path: "/dashboard".to_string(),
            home_path: "/".to_string(),
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavDecision {
    /// Proceed to the requested route.
    Allow,
    /// Navigate to this path instead (may carry a query string).
    Redirect(String),
}

impl Router {
    /// Run the guard for a transition to `to`.
    ///
    /// Decision order, first match wins:
    /// 1. authenticated but the immediate token re-check fails -> login with
    ///    a `session_expired` signal
    /// 2. route requires auth, session unauthenticated -> login
    /// 3. route requires guest, session authenticated -> landing page
    /// 4. home route while authenticated -> landing page
    /// 5. allow
    pub fn before_navigation(&self, session: &SessionStore, to: &str) -> NavDecision {
        let path = to.split('?').next().unwrap_or(to);
        let route = self.resolve(path);
        let requires_auth = route.map(|r| r.requires_auth).unwrap_or(false);
        let requires_guest = route.map(|r| r.requires_guest).unwrap_or(false);
        let policy = self.policy();

        // Re-validate token freshness on every navigation for authenticated
        // sessions; check_token_validity logs out when the session is over.
        if session.is_authenticated() && !session.check_token_validity() {
            debug!(to = path, "Session expired during navigation");
            return NavDecision::Redirect(format!("{}?session_expired=true", policy.login_path));
        }

        if requires_auth && !session.is_authenticated() {
            debug!(to = path, "Unauthenticated access to protected route");
            return NavDecision::Redirect(policy.login_path.clone());
        }

        if requires_guest && session.is_authenticated() {
            return NavDecision::Redirect(policy.landing_path.clone());
        }

        if path == policy.home_path && session.is_authenticated() {
            return NavDecision::Redirect(policy.landing_path.clone());
        }

        NavDecision::Allow
    }
}
