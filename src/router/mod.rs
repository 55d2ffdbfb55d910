//! Route table and navigation guard.
//!
//! Routes declare at most one of `requires_auth` / `requires_guest`; the
//! guard in this module is the sole enforcement point for those flags, so
//! views never duplicate the check.

pub mod guard;

pub use guard::{GuardPolicy, NavDecision};

/// A navigable route. Path patterns use `:name` for parameter segments,
/// e.g. `/quiz/:id`.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub name: String,
    pub requires_auth: bool,
    pub requires_guest: bool,
}

impl Route {
    /// A route anyone may visit.
    pub fn public(path: &str, name: &str) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            requires_auth: false,
            requires_guest: false,
        }
    }

    /// A route that requires an authenticated session.
    pub fn authed(path: &str, name: &str) -> Self {
        Self {
            requires_auth: true,
            ..Self::public(path, name)
        }
    }

    /// A route only reachable while logged out (login, register, ...).
    pub fn guest(path: &str, name: &str) -> Self {
        Self {
            requires_guest: true,
            ..Self::public(path, name)
        }
    }

    /// Whether this route's pattern matches a concrete path.
    fn matches(&self, path: &str) -> bool {
        let mut pattern = self.path.split('/').filter(|s| !s.is_empty());
        let mut actual = path.split('/').filter(|s| !s.is_empty());
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return true,
                (Some(p), Some(a)) => {
                    if !p.starts_with(':') && p != a {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

/// The application route table plus the redirect policy used by the guard.
pub struct Router {
    routes: Vec<Route>,
    policy: GuardPolicy,
}

impl Router {
    pub fn new(routes: Vec<Route>, policy: GuardPolicy) -> Self {
        Self { routes, policy }
    }

    /// The route table of the reference application.
    pub fn with_default_routes() -> Self {
        Self::new(Self::default_routes(), GuardPolicy::default())
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Find the route matching `path` (query string already stripped).
    /// First match wins; unknown paths are treated as public.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(path))
    }

    fn default_routes() -> Vec<Route> {
        vec![
            Route::public("/", "Home"),
            Route::authed("/dashboard", "Dashboard"),
            Route::authed("/profile", "Profile"),
            Route::authed("/documents", "Documents"),
            Route::authed("/upload", "FileUpload"),
            Route::guest("/login", "Login"),
            Route::guest("/register", "Register"),
            Route::guest("/password-reset", "PasswordResetRequest"),
            Route::guest("/reset-password/confirm/:uid/:token", "PasswordResetConfirmNew"),
            Route::guest("/password-reset/confirm/:uid/:token", "PasswordResetConfirm"),
            Route::guest("/verify-email-prompt", "EmailVerificationPrompt"),
            Route::guest("/registration/account-confirm-email/:key", "EmailVerification"),
            Route::guest("/resend-verification", "ResendVerification"),
            Route::public("/pricing", "Pricing"),
            Route::public("/quiz/:id", "Quiz"),
        ]
    }
}
