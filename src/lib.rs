//! Client-side session lifecycle management for token-based REST backends.
//!
//! This crate handles acquiring, persisting, validating, refreshing, and
//! expiring access/refresh token pairs, and gates route navigation on the
//! resulting session state:
//!
//! - [`api::AuthClient`] talks to the backend login and refresh endpoints
//! - [`auth::SessionStore`] owns the in-memory session state, the persisted
//!   credential bundle, and a background expiration watcher
//! - [`router::Router`] runs the navigation guard before every route change
//!
//! ```no_run
//! use sessiongate::api::AuthClient;
//! use sessiongate::auth::{MemoryStore, SessionStore};
//! use sessiongate::router::Router;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AuthClient::new("https://api.example.org")?;
//! let session = SessionStore::new(client, Box::new(MemoryStore::new()));
//! session.initialize_auth().await;
//!
//! let router = Router::with_default_routes();
//! let _decision = router.before_navigation(&session, "/dashboard");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod router;

pub use api::{ApiError, AuthClient};
pub use auth::{SessionState, SessionStore};
pub use config::Config;
pub use router::{NavDecision, Router};
